//! Page-level information extraction

use lopdf::{Document, Object};
use serde::Serialize;

use crate::error::DeckError;

/// Information about a single PDF page
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i32,
    /// Whether the page has a content stream (not blank)
    pub has_content: bool,
    /// Estimated orientation based on dimensions
    pub orientation: PageOrientation,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

impl PageInfo {
    /// Extract page info from a loaded document.
    pub fn from_document(doc: &Document, page_num: u32) -> Result<Self, DeckError> {
        let pages = doc.get_pages();
        let page_id = pages
            .get(&page_num)
            .ok_or_else(|| DeckError::InvalidRange(format!("Page {} not found", page_num)))?;

        let page_dict = doc
            .objects
            .get(page_id)
            .ok_or_else(|| DeckError::Parse(format!("Page {} object not found", page_num)))?
            .as_dict()
            .map_err(|_| DeckError::Parse(format!("Page {} is not a dictionary", page_num)))?;

        let media_box = media_box(doc, page_dict)?;
        let (width, height) = (media_box[2] - media_box[0], media_box[3] - media_box[1]);

        let rotation = rotation(doc, page_dict);
        let has_content = page_dict.get(b"Contents").is_ok();

        // Rotation swaps the rendered axes
        let (effective_width, effective_height) = if rotation == 90 || rotation == 270 {
            (height, width)
        } else {
            (width, height)
        };

        let orientation = if (effective_width - effective_height).abs() < 1.0 {
            PageOrientation::Square
        } else if effective_width > effective_height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        };

        Ok(Self {
            page_num,
            width: width as f32,
            height: height as f32,
            rotation,
            has_content,
            orientation,
        })
    }

    /// Page infos for every page of a document.
    pub fn all_from_document(doc: &Document) -> Vec<Result<Self, DeckError>> {
        let pages = doc.get_pages();
        (1..=pages.len() as u32)
            .map(|page_num| Self::from_document(doc, page_num))
            .collect()
    }
}

/// MediaBox from the page, inheriting from the parent node if necessary.
fn media_box(doc: &Document, page_dict: &lopdf::Dictionary) -> Result<[f64; 4], DeckError> {
    if let Ok(media_box) = page_dict.get(b"MediaBox") {
        if let Ok(array) = media_box.as_array() {
            return parse_box_array(array);
        }
    }

    if let Some(parent_dict) = parent_dict(doc, page_dict) {
        if let Ok(media_box) = parent_dict.get(b"MediaBox") {
            if let Ok(array) = media_box.as_array() {
                return parse_box_array(array);
            }
        }
    }

    // Default to US Letter
    Ok([0.0, 0.0, 612.0, 792.0])
}

/// Rotate entry from the page, inheriting from the parent node if necessary.
fn rotation(doc: &Document, page_dict: &lopdf::Dictionary) -> i32 {
    if let Ok(rotate) = page_dict.get(b"Rotate") {
        if let Ok(angle) = rotate.as_i64() {
            return normalize_rotation(angle as i32);
        }
    }

    if let Some(parent_dict) = parent_dict(doc, page_dict) {
        if let Ok(rotate) = parent_dict.get(b"Rotate") {
            if let Ok(angle) = rotate.as_i64() {
                return normalize_rotation(angle as i32);
            }
        }
    }

    0
}

fn parent_dict<'a>(doc: &'a Document, page_dict: &lopdf::Dictionary) -> Option<&'a lopdf::Dictionary> {
    let parent_id = page_dict.get(b"Parent").ok()?.as_reference().ok()?;
    doc.objects.get(&parent_id)?.as_dict().ok()
}

fn parse_box_array(array: &[Object]) -> Result<[f64; 4], DeckError> {
    if array.len() != 4 {
        return Err(DeckError::Parse("MediaBox must have 4 elements".into()));
    }

    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => {
                return Err(DeckError::Parse(format!(
                    "MediaBox element {} is not a number",
                    i
                )))
            }
        };
    }

    Ok(result)
}

/// Normalize rotation to 0, 90, 180, or 270.
pub fn normalize_rotation(angle: i32) -> i32 {
    let normalized = angle % 360;
    if normalized < 0 {
        normalized + 360
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::create_test_pdf;

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(90), 90);
        assert_eq!(normalize_rotation(270), 270);
        assert_eq!(normalize_rotation(360), 0);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(-90), 270);
    }

    #[test]
    fn test_parse_box_array() {
        let array = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(612.0),
            Object::Real(792.0),
        ];
        assert_eq!(parse_box_array(&array).unwrap(), [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn test_page_info_from_test_pdf() {
        let pdf = create_test_pdf(2);
        let doc = Document::load_mem(&pdf).unwrap();

        let info = PageInfo::from_document(&doc, 1).unwrap();
        assert_eq!(info.page_num, 1);
        assert_eq!(info.width, 612.0);
        assert_eq!(info.height, 792.0);
        assert_eq!(info.rotation, 0);
        assert!(info.has_content);
        assert_eq!(info.orientation, PageOrientation::Portrait);
    }

    #[test]
    fn test_page_info_missing_page() {
        let pdf = create_test_pdf(2);
        let doc = Document::load_mem(&pdf).unwrap();
        assert!(PageInfo::from_document(&doc, 3).is_err());
    }

    #[test]
    fn test_all_from_document() {
        let pdf = create_test_pdf(4);
        let doc = Document::load_mem(&pdf).unwrap();
        let infos = PageInfo::all_from_document(&doc);
        assert_eq!(infos.len(), 4);
        assert!(infos.iter().all(|i| i.is_ok()));
    }
}
