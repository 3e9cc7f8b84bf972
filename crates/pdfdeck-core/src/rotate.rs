//! Page rotation
//!
//! Rotation composes with whatever /Rotate a page already carries, so
//! rotating an already-landscape scan by 90 behaves like a viewer would.

use lopdf::{Document, Object};

use crate::error::DeckError;
use crate::page_info::normalize_rotation;

/// Rotate the listed pages (1-indexed) clockwise by `degrees`; `None`
/// rotates every page. Only 90, 180 and 270 are accepted.
pub fn rotate_pages(
    bytes: &[u8],
    pages: Option<Vec<u32>>,
    degrees: i32,
) -> Result<Vec<u8>, DeckError> {
    if !matches!(degrees, 90 | 180 | 270) {
        return Err(DeckError::InvalidInput(format!(
            "Invalid rotation: {}. Must be 90, 180, or 270",
            degrees
        )));
    }

    let mut doc = Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;
    let page_map = doc.get_pages();
    let page_count = page_map.len() as u32;

    let targets: Vec<u32> = match pages {
        Some(pages) => {
            if pages.is_empty() {
                return Err(DeckError::InvalidRange("No pages specified".into()));
            }
            for &page in &pages {
                if page == 0 || page > page_count {
                    return Err(DeckError::InvalidRange(format!(
                        "Page {} does not exist (document has {} pages)",
                        page, page_count
                    )));
                }
            }
            pages
        }
        None => (1..=page_count).collect(),
    };

    for page_num in targets {
        let page_id = page_map[&page_num];

        let current = doc
            .get_object(page_id)
            .ok()
            .and_then(|obj| obj.as_dict().ok())
            .and_then(|dict| dict.get(b"Rotate").ok())
            .and_then(|r| r.as_i64().ok())
            .unwrap_or(0) as i32;

        let rotated = normalize_rotation(current + degrees);

        let page = doc
            .get_object_mut(page_id)
            .map_err(|e| DeckError::Operation(e.to_string()))?;
        if let Object::Dictionary(ref mut dict) = page {
            dict.set("Rotate", Object::Integer(rotated as i64));
        }
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| DeckError::Operation(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_info::PageInfo;
    use crate::test_pdf::create_test_pdf;

    fn rotation_of(bytes: &[u8], page: u32) -> i32 {
        let doc = Document::load_mem(bytes).unwrap();
        PageInfo::from_document(&doc, page).unwrap().rotation
    }

    #[test]
    fn test_rotate_all_pages() {
        let pdf = create_test_pdf(3);
        let result = rotate_pages(&pdf, None, 90).unwrap();
        for page in 1..=3 {
            assert_eq!(rotation_of(&result, page), 90);
        }
    }

    #[test]
    fn test_rotate_selected_pages() {
        let pdf = create_test_pdf(3);
        let result = rotate_pages(&pdf, Some(vec![2]), 180).unwrap();
        assert_eq!(rotation_of(&result, 1), 0);
        assert_eq!(rotation_of(&result, 2), 180);
        assert_eq!(rotation_of(&result, 3), 0);
    }

    #[test]
    fn test_rotate_composes() {
        let pdf = create_test_pdf(1);
        let once = rotate_pages(&pdf, None, 270).unwrap();
        let twice = rotate_pages(&once, None, 180).unwrap();
        assert_eq!(rotation_of(&twice, 1), 90); // 270 + 180 = 450 -> 90
    }

    #[test]
    fn test_rotate_invalid_degrees_fails() {
        let pdf = create_test_pdf(1);
        assert!(rotate_pages(&pdf, None, 45).is_err());
        assert!(rotate_pages(&pdf, None, 0).is_err());
        assert!(rotate_pages(&pdf, None, -90).is_err());
    }

    #[test]
    fn test_rotate_out_of_range_fails() {
        let pdf = create_test_pdf(2);
        assert!(rotate_pages(&pdf, Some(vec![3]), 90).is_err());
        assert!(rotate_pages(&pdf, Some(vec![]), 90).is_err());
    }
}
