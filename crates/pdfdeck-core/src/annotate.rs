//! Page editing via an annotation log
//!
//! The editing tool records user edits as an ordered operation log; the
//! log is applied in one pass, producing annotations on the target pages.
//! Logs serialize to JSON so an edit session can be saved and resumed.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use serde::{Deserialize, Serialize};

use crate::color::parse_hex_color;
use crate::error::DeckError;
use crate::fonts::FontFamily;

pub type OpId = u64;

/// Rectangle in PDF user space (origin bottom-left, points).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    fn corners(&self) -> [f32; 4] {
        [
            self.x as f32,
            self.y as f32,
            (self.x + self.width) as f32,
            (self.y + self.height) as f32,
        ]
    }
}

/// Text appearance for added text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    #[serde(default = "default_text_size")]
    pub font_size: f64,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default)]
    pub font_family: FontFamily,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

fn default_text_size() -> f64 {
    12.0
}

fn default_text_color() -> String {
    "#000000".to_string()
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            color: "#000000".to_string(),
            font_family: FontFamily::default(),
            bold: false,
            italic: false,
        }
    }
}

/// One recorded edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum EditOperation {
    AddText {
        id: OpId,
        page: u32,
        rect: Rect,
        text: String,
        style: TextStyle,
    },
    Highlight {
        id: OpId,
        page: u32,
        rect: Rect,
        color: String,
        opacity: f64,
    },
    /// Opaque white cover over the rect
    Redact { id: OpId, page: u32, rect: Rect },
}

impl EditOperation {
    pub fn id(&self) -> OpId {
        match self {
            Self::AddText { id, .. } | Self::Highlight { id, .. } | Self::Redact { id, .. } => *id,
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            Self::AddText { page, .. }
            | Self::Highlight { page, .. }
            | Self::Redact { page, .. } => *page,
        }
    }

    fn set_id(&mut self, new_id: OpId) {
        match self {
            Self::AddText { id, .. } | Self::Highlight { id, .. } | Self::Redact { id, .. } => {
                *id = new_id
            }
        }
    }
}

/// Ordered edit log with stable IDs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditLog {
    next_id: OpId,
    operations: Vec<EditOperation>,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation; the id field of the input is overwritten with a
    /// freshly assigned one, which is returned.
    pub fn add(&mut self, mut op: EditOperation) -> OpId {
        let id = self.next_id;
        self.next_id += 1;
        op.set_id(id);
        self.operations.push(op);
        id
    }

    pub fn remove(&mut self, id: OpId) -> bool {
        if let Some(pos) = self.operations.iter().position(|op| op.id() == id) {
            self.operations.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn operations(&self) -> &[EditOperation] {
        &self.operations
    }

    pub fn operations_for_page(&self, page: u32) -> Vec<&EditOperation> {
        self.operations.iter().filter(|op| op.page() == page).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Apply every logged edit to the document.
pub fn apply_edits(bytes: &[u8], log: &EditLog) -> Result<Vec<u8>, DeckError> {
    if log.is_empty() {
        return Ok(bytes.to_vec());
    }

    let mut doc = Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;

    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    let page_count = pages.len() as u32;

    for op in log.operations() {
        if op.page() == 0 || op.page() > page_count {
            return Err(DeckError::InvalidRange(format!(
                "Edit targets page {}, document has {}",
                op.page(),
                page_count
            )));
        }
    }

    for (page_num, page_id) in &pages {
        for op in log.operations_for_page(*page_num) {
            let annot_id = doc.add_object(Object::Dictionary(build_annotation(op)));
            attach_annotation(&mut doc, *page_id, annot_id)?;
        }
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| DeckError::Operation(e.to_string()))?;

    Ok(output)
}

fn build_annotation(op: &EditOperation) -> Dictionary {
    match op {
        EditOperation::AddText {
            rect, text, style, ..
        } => free_text(rect, text, style),
        EditOperation::Highlight {
            rect,
            color,
            opacity,
            ..
        } => highlight(rect, color, *opacity),
        EditOperation::Redact { rect, .. } => white_cover(rect),
    }
}

fn annot_base(subtype: &[u8], rect: &Rect) -> Dictionary {
    let [x1, y1, x2, y2] = rect.corners();
    let mut annot = Dictionary::new();
    annot.set("Type", Object::Name(b"Annot".to_vec()));
    annot.set("Subtype", Object::Name(subtype.to_vec()));
    annot.set(
        "Rect",
        Object::Array(vec![
            Object::Real(x1),
            Object::Real(y1),
            Object::Real(x2),
            Object::Real(y2),
        ]),
    );
    annot
}

fn free_text(rect: &Rect, text: &str, style: &TextStyle) -> Dictionary {
    let mut annot = annot_base(b"FreeText", rect);
    annot.set(
        "Contents",
        Object::String(text.as_bytes().to_vec(), StringFormat::Literal),
    );

    let (r, g, b) = parse_hex_color(&style.color);
    let font = style.font_family.base_font(style.bold, style.italic);
    let da = format!("/{} {} Tf {} {} {} rg", font, style.font_size, r, g, b);
    annot.set("DA", Object::String(da.into_bytes(), StringFormat::Literal));
    annot
}

fn highlight(rect: &Rect, color: &str, opacity: f64) -> Dictionary {
    let [x1, y1, x2, y2] = rect.corners();
    let mut annot = annot_base(b"Highlight", rect);
    // Quad covers the rect corner-to-corner
    annot.set(
        "QuadPoints",
        Object::Array(vec![
            Object::Real(x1),
            Object::Real(y2),
            Object::Real(x2),
            Object::Real(y2),
            Object::Real(x1),
            Object::Real(y1),
            Object::Real(x2),
            Object::Real(y1),
        ]),
    );
    annot.set("CA", Object::Real(opacity.clamp(0.0, 1.0) as f32));

    let (r, g, b) = parse_hex_color(color);
    annot.set(
        "C",
        Object::Array(vec![
            Object::Real(r),
            Object::Real(g),
            Object::Real(b),
        ]),
    );
    annot
}

fn white_cover(rect: &Rect) -> Dictionary {
    let mut annot = annot_base(b"Square", rect);
    let white = || {
        Object::Array(vec![
            Object::Real(1.0),
            Object::Real(1.0),
            Object::Real(1.0),
        ])
    };
    annot.set("IC", white());
    annot.set("C", white());

    let mut bs = Dictionary::new();
    bs.set("W", Object::Integer(0));
    annot.set("BS", Object::Dictionary(bs));
    annot
}

fn attach_annotation(
    doc: &mut Document,
    page_id: ObjectId,
    annot_id: ObjectId,
) -> Result<(), DeckError> {
    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| DeckError::Operation(e.to_string()))?;

    if let Object::Dictionary(ref mut page_dict) = page {
        if let Ok(Object::Array(ref mut arr)) = page_dict.get_mut(b"Annots") {
            arr.push(Object::Reference(annot_id));
        } else {
            page_dict.set("Annots", Object::Array(vec![Object::Reference(annot_id)]));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::create_test_pdf;

    fn rect() -> Rect {
        Rect {
            x: 100.0,
            y: 600.0,
            width: 200.0,
            height: 20.0,
        }
    }

    #[test]
    fn test_log_starts_empty() {
        let log = EditLog::new();
        assert!(log.is_empty());
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        let mut log = EditLog::new();
        let a = log.add(EditOperation::Redact {
            id: 0,
            page: 1,
            rect: rect(),
        });
        let b = log.add(EditOperation::Redact {
            id: 0,
            page: 2,
            rect: rect(),
        });
        assert_ne!(a, b);
    }

    #[test]
    fn test_remove_by_id() {
        let mut log = EditLog::new();
        let id = log.add(EditOperation::Redact {
            id: 0,
            page: 1,
            rect: rect(),
        });
        assert!(log.remove(id));
        assert!(log.is_empty());
        assert!(!log.remove(id));
    }

    #[test]
    fn test_operations_for_page_filters() {
        let mut log = EditLog::new();
        log.add(EditOperation::Redact {
            id: 0,
            page: 1,
            rect: rect(),
        });
        log.add(EditOperation::Highlight {
            id: 0,
            page: 2,
            rect: rect(),
            color: "#FFFF00".to_string(),
            opacity: 0.5,
        });
        log.add(EditOperation::Redact {
            id: 0,
            page: 1,
            rect: rect(),
        });

        assert_eq!(log.operations_for_page(1).len(), 2);
        assert_eq!(log.operations_for_page(2).len(), 1);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut log = EditLog::new();
        log.add(EditOperation::AddText {
            id: 0,
            page: 1,
            rect: rect(),
            text: "Hello".to_string(),
            style: TextStyle::default(),
        });

        let json = log.to_json().unwrap();
        let restored = EditLog::from_json(&json).unwrap();
        assert_eq!(log.operations(), restored.operations());
    }

    #[test]
    fn test_empty_log_returns_original() {
        let pdf = create_test_pdf(1);
        let result = apply_edits(&pdf, &EditLog::new()).unwrap();
        assert_eq!(result, pdf);
    }

    #[test]
    fn test_apply_text_produces_valid_pdf() {
        let pdf = create_test_pdf(1);
        let mut log = EditLog::new();
        log.add(EditOperation::AddText {
            id: 0,
            page: 1,
            rect: rect(),
            text: "Inserted".to_string(),
            style: TextStyle::default(),
        });

        let result = apply_edits(&pdf, &log).unwrap();
        assert!(result.starts_with(b"%PDF-"));
        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_apply_multiple_operations_same_page() {
        let pdf = create_test_pdf(1);
        let mut log = EditLog::new();
        log.add(EditOperation::AddText {
            id: 0,
            page: 1,
            rect: rect(),
            text: "Title".to_string(),
            style: TextStyle::default(),
        });
        log.add(EditOperation::Highlight {
            id: 0,
            page: 1,
            rect: rect(),
            color: "#FFFF00".to_string(),
            opacity: 0.3,
        });
        log.add(EditOperation::Redact {
            id: 0,
            page: 1,
            rect: rect(),
        });

        let result = apply_edits(&pdf, &log).unwrap();
        let doc = Document::load_mem(&result).unwrap();

        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annots.len(), 3);
    }

    #[test]
    fn test_apply_out_of_range_page_fails() {
        let pdf = create_test_pdf(2);
        let mut log = EditLog::new();
        log.add(EditOperation::Redact {
            id: 0,
            page: 5,
            rect: rect(),
        });
        assert!(apply_edits(&pdf, &log).is_err());
    }

    #[test]
    fn test_redact_annotation_is_white_square() {
        let pdf = create_test_pdf(1);
        let mut log = EditLog::new();
        log.add(EditOperation::Redact {
            id: 0,
            page: 1,
            rect: rect(),
        });

        let result = apply_edits(&pdf, &log).unwrap();
        let text = String::from_utf8_lossy(&result);
        assert!(text.contains("/Square"));
        assert!(text.contains("/IC"));
    }
}
