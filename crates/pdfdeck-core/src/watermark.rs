//! Text watermark stamping
//!
//! Draws a semi-transparent text stamp into each page's content, either
//! placed once in the page center or tiled across a grid. The stamp is a
//! real content stream (not an annotation), so it survives flattening and
//! prints the way it renders.

use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

use crate::color::parse_hex_color;
use crate::error::DeckError;
use crate::fonts::{approximate_text_width, FontFamily};
use crate::page_info::PageInfo;

/// Where stamps land on each page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WatermarkPlacement {
    /// One stamp, centered on the page
    Centered,
    /// A cols x rows grid of stamps
    Tiled { cols: u32, rows: u32 },
}

/// A text watermark description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkSpec {
    pub text: String,
    #[serde(default = "default_placement")]
    pub placement: WatermarkPlacement,
    #[serde(default)]
    pub font_family: FontFamily,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Counter-clockwise rotation of the stamp text, in degrees
    #[serde(default = "default_angle")]
    pub angle_degrees: f32,
}

fn default_placement() -> WatermarkPlacement {
    WatermarkPlacement::Centered
}

fn default_font_size() -> f32 {
    48.0
}

fn default_color() -> String {
    "#B0B0B0".to_string()
}

fn default_opacity() -> f32 {
    0.3
}

fn default_angle() -> f32 {
    45.0
}

impl WatermarkSpec {
    fn validate(&self) -> Result<(), DeckError> {
        if self.text.trim().is_empty() {
            return Err(DeckError::InvalidInput("Watermark text is empty".into()));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(DeckError::InvalidInput(format!(
                "Opacity {} out of range (0-1)",
                self.opacity
            )));
        }
        if self.font_size <= 0.0 {
            return Err(DeckError::InvalidInput("Font size must be positive".into()));
        }
        if let WatermarkPlacement::Tiled { cols, rows } = self.placement {
            if cols == 0 || rows == 0 {
                return Err(DeckError::InvalidInput(
                    "Tile grid must be at least 1x1".into(),
                ));
            }
        }
        Ok(())
    }

    /// Stamp anchor points for a page, bottom-left text origin.
    fn anchors(&self, width: f32, height: f32) -> Vec<(f32, f32)> {
        let text_width = approximate_text_width(&self.text, self.font_size);
        let (sin, cos) = self.angle_degrees.to_radians().sin_cos();
        // Offset from a stamp's visual center back to its text origin
        let dx = cos * text_width / 2.0;
        let dy = sin * text_width / 2.0;

        match self.placement {
            WatermarkPlacement::Centered => {
                vec![(width / 2.0 - dx, height / 2.0 - dy)]
            }
            WatermarkPlacement::Tiled { cols, rows } => {
                let mut anchors = Vec::with_capacity((cols * rows) as usize);
                for row in 0..rows {
                    for col in 0..cols {
                        let cx = width * (col as f32 + 0.5) / cols as f32;
                        let cy = height * (row as f32 + 0.5) / rows as f32;
                        anchors.push((cx - dx, cy - dy));
                    }
                }
                anchors
            }
        }
    }
}

/// Apply the watermark to every page of a document.
pub fn watermark(bytes: &[u8], spec: &WatermarkSpec) -> Result<Vec<u8>, DeckError> {
    spec.validate()?;

    let mut doc = Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;

    let font_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        (
            "BaseFont",
            Object::Name(spec.font_family.base_font(false, false).as_bytes().to_vec()),
        ),
    ]);
    let font_id = doc.add_object(Object::Dictionary(font_dict));

    let gs_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(spec.opacity)),
        ("CA", Object::Real(spec.opacity)),
    ]);
    let gs_id = doc.add_object(Object::Dictionary(gs_dict));

    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

    for (page_num, page_id) in pages {
        let info = PageInfo::from_document(&doc, page_num)?;
        let anchors = spec.anchors(info.width, info.height);

        let stream_id = doc.add_object(stamp_stream(spec, &anchors)?);

        install_resources(&mut doc, page_id, font_id, gs_id)?;
        append_content(&mut doc, page_id, stream_id)?;
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| DeckError::Operation(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

/// Resource keys the stamp streams refer to.
const FONT_KEY: &str = "FwmDeck";
const GS_KEY: &str = "GSwmDeck";

/// Build one content stream stamping the text at every anchor.
fn stamp_stream(spec: &WatermarkSpec, anchors: &[(f32, f32)]) -> Result<Stream, DeckError> {
    let (r, g, b) = parse_hex_color(&spec.color);
    let (sin, cos) = spec.angle_degrees.to_radians().sin_cos();

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(GS_KEY.as_bytes().to_vec())]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_KEY.as_bytes().to_vec()),
                Object::Real(spec.font_size),
            ],
        ),
        Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ),
    ];

    for &(x, y) in anchors {
        // Text matrix: rotation around the stamp origin, translated to (x, y)
        operations.push(Operation::new(
            "Tm",
            vec![
                Object::Real(cos),
                Object::Real(sin),
                Object::Real(-sin),
                Object::Real(cos),
                Object::Real(x),
                Object::Real(y),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(
                spec.text.clone().into_bytes(),
                lopdf::StringFormat::Literal,
            )],
        ));
    }

    operations.push(Operation::new("ET", vec![]));
    operations.push(Operation::new("Q", vec![]));

    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|e| DeckError::Operation(format!("Failed to encode stamp: {}", e)))?;

    Ok(Stream::new(Dictionary::new(), encoded))
}

/// Register the stamp font and graphics state in the page's resources,
/// preserving whatever the page already declares. Referenced sub-
/// dictionaries are inlined as copies so they can be extended safely.
fn install_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    gs_id: ObjectId,
) -> Result<(), DeckError> {
    enum ResLoc {
        Page,
        Indirect(ObjectId),
    }

    let (loc, mut font_sub, mut gs_sub, mut res_inline) = {
        let page_dict = doc
            .get_object(page_id)
            .map_err(|e| DeckError::Operation(e.to_string()))?
            .as_dict()
            .map_err(|_| DeckError::Operation("Page is not a dictionary".into()))?;

        let (loc, res) = match page_dict.get(b"Resources") {
            Ok(Object::Reference(id)) => (
                ResLoc::Indirect(*id),
                doc.objects.get(id).and_then(|o| o.as_dict().ok()).cloned(),
            ),
            Ok(Object::Dictionary(d)) => (ResLoc::Page, Some(d.clone())),
            _ => (ResLoc::Page, None),
        };

        let font_sub = subdict(doc, res.as_ref(), b"Font");
        let gs_sub = subdict(doc, res.as_ref(), b"ExtGState");
        (loc, font_sub, gs_sub, res.unwrap_or_default())
    };

    font_sub.set(FONT_KEY, Object::Reference(font_id));
    gs_sub.set(GS_KEY, Object::Reference(gs_id));
    res_inline.set("Font", Object::Dictionary(font_sub));
    res_inline.set("ExtGState", Object::Dictionary(gs_sub));

    match loc {
        ResLoc::Indirect(id) => {
            doc.objects.insert(id, Object::Dictionary(res_inline));
        }
        ResLoc::Page => {
            let page = doc
                .get_object_mut(page_id)
                .map_err(|e| DeckError::Operation(e.to_string()))?;
            if let Object::Dictionary(ref mut dict) = page {
                dict.set("Resources", Object::Dictionary(res_inline));
            }
        }
    }

    Ok(())
}

fn subdict(doc: &Document, res: Option<&Dictionary>, key: &[u8]) -> Dictionary {
    match res.and_then(|r| r.get(key).ok()) {
        Some(Object::Dictionary(d)) => d.clone(),
        Some(Object::Reference(id)) => doc
            .objects
            .get(id)
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default(),
        _ => Dictionary::new(),
    }
}

/// Append a stream reference to the page's /Contents.
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    stream_id: ObjectId,
) -> Result<(), DeckError> {
    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| DeckError::Operation(e.to_string()))?;

    if let Object::Dictionary(ref mut dict) = page {
        let new_contents = match dict.get(b"Contents") {
            Ok(Object::Reference(id)) => Object::Array(vec![
                Object::Reference(*id),
                Object::Reference(stream_id),
            ]),
            Ok(Object::Array(arr)) => {
                let mut arr = arr.clone();
                arr.push(Object::Reference(stream_id));
                Object::Array(arr)
            }
            _ => Object::Array(vec![Object::Reference(stream_id)]),
        };
        dict.set("Contents", new_contents);
    }

    Ok(())
}
