//! PDF validation and info extraction

use lopdf::Document;
use serde::Serialize;

use crate::error::DeckError;

/// File-level information extracted during validation
#[derive(Debug, Clone, Serialize, Default)]
pub struct PdfInfo {
    /// Number of pages in the document
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    /// Whether the document is encrypted
    pub encrypted: bool,
    /// File size in bytes
    pub size_bytes: usize,
    /// Document title from metadata (if available)
    pub title: Option<String>,
    /// Document author from metadata (if available)
    pub author: Option<String>,
}

/// Validate a PDF and extract basic info. Fully parses the document.
pub fn validate(bytes: &[u8]) -> Result<PdfInfo, DeckError> {
    quick_validate(bytes)?;

    let version = header_version(bytes);

    let document =
        Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;

    let encrypted = document.is_encrypted();

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(DeckError::InvalidInput("PDF has no pages".into()));
    }

    let (title, author) = info_strings(&document);

    Ok(PdfInfo {
        page_count,
        version,
        encrypted,
        size_bytes: bytes.len(),
        title,
        author,
    })
}

/// Header/EOF check without parsing. Cheap enough for any upload size.
pub fn quick_validate(bytes: &[u8]) -> Result<(), DeckError> {
    if bytes.len() < 8 {
        return Err(DeckError::InvalidInput(
            "File too small to be a valid PDF".into(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(DeckError::InvalidInput(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }

    // %%EOF should appear near the end of the file
    let tail = if bytes.len() > 1024 {
        &bytes[bytes.len() - 1024..]
    } else {
        bytes
    };
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(DeckError::InvalidInput(
            "PDF appears truncated (missing %%EOF marker)".into(),
        ));
    }

    Ok(())
}

/// Extract the version from the %PDF-x.y header.
fn header_version(bytes: &[u8]) -> String {
    if bytes.len() >= 8 && bytes.starts_with(b"%PDF-") {
        if let Ok(version) = std::str::from_utf8(&bytes[5..8]) {
            return version.trim().to_string();
        }
    }
    "1.4".to_string()
}

/// Title and author from the trailer Info dictionary.
fn info_strings(document: &Document) -> (Option<String>, Option<String>) {
    let mut title = None;
    let mut author = None;

    if let Ok(info_ref) = document.trailer.get(b"Info") {
        if let Ok(info_id) = info_ref.as_reference() {
            if let Some(info_obj) = document.objects.get(&info_id) {
                if let Ok(info_dict) = info_obj.as_dict() {
                    title = dict_string(info_dict, b"Title");
                    author = dict_string(info_dict, b"Author");
                }
            }
        }
    }

    (title, author)
}

fn dict_string(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    let obj = dict.get(key).ok()?;
    let raw = obj.as_str().ok()?;
    let decoded = String::from_utf8_lossy(raw);
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.into_owned())
    }
}
