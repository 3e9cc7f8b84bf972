//! Document Info dictionary handling

use lopdf::{Dictionary, Document, Object, StringFormat};
use serde::{Deserialize, Serialize};

use crate::error::DeckError;

/// Metadata fields a tool may set on an output document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
}

impl DocumentMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }

    /// Build from optional strings; whitespace-only values become None.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        let clean = |opt: Option<String>| {
            opt.filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
        };
        Self {
            title: clean(title),
            author: clean(author),
            subject: clean(subject),
            keywords: clean(keywords),
        }
    }
}

/// Read the Info dictionary of a document.
pub fn read_metadata(bytes: &[u8]) -> Result<DocumentMetadata, DeckError> {
    let doc = Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;

    let mut meta = DocumentMetadata::default();
    if let Ok(info_ref) = doc.trailer.get(b"Info") {
        if let Ok(info_id) = info_ref.as_reference() {
            if let Some(Ok(dict)) = doc.objects.get(&info_id).map(|o| o.as_dict()) {
                meta.title = entry(dict, b"Title");
                meta.author = entry(dict, b"Author");
                meta.subject = entry(dict, b"Subject");
                meta.keywords = entry(dict, b"Keywords");
            }
        }
    }
    Ok(meta)
}

/// Set the given fields on a document's Info dictionary, leaving other
/// fields untouched, and return the new bytes.
pub fn set_metadata(bytes: &[u8], meta: &DocumentMetadata) -> Result<Vec<u8>, DeckError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;

    apply_metadata(&mut doc, meta);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| DeckError::Operation(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

/// In-place variant used by tools that already hold a loaded document.
pub(crate) fn apply_metadata(doc: &mut Document, meta: &DocumentMetadata) {
    // Reuse the existing Info dictionary if there is one
    let existing = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|o| o.as_reference().ok());

    let mut dict = existing
        .and_then(|id| doc.objects.get(&id))
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let mut set = |key: &str, value: &Option<String>| {
        if let Some(v) = value {
            dict.set(
                key,
                Object::String(v.as_bytes().to_vec(), StringFormat::Literal),
            );
        }
    };
    set("Title", &meta.title);
    set("Author", &meta.author);
    set("Subject", &meta.subject);
    set("Keywords", &meta.keywords);

    match existing {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(dict));
        }
        None => {
            let id = doc.add_object(Object::Dictionary(dict));
            doc.trailer.set("Info", Object::Reference(id));
        }
    }
}

fn entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let raw = dict.get(key).ok()?.as_str().ok()?;
    let s = String::from_utf8_lossy(raw);
    if s.is_empty() {
        None
    } else {
        Some(s.into_owned())
    }
}
