//! PDF merge
//!
//! Combines multiple documents into one, with optional per-input page
//! selection and output metadata stamping.
//!
//! The algorithm:
//! 1. Apply any per-input page selection
//! 2. Use the first document as the destination
//! 3. For each further source: offset all object IDs past the
//!    destination's max, remap internal references, append its pages
//! 4. Rebuild the destination page tree, stamp metadata, compress

use std::collections::BTreeMap;

use lopdf::{Document, Object, ObjectId};

use crate::error::DeckError;
use crate::metadata::DocumentMetadata;
use crate::split::extract_pages;

/// One merge input: raw bytes plus an optional page selection (1-indexed).
#[derive(Debug, Clone)]
pub struct MergeInput {
    pub bytes: Vec<u8>,
    pub pages: Option<Vec<u32>>,
}

impl MergeInput {
    pub fn all(bytes: Vec<u8>) -> Self {
        Self { bytes, pages: None }
    }
}

/// Merge whole documents in order.
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, DeckError> {
    merge(
        documents.into_iter().map(MergeInput::all).collect(),
        &DocumentMetadata::default(),
    )
}

/// Merge inputs in order, honoring page selections and stamping `metadata`
/// onto the output when non-empty.
pub fn merge(inputs: Vec<MergeInput>, metadata: &DocumentMetadata) -> Result<Vec<u8>, DeckError> {
    if inputs.is_empty() {
        return Err(DeckError::Operation("No documents to merge".into()));
    }

    // Resolve selections up front so a bad range fails before any work
    let mut buffers = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.into_iter().enumerate() {
        let bytes = match input.pages {
            Some(pages) => extract_pages(&input.bytes, pages).map_err(|e| {
                DeckError::InvalidRange(format!("Input {}: {}", i + 1, e))
            })?,
            None => input.bytes,
        };
        buffers.push(bytes);
    }

    // Single input passes through untouched unless metadata was requested
    if buffers.len() == 1 && metadata.is_empty() {
        return Ok(buffers.into_iter().next().unwrap());
    }

    let mut loaded = Vec::with_capacity(buffers.len());
    for (i, bytes) in buffers.iter().enumerate() {
        let doc = Document::load_mem(bytes).map_err(|e| {
            DeckError::Parse(format!("Failed to load document {}: {}", i + 1, e))
        })?;
        loaded.push(doc);
    }

    let mut dest = loaded.remove(0);
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = page_references(&dest)?;

    for source in loaded.into_iter() {
        let source_pages = page_references(&source)?;
        let id_offset = dest_max_id;

        // Remap every object ID in the source past the destination's range
        let mut remapped = BTreeMap::new();
        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            remapped.insert(new_id, remap_object_refs(object, id_offset));
        }
        for (id, object) in remapped {
            dest.objects.insert(id, object);
        }

        for old_page_ref in source_pages {
            dest_page_refs.push((old_page_ref.0 + id_offset, old_page_ref.1));
        }

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    update_page_tree(&mut dest, dest_page_refs)?;
    dest.max_id = dest_max_id;

    if !metadata.is_empty() {
        crate::metadata::apply_metadata(&mut dest, metadata);
    }

    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer)
        .map_err(|e| DeckError::Operation(format!("Failed to save merged PDF: {}", e)))?;

    Ok(buffer)
}

/// All page object references of a document, in page order.
fn page_references(doc: &Document) -> Result<Vec<ObjectId>, DeckError> {
    Ok(doc.get_pages().values().copied().collect())
}

/// Recursively remap object references in an object.
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the root Pages node at the combined page list.
pub(crate) fn update_page_tree(
    doc: &mut Document,
    page_refs: Vec<ObjectId>,
) -> Result<(), DeckError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .map_err(|_| DeckError::Operation("No Root in trailer".into()))?
        .as_reference()
        .map_err(|_| DeckError::Operation("Root is not a reference".into()))?;

    let pages_id = doc
        .objects
        .get(&catalog_id)
        .ok_or_else(|| DeckError::Operation("Catalog not found".into()))?
        .as_dict()
        .map_err(|_| DeckError::Operation("Invalid catalog".into()))?
        .get(b"Pages")
        .map_err(|_| DeckError::Operation("No Pages in catalog".into()))?
        .as_reference()
        .map_err(|_| DeckError::Operation("Pages is not a reference".into()))?;

    if let Some(Object::Dictionary(ref mut pages_dict)) = doc.objects.get_mut(&pages_id) {
        let kids = page_refs
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>();
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
        Ok(())
    } else {
        Err(DeckError::Operation("Invalid pages dictionary".into()))
    }
}
