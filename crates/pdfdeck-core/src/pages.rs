//! Page deletion and reordering

use std::collections::HashSet;

use lopdf::Document;

use crate::error::DeckError;
use crate::merge::update_page_tree;
use crate::split::extract_pages;

/// Remove the listed pages (1-indexed). At least one page must remain.
pub fn delete_pages(bytes: &[u8], pages: Vec<u32>) -> Result<Vec<u8>, DeckError> {
    if pages.is_empty() {
        return Err(DeckError::InvalidRange("No pages specified".into()));
    }

    let doc = Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;
    let page_count = doc.get_pages().len() as u32;

    let remove: HashSet<u32> = pages.iter().copied().collect();
    for &page in &pages {
        if page == 0 || page > page_count {
            return Err(DeckError::InvalidRange(format!(
                "Page {} does not exist (document has {} pages)",
                page, page_count
            )));
        }
    }

    let keep: Vec<u32> = (1..=page_count).filter(|p| !remove.contains(p)).collect();
    if keep.is_empty() {
        return Err(DeckError::InvalidRange(
            "Cannot delete every page of a document".into(),
        ));
    }

    extract_pages(bytes, keep)
}

/// Reorder pages according to `order`, a complete permutation of the
/// current 1-indexed page numbers.
pub fn reorder_pages(bytes: &[u8], order: &[u32]) -> Result<Vec<u8>, DeckError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;
    let pages = doc.get_pages();
    let page_count = pages.len() as u32;

    if order.len() as u32 != page_count {
        return Err(DeckError::InvalidRange(format!(
            "Order lists {} pages, document has {}",
            order.len(),
            page_count
        )));
    }

    let mut seen = vec![false; page_count as usize];
    for &page in order {
        if page == 0 || page > page_count {
            return Err(DeckError::InvalidRange(format!(
                "Page {} does not exist (document has {} pages)",
                page, page_count
            )));
        }
        let idx = (page - 1) as usize;
        if seen[idx] {
            return Err(DeckError::InvalidRange(format!(
                "Page {} listed twice in order",
                page
            )));
        }
        seen[idx] = true;
    }

    let new_refs = order
        .iter()
        .map(|page| pages[page])
        .collect::<Vec<_>>();

    update_page_tree(&mut doc, new_refs)?;
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| DeckError::Operation(format!("Save failed: {}", e)))?;

    Ok(buffer)
}
