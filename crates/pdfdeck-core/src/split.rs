//! Page extraction and document splitting

use std::collections::HashSet;

use lopdf::Document;

use crate::error::DeckError;

/// Extract only the listed pages (1-indexed) into a new document.
///
/// Works by deleting the complement: unwanted pages are removed in reverse
/// order, then orphaned objects are pruned.
pub fn extract_pages(bytes: &[u8], pages: Vec<u32>) -> Result<Vec<u8>, DeckError> {
    if pages.is_empty() {
        return Err(DeckError::InvalidRange("No pages specified".into()));
    }
    if pages.contains(&0) {
        return Err(DeckError::InvalidRange("Page numbers must be >= 1".into()));
    }

    let doc = Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;
    let page_count = doc.get_pages().len() as u32;

    for &page in &pages {
        if page > page_count {
            return Err(DeckError::InvalidRange(format!(
                "Page {} does not exist (document has {} pages)",
                page, page_count
            )));
        }
    }

    let mut new_doc = doc.clone();

    let keep: HashSet<u32> = pages.iter().copied().collect();
    let mut delete: Vec<u32> = (1..=page_count).filter(|p| !keep.contains(p)).collect();

    // Delete in reverse order so remaining indices stay valid
    delete.reverse();
    for page_num in delete {
        new_doc.delete_pages(&[page_num]);
    }

    new_doc.prune_objects();
    new_doc.compress();

    let mut buffer = Vec::new();
    new_doc
        .save_to(&mut buffer)
        .map_err(|e| DeckError::Operation(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

/// Split a document into one output per part, where each part is its own
/// page selection. Parts may overlap; each output is extracted from the
/// original bytes.
pub fn split_into_parts(bytes: &[u8], parts: &[Vec<u32>]) -> Result<Vec<Vec<u8>>, DeckError> {
    if parts.is_empty() {
        return Err(DeckError::InvalidRange("No parts specified".into()));
    }

    parts
        .iter()
        .map(|pages| extract_pages(bytes, pages.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::create_test_pdf;

    #[test]
    fn test_extract_empty_pages_fails() {
        let pdf = create_test_pdf(5);
        assert!(extract_pages(&pdf, vec![]).is_err());
    }

    #[test]
    fn test_extract_single_page() {
        let pdf = create_test_pdf(5);
        let result = extract_pages(&pdf, vec![1]).unwrap();
        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_extract_multiple_pages() {
        let pdf = create_test_pdf(5);
        let result = extract_pages(&pdf, vec![1, 3, 5]).unwrap();
        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_extract_range() {
        let pdf = create_test_pdf(10);
        let result = extract_pages(&pdf, vec![2, 3, 4, 5]).unwrap();
        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[test]
    fn test_extract_invalid_page_fails() {
        let pdf = create_test_pdf(5);
        assert!(extract_pages(&pdf, vec![10]).is_err());
    }

    #[test]
    fn test_extract_page_zero_fails() {
        let pdf = create_test_pdf(5);
        assert!(extract_pages(&pdf, vec![0]).is_err());
    }

    #[test]
    fn test_split_into_parts() {
        let pdf = create_test_pdf(6);
        let parts = split_into_parts(&pdf, &[vec![1, 2], vec![3, 4, 5], vec![6]]).unwrap();
        assert_eq!(parts.len(), 3);

        let counts: Vec<usize> = parts
            .iter()
            .map(|p| Document::load_mem(p).unwrap().get_pages().len())
            .collect();
        assert_eq!(counts, vec![2, 3, 1]);
    }

    #[test]
    fn test_split_into_parts_overlapping() {
        let pdf = create_test_pdf(4);
        let parts = split_into_parts(&pdf, &[vec![1, 2, 3], vec![2, 3, 4]]).unwrap();
        assert_eq!(parts.len(), 2);
        for part in &parts {
            assert_eq!(Document::load_mem(part).unwrap().get_pages().len(), 3);
        }
    }

    #[test]
    fn test_split_no_parts_fails() {
        let pdf = create_test_pdf(4);
        assert!(split_into_parts(&pdf, &[]).is_err());
    }
}
