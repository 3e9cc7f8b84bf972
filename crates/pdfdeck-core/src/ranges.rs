//! Page selection parsing
//!
//! Selections are written the way users type them into a page picker:
//! `"1-3, 5, 8-10"`. Pages are 1-indexed; parsing yields a sorted,
//! deduplicated list.

use std::collections::BTreeSet;

use crate::error::DeckError;

/// Parse a selection string like "1-3, 5, 8-10" into sorted unique
/// 1-indexed page numbers.
pub fn parse_ranges(input: &str) -> Result<Vec<u32>, DeckError> {
    let mut pages = BTreeSet::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start = parse_page(start)?;
            let end = parse_page(end)?;

            if start > end {
                return Err(DeckError::InvalidRange(format!(
                    "Start {} > end {}",
                    start, end
                )));
            }

            for page in start..=end {
                pages.insert(page);
            }
        } else {
            pages.insert(parse_page(part)?);
        }
    }

    if pages.is_empty() {
        return Err(DeckError::InvalidRange("No pages selected".into()));
    }

    Ok(pages.into_iter().collect())
}

/// Parse a selection and check every page against the document's page count.
pub fn parse_ranges_bounded(input: &str, page_count: u32) -> Result<Vec<u32>, DeckError> {
    let pages = parse_ranges(input)?;
    for &page in &pages {
        if page > page_count {
            return Err(DeckError::InvalidRange(format!(
                "Page {} is out of range (1-{})",
                page, page_count
            )));
        }
    }
    Ok(pages)
}

/// Convert 1-indexed page numbers to the zero-based index set used when
/// addressing pages positionally.
pub fn to_zero_based(pages: &[u32]) -> BTreeSet<usize> {
    pages
        .iter()
        .filter(|&&p| p > 0)
        .map(|&p| (p - 1) as usize)
        .collect()
}

fn parse_page(s: &str) -> Result<u32, DeckError> {
    let page: u32 = s
        .trim()
        .parse()
        .map_err(|_| DeckError::InvalidRange(format!("Invalid page: {}", s.trim())))?;
    if page == 0 {
        return Err(DeckError::InvalidRange(
            "Page numbers are 1-indexed".into(),
        ));
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_single() {
        assert_eq!(parse_ranges("5").unwrap(), vec![5]);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_ranges("1-3").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_mixed() {
        assert_eq!(parse_ranges("1-3, 5, 8-10").unwrap(), vec![1, 2, 3, 5, 8, 9, 10]);
    }

    #[test]
    fn test_parse_deduplicates_overlap() {
        assert_eq!(parse_ranges("1-3, 2-4").unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_rejects_zero() {
        assert!(parse_ranges("0").is_err());
        assert!(parse_ranges("0-3").is_err());
    }

    #[test]
    fn test_parse_rejects_reversed() {
        assert!(parse_ranges("5-3").is_err());
    }

    #[test]
    fn test_parse_rejects_junk() {
        assert!(parse_ranges("abc").is_err());
        assert!(parse_ranges("1-2-3").is_err());
        assert!(parse_ranges("").is_err());
        assert!(parse_ranges(",,").is_err());
    }

    #[test]
    fn test_bounded_rejects_out_of_range() {
        assert!(parse_ranges_bounded("1-5", 3).is_err());
        assert_eq!(parse_ranges_bounded("1-3", 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_based_expansion() {
        let pages = parse_ranges("1-3, 5").unwrap();
        let indices = to_zero_based(&pages);
        assert_eq!(indices, [0usize, 1, 2, 4].into_iter().collect());
    }

    proptest! {
        /// Parsed selections are always sorted and unique.
        #[test]
        fn parsed_selection_sorted_unique(s in "[0-9, -]{1,32}") {
            if let Ok(pages) = parse_ranges(&s) {
                let mut sorted = pages.clone();
                sorted.sort_unstable();
                sorted.dedup();
                prop_assert_eq!(pages, sorted);
            }
        }

        /// A single in-range page always parses to itself.
        #[test]
        fn single_page_roundtrip(page in 1u32..10_000) {
            let parsed = parse_ranges(&page.to_string()).unwrap();
            prop_assert_eq!(parsed, vec![page]);
        }

        /// Well-formed ranges expand to end - start + 1 pages.
        #[test]
        fn range_expansion_len(start in 1u32..500, len in 0u32..100) {
            let end = start + len;
            let parsed = parse_ranges(&format!("{}-{}", start, end)).unwrap();
            prop_assert_eq!(parsed.len() as u32, len + 1);
        }
    }
}
