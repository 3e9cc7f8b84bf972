//! PDF Deck document tools
//!
//! Single-purpose PDF operations over in-memory byte buffers: merge,
//! page extraction and splitting, deletion, reordering, rotation, text
//! watermarks, annotation-based edits, recompression, metadata, and
//! image-to-PDF conversion. Byte-level parsing and writing is delegated
//! to `lopdf`; this crate owns the operations and their contracts.

pub mod annotate;
pub mod compress;
pub mod convert;
pub mod error;
pub mod filename;
pub mod fonts;
pub mod merge;
pub mod metadata;
pub mod page_info;
pub mod pages;
pub mod ranges;
pub mod rotate;
pub mod split;
pub mod validation;
pub mod watermark;

mod color;
#[cfg(test)]
pub(crate) mod test_pdf;

pub use annotate::{apply_edits, EditLog, EditOperation, Rect, TextStyle};
pub use compress::{compress, CompressOutcome};
pub use convert::{detect_format, images_to_pdf, ImageFormat};
pub use error::DeckError;
pub use filename::{ensure_extension, output_name, sanitize};
pub use merge::{merge, merge_documents, MergeInput};
pub use metadata::{read_metadata, set_metadata, DocumentMetadata};
pub use page_info::{PageInfo, PageOrientation};
pub use pages::{delete_pages, reorder_pages};
pub use ranges::{parse_ranges, parse_ranges_bounded, to_zero_based};
pub use rotate::rotate_pages;
pub use split::{extract_pages, split_into_parts};
pub use validation::{quick_validate, validate, PdfInfo};
pub use watermark::{watermark, WatermarkPlacement, WatermarkSpec};

/// Parse PDF bytes and return the page count.
pub fn get_page_count(bytes: &[u8]) -> Result<u32, DeckError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}
