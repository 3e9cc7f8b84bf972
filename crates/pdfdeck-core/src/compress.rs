//! Document compression
//!
//! Re-compresses content streams and prunes unreferenced objects. PDFs
//! are frequently already well compressed, so the result is only used
//! when it is actually smaller than the input.

use lopdf::Document;
use serde::Serialize;

use crate::error::DeckError;

/// Result of a compression attempt.
#[derive(Debug, Clone, Serialize)]
pub struct CompressOutcome {
    pub bytes: Vec<u8>,
    pub input_size: usize,
    pub output_size: usize,
    /// False when recompression did not shrink the file and the input
    /// was returned unchanged.
    pub reduced: bool,
}

/// Recompress a document. Never produces a larger file: if recompression
/// does not help, the original bytes come back with `reduced == false`.
pub fn compress(bytes: &[u8]) -> Result<CompressOutcome, DeckError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| DeckError::Parse(e.to_string()))?;

    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| DeckError::Operation(format!("Save failed: {}", e)))?;

    let input_size = bytes.len();
    if buffer.len() < input_size {
        Ok(CompressOutcome {
            output_size: buffer.len(),
            bytes: buffer,
            input_size,
            reduced: true,
        })
    } else {
        Ok(CompressOutcome {
            bytes: bytes.to_vec(),
            input_size,
            output_size: input_size,
            reduced: false,
        })
    }
}
