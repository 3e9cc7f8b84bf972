//! ZIP packaging of batch outputs

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use crate::error::BatchError;
use crate::runner::BatchOutput;

/// Package outputs into a ZIP archive, the download format for batch
/// results. Duplicate names get a " (n)" suffix before the extension.
pub fn zip_outputs(outputs: &[BatchOutput]) -> Result<Vec<u8>, BatchError> {
    if outputs.is_empty() {
        return Err(BatchError::Archive("No outputs to package".into()));
    }

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut used = HashSet::new();
    for output in outputs {
        let name = unique_name(&mut used, &output.name);
        writer
            .start_file(name, options)
            .map_err(|e| BatchError::Archive(e.to_string()))?;
        writer
            .write_all(&output.bytes)
            .map_err(|e| BatchError::Archive(e.to_string()))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| BatchError::Archive(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn unique_name(used: &mut HashSet<String>, name: &str) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    for n in 1.. {
        let candidate = match ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", name, n),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
    }
    unreachable!()
}
