//! Output filename helpers
//!
//! Every tool derives its download name from the input name; these helpers
//! keep that derivation predictable regardless of what the user uploaded.

/// Ensure `name` carries exactly the given extension (without dot).
///
/// Idempotent: applying the same extension twice never stacks suffixes.
pub fn ensure_extension(name: &str, ext: &str) -> String {
    let trimmed = name.trim();
    let stem = match trimmed.rsplit_once('.') {
        Some((stem, tail)) if tail.eq_ignore_ascii_case(ext) && !stem.is_empty() => stem,
        _ => trimmed.trim_end_matches('.'),
    };
    let stem = if stem.is_empty() { "document" } else { stem };
    format!("{}.{}", stem, ext)
}

/// Build an output name from an input name, a tool suffix, and the target
/// extension: `output_name("report.pdf", "-merged", "pdf")` is
/// `"report-merged.pdf"`.
pub fn output_name(input: &str, suffix: &str, ext: &str) -> String {
    let sanitized = sanitize(input);
    let stem = match sanitized.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => sanitized.clone(),
    };
    ensure_extension(&format!("{}{}", stem, suffix), ext)
}

/// Strip path separators and control characters from a user-supplied name.
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "document".to_string()
    } else {
        cleaned
    }
}
