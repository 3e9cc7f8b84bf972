//! Standard-14 font selection for stamped and annotated text

use serde::{Deserialize, Serialize};

/// Font family groups backed by the PDF standard 14 fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    Serif,
    #[default]
    SansSerif,
    Mono,
}

impl FontFamily {
    /// Map a family keyword or a concrete font name to a group.
    /// Unknown names fall back to sans-serif.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("times") || lower.contains("georgia") || lower == "serif" {
            Self::Serif
        } else if lower.contains("courier") || lower.contains("mono") {
            Self::Mono
        } else {
            Self::SansSerif
        }
    }

    /// The standard-14 BaseFont name for this family and style.
    pub fn base_font(self, bold: bool, italic: bool) -> &'static str {
        match self {
            Self::Serif => match (bold, italic) {
                (true, true) => "Times-BoldItalic",
                (true, false) => "Times-Bold",
                (false, true) => "Times-Italic",
                (false, false) => "Times-Roman",
            },
            Self::SansSerif => match (bold, italic) {
                (true, true) => "Helvetica-BoldOblique",
                (true, false) => "Helvetica-Bold",
                (false, true) => "Helvetica-Oblique",
                (false, false) => "Helvetica",
            },
            Self::Mono => match (bold, italic) {
                (true, true) => "Courier-BoldOblique",
                (true, false) => "Courier-Bold",
                (false, true) => "Courier-Oblique",
                (false, false) => "Courier",
            },
        }
    }
}

/// Rough text width in points for the standard fonts. Good enough for
/// centering a stamp; exact metrics would need embedded font data.
pub fn approximate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_name() {
        assert_eq!(FontFamily::from_name("serif"), FontFamily::Serif);
        assert_eq!(FontFamily::from_name("Times New Roman"), FontFamily::Serif);
        assert_eq!(FontFamily::from_name("Courier New"), FontFamily::Mono);
        assert_eq!(FontFamily::from_name("monospace"), FontFamily::Mono);
        assert_eq!(FontFamily::from_name("Arial"), FontFamily::SansSerif);
        assert_eq!(FontFamily::from_name("g_d0_f1"), FontFamily::SansSerif);
    }

    #[test]
    fn test_base_font_variants() {
        assert_eq!(FontFamily::Serif.base_font(false, false), "Times-Roman");
        assert_eq!(FontFamily::Serif.base_font(true, true), "Times-BoldItalic");
        assert_eq!(
            FontFamily::SansSerif.base_font(false, true),
            "Helvetica-Oblique"
        );
        assert_eq!(FontFamily::Mono.base_font(true, false), "Courier-Bold");
    }

    #[test]
    fn test_width_scales_with_text() {
        let short = approximate_text_width("ab", 12.0);
        let long = approximate_text_width("abcd", 12.0);
        assert!(long > short);
    }
}
