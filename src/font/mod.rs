//! # Font Metrics
//!
//! Layout only needs three numbers from a font: how wide a string is, and
//! how far the glyphs reach above and below the baseline. [`TextMeasure`]
//! is that seam.
//!
//! Two implementations ship with the crate. [`FallbackMetrics`] assumes every
//! character is half an em wide, which is what the built-in Helvetica path
//! of the PDF sink uses too. [`TrueTypeFont`] reads real advances from a
//! TrueType/OpenType file with ttf-parser, and the PDF sink can embed it.

use crate::error::FolioError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resource name attached to text primitives, e.g. `F1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontHandle(pub String);

impl FontHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FontHandle {
    fn default() -> Self {
        Self("F1".to_string())
    }
}

/// Text measurement used by layout and by the PDF sink's shrink-to-fit.
pub trait TextMeasure {
    /// Advance width of `text` at `size` points. Works on code points, not bytes.
    fn text_width(&self, text: &str, size: f64) -> f64;

    /// Distance from the top of a line box to the baseline.
    fn ascent(&self, size: f64) -> f64;

    /// Distance below the baseline, as a positive number.
    fn descent(&self, size: f64) -> f64;
}

/// Half an em per character. The ascent is a full em, so a line's baseline
/// sits one font size below its top.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackMetrics;

impl TextMeasure for FallbackMetrics {
    fn text_width(&self, text: &str, size: f64) -> f64 {
        text.chars().count() as f64 * size * 0.5
    }

    fn ascent(&self, size: f64) -> f64 {
        size
    }

    fn descent(&self, size: f64) -> f64 {
        size * 0.2
    }
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub advance_widths: HashMap<char, u16>,
    pub glyph_ids: HashMap<char, u16>,
    /// Used for characters the font has no glyph for.
    pub default_advance: u16,
}

impl FontMetrics {
    pub fn from_font_data(data: &[u8]) -> Result<Self, FolioError> {
        let face = ttf_parser::Face::parse(data, 0)
            .map_err(|e| FolioError::Font(format!("cannot parse font: {}", e)))?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables.into_iter().filter(|s| s.is_unicode()) {
                subtable.codepoints(|code| {
                    let Some(ch) = char::from_u32(code) else {
                        return;
                    };
                    if glyph_ids.contains_key(&ch) {
                        return;
                    }
                    if let Some(glyph) = subtable.glyph_index(code) {
                        let advance = face.glyph_hor_advance(glyph).unwrap_or(0);
                        advance_widths.insert(ch, advance);
                        glyph_ids.insert(ch, glyph.0);
                    }
                });
            }
        }
        if glyph_ids.is_empty() {
            return Err(FolioError::Font("font has no unicode cmap".to_string()));
        }

        let default_advance = match advance_widths.get(&' ') {
            Some(&w) if w > 0 => w,
            _ => units_per_em / 2,
        };

        Ok(FontMetrics {
            units_per_em,
            ascender: face.ascender(),
            descender: face.descender(),
            advance_widths,
            glyph_ids,
            default_advance,
        })
    }

    /// Advance of `ch` in font units.
    pub fn advance(&self, ch: char) -> u16 {
        self.advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance)
    }

    /// Glyph id of `ch`, 0 (`.notdef`) when missing.
    pub fn glyph_id(&self, ch: char) -> u16 {
        self.glyph_ids.get(&ch).copied().unwrap_or(0)
    }

    fn scale(&self, units: f64, size: f64) -> f64 {
        units / self.units_per_em as f64 * size
    }
}

/// A font file kept in memory for measurement and embedding.
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    data: Vec<u8>,
    metrics: FontMetrics,
    postscript_name: String,
}

impl TrueTypeFont {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FolioError> {
        let metrics = FontMetrics::from_font_data(&data)?;
        let postscript_name = ttf_parser::Face::parse(&data, 0)
            .ok()
            .and_then(|face| {
                face.names()
                    .into_iter()
                    .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
                    .find_map(|n| n.to_string())
            })
            .map(|name| name.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').collect::<String>())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "FolioEmbedded".to_string());
        Ok(Self {
            data,
            metrics,
            postscript_name,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn postscript_name(&self) -> &str {
        &self.postscript_name
    }
}

impl TextMeasure for TrueTypeFont {
    fn text_width(&self, text: &str, size: f64) -> f64 {
        let units: f64 = text.chars().map(|c| self.metrics.advance(c) as f64).sum();
        self.metrics.scale(units, size)
    }

    fn ascent(&self, size: f64) -> f64 {
        self.metrics.scale(self.metrics.ascender as f64, size)
    }

    fn descent(&self, size: f64) -> f64 {
        self.metrics.scale(-(self.metrics.descender as f64), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_counts_code_points() {
        let m = FallbackMetrics;
        assert!((m.text_width("abcd", 10.0) - 20.0).abs() < 0.001);
        // Two code points, six bytes.
        assert!((m.text_width("日本", 10.0) - 10.0).abs() < 0.001);
        assert!((m.text_width("", 10.0)).abs() < 0.001);
        assert!((m.ascent(12.0) - 12.0).abs() < 0.001);
    }

    #[test]
    fn garbage_font_is_an_error() {
        let err = TrueTypeFont::from_bytes(vec![0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, FolioError::Font(_)));
    }

    #[test]
    fn metrics_scale_by_units_per_em() {
        let mut advance_widths = HashMap::new();
        advance_widths.insert('A', 600);
        let metrics = FontMetrics {
            units_per_em: 1000,
            ascender: 800,
            descender: -200,
            advance_widths,
            glyph_ids: HashMap::new(),
            default_advance: 250,
        };
        assert_eq!(metrics.advance('A'), 600);
        assert_eq!(metrics.advance('Z'), 250);
        assert_eq!(metrics.glyph_id('A'), 0);
        assert!((metrics.scale(600.0, 10.0) - 6.0).abs() < 0.001);
    }

    #[test]
    fn handle_defaults_to_f1() {
        assert_eq!(FontHandle::default().as_str(), "F1");
        let json = serde_json::to_string(&FontHandle::new("F2")).unwrap();
        assert_eq!(json, "\"F2\"");
    }
}
