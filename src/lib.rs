//! # Folio
//!
//! Turns a markup document with embedded stylesheets into fixed-size pages
//! of drawing primitives: rectangles, stroked rectangles, text runs,
//! shrink-to-fit text boxes and images, all in points with a bottom-left
//! origin. A small PDF writer is included as one possible sink.
//!
//! ## Architecture
//!
//! ```text
//! Markup text
//!       ↓
//!   [markup]   Tokenize, build the node arena
//!       ↓
//!   [style]    Parse <style> blocks, cascade, inherit
//!       ↓
//!   [layout]   Block flow, flex rows, absolute boxes, images, text
//!       ↓
//!   [paint]    Shadows, backgrounds, gradients, borders → primitives
//!       ↓
//!   [model]    Pages of primitives
//!       ↓
//!   [pdf]      Optional: serialize to PDF bytes
//! ```
//!
//! Documents that carry `data-pdf-*` attributes skip the flow pipeline and
//! are read as pre-positioned boxes by [`legacy`].
//!
//! Conversion is synchronous and deterministic: the same input always
//! produces the same primitive list.

pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod legacy;
pub mod markup;
pub mod model;
pub mod paint;
pub mod pdf;
pub mod resource;
pub mod style;
pub mod text;

use std::path::PathBuf;

use error::FolioError;
use font::{FontHandle, TrueTypeFont};
use layout::LayoutEngine;
use markup::Tree;
use model::{Document, PageSize};
use pdf::{Metadata, PdfWriter};
use serde::{Deserialize, Serialize};
use style::cascade::resolve_styles;
use style::sheet::Stylesheet;
use style::values::{parse_length, LengthContext, ROOT_FONT_SIZE};

pub use layout::Services;

/// Settings for one conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvertOptions {
    /// Page width in points when the document does not name one.
    pub page_width: f64,
    /// Page height in points when the document does not name one.
    pub page_height: f64,
    /// Directory relative image references are resolved against.
    pub base_path: Option<PathBuf>,
    /// Font handle written on every text primitive.
    pub font: FontHandle,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        let (page_width, page_height) = PageSize::A5Landscape.dimensions();
        Self {
            page_width,
            page_height,
            base_path: None,
            font: FontHandle::default(),
        }
    }
}

/// Convert markup into pages of primitives.
///
/// Malformed markup, unknown CSS and unreadable images never fail the
/// conversion. The only error is a layout/sink contract violation.
pub fn convert(html: &str, options: &ConvertOptions, services: Services<'_>) -> Result<Document, FolioError> {
    let defaults = (options.page_width, options.page_height);
    let base_path = options.base_path.as_deref();

    if legacy::is_legacy(html) {
        return Ok(legacy::convert(
            html,
            defaults,
            &options.font,
            services.resources,
            base_path,
        ));
    }

    let mut tree = Tree::parse(html);
    let sheet = Stylesheet::parse(&tree.take_stylesheets());
    let page_size = resolve_page_size(&tree, defaults);
    let styles = resolve_styles(&tree, &sheet, page_size);

    let engine = LayoutEngine::new(
        &tree,
        &styles,
        services,
        base_path,
        options.font.clone(),
        page_size,
    );
    Ok(engine.layout(tree.layout_root())?.document)
}

/// Convert markup and write the result as PDF bytes. Text is measured and
/// drawn with `font` when given, Helvetica otherwise.
pub fn render_pdf(
    html: &str,
    options: &ConvertOptions,
    font: Option<&TrueTypeFont>,
    metadata: &Metadata,
) -> Result<Vec<u8>, FolioError> {
    let mut services = Services::default();
    if let Some(font) = font {
        services.measure = font;
    }
    let document = convert(html, options, services)?;
    let writer = match font {
        Some(font) => PdfWriter::with_font(font),
        None => PdfWriter::new(),
    };
    writer.write(&document, metadata)
}

/// Page size from `<meta name="pdf:page">` (a named size), else from
/// `pdf:width`/`pdf:height` lengths, else `defaults`.
pub fn resolve_page_size(tree: &Tree, defaults: (f64, f64)) -> (f64, f64) {
    if let Some(size) = tree.pdf_meta("page").and_then(PageSize::from_keyword) {
        return size.dimensions();
    }
    let ctx = LengthContext {
        font_size: ROOT_FONT_SIZE,
        viewport_width: defaults.0,
        viewport_height: defaults.1,
    };
    let length = |key: &str, base: f64| {
        tree.pdf_meta(key)
            .and_then(parse_length)
            .and_then(|d| d.resolve(base, &ctx))
            .filter(|v| *v > 0.0)
    };
    (
        length("width", defaults.0).unwrap_or(defaults.0),
        length("height", defaults.1).unwrap_or(defaults.1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PT_PER_MM;

    #[test]
    fn default_page_is_a5_landscape() {
        let options = ConvertOptions::default();
        assert!((options.page_width - 210.0 * PT_PER_MM).abs() < 0.01);
        assert!((options.page_height - 148.0 * PT_PER_MM).abs() < 0.01);
    }

    #[test]
    fn named_page_size_wins() {
        let tree = Tree::parse(r#"<head><meta name="pdf:page" content="A4"></head><body></body>"#);
        let (w, h) = resolve_page_size(&tree, (100.0, 100.0));
        assert!((w - 210.0 * PT_PER_MM).abs() < 0.01);
        assert!((h - 297.0 * PT_PER_MM).abs() < 0.01);
    }

    #[test]
    fn explicit_lengths_and_bad_values() {
        let tree = Tree::parse(
            r#"<meta name="pdf:width" content="100mm"><meta name="pdf:height" content="wide"><body></body>"#,
        );
        let (w, h) = resolve_page_size(&tree, (300.0, 200.0));
        assert!((w - 100.0 * PT_PER_MM).abs() < 0.01);
        assert_eq!(h, 200.0);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ConvertOptions = serde_json::from_str(r#"{"pageWidth": 500}"#).unwrap();
        assert_eq!(options.page_width, 500.0);
        assert_eq!(options.page_height, ConvertOptions::default().page_height);
        assert_eq!(options.font, FontHandle::default());
    }
}
