//! # Output Model
//!
//! What the pipeline hands to a drawing sink: pages of fixed size, each with
//! an ordered list of primitives. Order is paint order, so the first item is
//! the furthest back.
//!
//! All coordinates here are points with a **bottom-left** origin. Layout works
//! top-down internally and converts exactly once, when a primitive is built.

use crate::error::FolioError;
use crate::font::FontHandle;
use serde::{Deserialize, Serialize};

/// Points per millimetre.
pub const PT_PER_MM: f64 = 72.0 / 25.4;
/// Points per CSS pixel (96 px per inch).
pub const PT_PER_PX: f64 = 72.0 / 96.0;
/// Points per inch.
pub const PT_PER_IN: f64 = 72.0;

/// An opaque 8-bit RGB triple. Alpha travels separately on each primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A single drawing instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Primitive {
    /// A filled and/or stroked rectangle, optionally rounded.
    #[serde(rename_all = "camelCase")]
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
        stroke_width: f64,
        alpha: f64,
        stroke_alpha: f64,
        radius: f64,
    },
    /// Stroke-only rectangle (borders).
    #[serde(rename_all = "camelCase")]
    StrokeRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        stroke: Rgb,
        stroke_width: f64,
        alpha: f64,
        radius: f64,
    },
    /// A single line of text. `y` is the baseline.
    Text {
        content: String,
        x: f64,
        y: f64,
        size: f64,
        color: Rgb,
        alpha: f64,
        font: FontHandle,
    },
    /// Text the sink shrinks until it fits the box.
    #[serde(rename_all = "camelCase")]
    TextFit {
        content: String,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        min_size: f64,
        max_size: f64,
        color: Rgb,
        font: FontHandle,
    },
    /// A raster image stretched into the box.
    Image {
        path: String,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
}

impl Primitive {
    /// Plain filled rectangle.
    pub fn fill(x: f64, y: f64, w: f64, h: f64, color: Rgb, alpha: f64, radius: f64) -> Self {
        Primitive::Rect {
            x,
            y,
            w,
            h,
            fill: Some(color),
            stroke: None,
            stroke_width: 0.0,
            alpha,
            stroke_alpha: 1.0,
            radius,
        }
    }
}

/// One fixed-size output page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub width: f64,
    pub height: f64,
    pub items: Vec<Primitive>,
}

impl Page {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            items: Vec::new(),
        }
    }

    /// Convert a top-down box position into the bottom-left convention.
    pub fn flip_y(&self, y_top: f64, box_height: f64) -> f64 {
        self.height - y_top - box_height
    }

    /// Insert `items` so the first of them lands at `index`, keeping their order.
    pub fn insert_at(&mut self, index: usize, items: Vec<Primitive>) {
        let index = index.min(self.items.len());
        self.items.splice(index..index, items);
    }
}

/// The full result of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_mut(&mut self, index: usize) -> Result<&mut Page, FolioError> {
        let count = self.pages.len();
        self.pages
            .get_mut(index)
            .ok_or(FolioError::InvalidPage { index, count })
    }

    /// Pretty-printed JSON of every page and primitive. Field order is fixed,
    /// so identical documents give identical text.
    pub fn to_json(&self) -> Result<String, FolioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Named page sizes accepted by `<meta name="pdf:page">`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    A3,
    A4,
    A4Landscape,
    A5Landscape,
    Letter,
    LetterLandscape,
}

impl PageSize {
    /// Parse a keyword such as `"A4 Landscape"` or `"letter"`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let normalized = keyword
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .to_ascii_lowercase();
        match normalized.as_str() {
            "a3" => Some(PageSize::A3),
            "a4" => Some(PageSize::A4),
            "a4-landscape" => Some(PageSize::A4Landscape),
            "a5-landscape" => Some(PageSize::A5Landscape),
            "letter" => Some(PageSize::Letter),
            "letter-landscape" => Some(PageSize::LetterLandscape),
            _ => None,
        }
    }

    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A3 => (297.0 * PT_PER_MM, 420.0 * PT_PER_MM),
            PageSize::A4 => (210.0 * PT_PER_MM, 297.0 * PT_PER_MM),
            PageSize::A4Landscape => (297.0 * PT_PER_MM, 210.0 * PT_PER_MM),
            PageSize::A5Landscape => (210.0 * PT_PER_MM, 148.0 * PT_PER_MM),
            PageSize::Letter => (8.5 * PT_PER_IN, 11.0 * PT_PER_IN),
            PageSize::LetterLandscape => (11.0 * PT_PER_IN, 8.5 * PT_PER_IN),
        }
    }
}
