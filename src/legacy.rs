//! Absolute-position documents.
//!
//! Markup that carries any `data-pdf-` attribute is treated as a list of
//! pre-positioned boxes instead of flowing content. Each start tag's inline
//! `left`/`top`/`width`/`height` place it on the page directly; there is no
//! cascade and no nesting.

use crate::font::FontHandle;
use crate::markup::tokenizer::{collapse_whitespace, tokenize, Attributes, Token};
use crate::model::{Document, Page, Primitive, Rgb, PT_PER_IN, PT_PER_MM, PT_PER_PX};
use crate::resource::ResourceResolver;
use crate::style::values::{parse_color, split_top_level, Color};
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// Attribute prefix that switches a document into this mode.
pub const MARKER: &str = "data-pdf-";

const DEFAULT_TEXT_SIZE: f64 = 12.0;
const DEFAULT_FIT_MIN: f64 = 8.0;
const DEFAULT_FIT_MAX: f64 = 24.0;

/// Whether `html` should be converted in absolute-position mode.
pub fn is_legacy(html: &str) -> bool {
    html.contains(MARKER)
}

/// Convert an absolute-position document into a single page.
pub fn convert(
    html: &str,
    page_size: (f64, f64),
    font: &FontHandle,
    resources: &dyn ResourceResolver,
    base_path: Option<&Path>,
) -> Document {
    let tokens = tokenize(html);
    let (page_width, page_height) = page_size;
    let mut page = Page::new(page_width, page_height);

    for (i, token) in tokens.iter().enumerate() {
        let Token::StartTag { name, attrs, .. } = token else {
            continue;
        };
        let style = inline_declarations(attrs.get("style").map_or("", String::as_str));
        let unit = attrs
            .get("data-unit")
            .map(|u| u.trim().to_ascii_lowercase())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "px".to_string());
        let dim = |key: &str| style.get(key).map_or(0.0, |v| parse_legacy_length(v, &unit));

        let x = dim("left");
        let top = dim("top");
        let w = dim("width");
        let h = dim("height");
        let y = page_height - top - h;

        let color = style.get("color").and_then(|v| parse_color(v));
        let text_color = color.map_or(Rgb::BLACK, |c| c.rgb());
        let font_size = style
            .get("font-size")
            .map(|v| parse_legacy_length(v, &unit))
            .filter(|s| *s > 0.0);

        if attrs.contains_key("data-pdf-textfit") {
            page.items.push(Primitive::TextFit {
                content: box_text(attrs, tokens.get(i + 1)),
                x,
                y,
                w,
                h,
                min_size: number_attr(attrs, "data-min").unwrap_or(DEFAULT_FIT_MIN),
                max_size: number_attr(attrs, "data-max")
                    .or(font_size)
                    .unwrap_or(DEFAULT_FIT_MAX),
                color: text_color,
                font: font.clone(),
            });
            continue;
        }

        if attrs.contains_key("data-pdf-text") {
            let size = font_size.unwrap_or(DEFAULT_TEXT_SIZE);
            let centred = if h > 0.0 { (h - size) / 2.0 } else { 0.0 };
            page.items.push(Primitive::Text {
                content: box_text(attrs, tokens.get(i + 1)),
                x,
                y: y + centred,
                size,
                color: text_color,
                alpha: color.map_or(1.0, |c| c.a),
                font: font.clone(),
            });
            continue;
        }

        if name == "img" && attrs.contains_key("data-pdf-image") {
            match attrs.get("src").map(|s| s.trim()).filter(|s| !s.is_empty()) {
                Some(src) => page.items.push(Primitive::Image {
                    path: resources.resolve(src, base_path),
                    x,
                    y,
                    w,
                    h,
                }),
                None => debug!("data-pdf-image without src skipped"),
            }
            continue;
        }

        let background = style
            .get("background")
            .or_else(|| style.get("background-color"))
            .and_then(|v| parse_color(v));
        let has_border = ["border", "border-color", "border-width"]
            .iter()
            .any(|k| style.contains_key(*k));
        let stroke = has_border.then(|| {
            style
                .get("border-color")
                .and_then(|v| parse_color(v))
                .unwrap_or(Color::BLACK)
        });

        if attrs.contains_key("data-pdf-rect") || background.is_some() || stroke.is_some() {
            let stroke_width = style
                .get("border-width")
                .map_or(PT_PER_PX, |v| parse_legacy_length(v, &unit));
            page.items.push(Primitive::Rect {
                x,
                y,
                w,
                h,
                fill: background.map(|c| c.rgb()),
                stroke: stroke.map(|c| c.rgb()),
                stroke_width,
                alpha: background.map_or(1.0, |c| c.a),
                stroke_alpha: stroke.map_or(1.0, |c| c.a),
                radius: 0.0,
            });
        }
    }

    Document { pages: vec![page] }
}

/// `style` attribute as a property map; later declarations win.
fn inline_declarations(style: &str) -> BTreeMap<String, String> {
    split_top_level(style, ';')
        .into_iter()
        .filter_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            (!key.is_empty() && !value.is_empty()).then(|| (key, value.to_string()))
        })
        .collect()
}

/// Text of a box: `data-text`, else the text run right after the tag.
fn box_text(attrs: &Attributes, next: Option<&Token>) -> String {
    let explicit = attrs.get("data-text").map(|t| t.trim()).unwrap_or("");
    if !explicit.is_empty() {
        return explicit.to_string();
    }
    match next {
        Some(Token::Text(text)) => collapse_whitespace(text),
        _ => String::new(),
    }
}

fn number_attr(attrs: &Attributes, key: &str) -> Option<f64> {
    attrs
        .get(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse `12`, `12px`, `5mm` and friends. A bare number takes `default_unit`.
/// Anything else reads as its leading number, or zero.
pub fn parse_legacy_length(value: &str, default_unit: &str) -> f64 {
    let value = value.trim().to_ascii_lowercase();
    let split = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && c == '-')))
        .map_or(value.len(), |(i, _)| i);
    let Ok(number) = value[..split].parse::<f64>() else {
        return 0.0;
    };
    let unit = match &value[split..] {
        "" => default_unit,
        u @ ("mm" | "px" | "pt" | "cm" | "in") => u,
        _ => default_unit,
    };
    number * unit_factor(unit)
}

fn unit_factor(unit: &str) -> f64 {
    match unit {
        "mm" => PT_PER_MM,
        "cm" => PT_PER_MM * 10.0,
        "px" => PT_PER_PX,
        "in" => PT_PER_IN,
        _ => 1.0,
    }
}
