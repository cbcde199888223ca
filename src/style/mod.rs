//! # Style System
//!
//! A small CSS subset: the box model, block and flex layout, typography,
//! colour, backgrounds, borders and shadows.
//!
//! Declarations are parsed into typed fields as soon as they are read.
//! Unknown properties and values that fail to parse are dropped here, so
//! nothing downstream ever sees raw property strings.

pub mod cascade;
pub mod sheet;
pub mod values;

use log::debug;
use serde::{Deserialize, Serialize};
use values::{
    parse_background, parse_box_shadow, parse_color, parse_edges, parse_length, parse_number,
    split_tokens, split_top_level, Background, BoxShadow, Color, Dimension,
};

/// Declared style of one element. `None` means "not declared here".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    // ── Box Model ──────────────────────────────────────────────
    pub display: Option<Display>,
    pub position: Option<Position>,
    pub left: Option<Dimension>,
    pub top: Option<Dimension>,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub min_width: Option<Dimension>,
    pub max_width: Option<Dimension>,
    pub margin_top: Option<Dimension>,
    pub margin_right: Option<Dimension>,
    pub margin_bottom: Option<Dimension>,
    pub margin_left: Option<Dimension>,
    pub padding_top: Option<Dimension>,
    pub padding_right: Option<Dimension>,
    pub padding_bottom: Option<Dimension>,
    pub padding_left: Option<Dimension>,

    // ── Border, Background, Shadow ─────────────────────────────
    pub border_width: Option<Dimension>,
    pub border_color: Option<Color>,
    pub border_radius: Option<Dimension>,
    pub background: Option<Background>,
    pub box_shadow: Option<BoxShadow>,

    // ── Typography (inherited) ─────────────────────────────────
    pub color: Option<Color>,
    pub font_size: Option<Dimension>,
    pub font_family: Option<String>,
    pub font_weight: Option<u32>,
    pub text_align: Option<TextAlign>,
    pub line_height: Option<LineHeight>,
    pub text_transform: Option<TextTransform>,

    // ── Flexbox ────────────────────────────────────────────────
    pub flex_grow: Option<f64>,
    pub flex_basis: Option<Dimension>,
    pub gap: Option<Dimension>,
    pub justify_content: Option<JustifyContent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Display {
    #[default]
    Block,
    Inline,
    InlineBlock,
    Flex,
    InlineFlex,
    None,
}

impl Display {
    pub fn is_flex(&self) -> bool {
        matches!(self, Display::Flex | Display::InlineFlex)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JustifyContent {
    #[default]
    FlexStart,
    FlexEnd,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

/// Distance between consecutive baselines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LineHeight {
    /// Unitless factor of the font size.
    Multiplier(f64),
    /// A length; percentages and `em` are taken against the font size.
    Length(Dimension),
}

/// Line height used when none is declared anywhere up the tree.
pub const DEFAULT_LINE_HEIGHT: f64 = 1.4;

impl LineHeight {
    pub fn resolve(&self, font_size: f64, ctx: &values::LengthContext) -> f64 {
        let resolved = match self {
            LineHeight::Multiplier(m) => Some(m * font_size),
            LineHeight::Length(d) => d.resolve(font_size, ctx),
        };
        match resolved {
            Some(v) if v > 0.0 => v,
            _ => font_size * DEFAULT_LINE_HEIGHT,
        }
    }
}

impl Style {
    /// Parse a declaration block such as the contents of a `style` attribute.
    pub fn parse_declarations(block: &str) -> Style {
        let mut style = Style::default();
        for decl in split_top_level(block, ';') {
            let Some((key, value)) = decl.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            let value = value
                .strip_suffix("!important")
                .map(str::trim_end)
                .unwrap_or(value);
            if key.is_empty() || value.is_empty() {
                continue;
            }
            if !style.apply_declaration(&key, value) {
                debug!("ignoring declaration {}: {}", key, value);
            }
        }
        style
    }

    /// Apply one `property: value` pair. Returns false when the property is
    /// unknown or the value does not parse; the style is unchanged then.
    pub fn apply_declaration(&mut self, property: &str, value: &str) -> bool {
        let lower = value.to_ascii_lowercase();
        let v = lower.as_str();
        match property {
            "display" => set(&mut self.display, parse_display(v)),
            "position" => set(
                &mut self.position,
                match v {
                    "static" => Some(Position::Static),
                    "relative" => Some(Position::Relative),
                    "absolute" => Some(Position::Absolute),
                    _ => None,
                },
            ),
            "left" => set(&mut self.left, parse_length(v)),
            "top" => set(&mut self.top, parse_length(v)),
            "width" => set(&mut self.width, parse_length(v)),
            "height" => set(&mut self.height, parse_length(v)),
            "min-width" => set(&mut self.min_width, parse_length(v).filter(|d| !d.is_auto())),
            "max-width" => set(
                &mut self.max_width,
                match v {
                    "none" => Some(Dimension::Auto),
                    _ => parse_length(v),
                },
            ),
            "margin" => match parse_edges(v) {
                Some(e) => {
                    self.margin_top = Some(e.top);
                    self.margin_right = Some(e.right);
                    self.margin_bottom = Some(e.bottom);
                    self.margin_left = Some(e.left);
                    true
                }
                None => false,
            },
            "margin-top" => set(&mut self.margin_top, parse_length(v)),
            "margin-right" => set(&mut self.margin_right, parse_length(v)),
            "margin-bottom" => set(&mut self.margin_bottom, parse_length(v)),
            "margin-left" => set(&mut self.margin_left, parse_length(v)),
            "padding" => match parse_edges(v).filter(|e| !has_auto(e)) {
                Some(e) => {
                    self.padding_top = Some(e.top);
                    self.padding_right = Some(e.right);
                    self.padding_bottom = Some(e.bottom);
                    self.padding_left = Some(e.left);
                    true
                }
                None => false,
            },
            "padding-top" => set(&mut self.padding_top, parse_non_auto(v)),
            "padding-right" => set(&mut self.padding_right, parse_non_auto(v)),
            "padding-bottom" => set(&mut self.padding_bottom, parse_non_auto(v)),
            "padding-left" => set(&mut self.padding_left, parse_non_auto(v)),
            "border" => self.apply_border_shorthand(v),
            "border-width" => set(&mut self.border_width, parse_non_auto(v)),
            "border-color" => set(&mut self.border_color, parse_color(v)),
            "border-radius" => set(&mut self.border_radius, parse_non_auto(v)),
            "background" | "background-color" => set(
                &mut self.background,
                match v {
                    "none" | "transparent" => Some(Background::None),
                    _ => parse_background(value),
                },
            ),
            "box-shadow" => set(
                &mut self.box_shadow,
                match v {
                    "none" => Some(BoxShadow::NONE),
                    _ => parse_box_shadow(v),
                },
            ),
            "color" => set(&mut self.color, parse_color(v)),
            "font-size" => set(&mut self.font_size, parse_non_auto(v)),
            "font-family" => set(
                &mut self.font_family,
                Some(value.trim_matches(|c| c == '"' || c == '\'').to_string()),
            ),
            "font-weight" => set(
                &mut self.font_weight,
                match v {
                    "normal" => Some(400),
                    "bold" => Some(700),
                    _ => v.parse::<u32>().ok(),
                },
            ),
            "text-align" => set(
                &mut self.text_align,
                match v {
                    "left" | "start" | "justify" => Some(TextAlign::Left),
                    "right" | "end" => Some(TextAlign::Right),
                    "center" => Some(TextAlign::Center),
                    _ => None,
                },
            ),
            "line-height" => set(
                &mut self.line_height,
                match parse_number(v) {
                    Some(m) => Some(LineHeight::Multiplier(m)),
                    None if v == "normal" => Some(LineHeight::Multiplier(DEFAULT_LINE_HEIGHT)),
                    None => parse_non_auto(v).map(LineHeight::Length),
                },
            ),
            "text-transform" => set(
                &mut self.text_transform,
                match v {
                    "none" => Some(TextTransform::None),
                    "uppercase" => Some(TextTransform::Uppercase),
                    "lowercase" => Some(TextTransform::Lowercase),
                    "capitalize" => Some(TextTransform::Capitalize),
                    _ => None,
                },
            ),
            "flex" => set(
                &mut self.flex_grow,
                match v {
                    "none" => Some(0.0),
                    "auto" => Some(1.0),
                    _ => v.split_whitespace().next().and_then(parse_number),
                },
            ),
            "flex-grow" => set(&mut self.flex_grow, parse_number(v).filter(|g| *g >= 0.0)),
            "flex-basis" => set(&mut self.flex_basis, parse_length(v)),
            "gap" | "column-gap" => set(&mut self.gap, parse_non_auto(v)),
            "justify-content" => set(
                &mut self.justify_content,
                match v {
                    "flex-start" | "start" | "left" => Some(JustifyContent::FlexStart),
                    "flex-end" | "end" | "right" => Some(JustifyContent::FlexEnd),
                    "center" => Some(JustifyContent::Center),
                    "space-between" => Some(JustifyContent::SpaceBetween),
                    "space-around" => Some(JustifyContent::SpaceAround),
                    "space-evenly" => Some(JustifyContent::SpaceEvenly),
                    _ => None,
                },
            ),
            _ => false,
        }
    }

    /// `border: <width> <style> <color>`, parts in any order.
    fn apply_border_shorthand(&mut self, value: &str) -> bool {
        if value == "none" || value == "0" {
            self.border_width = Some(Dimension::Pt(0.0));
            return true;
        }
        let mut width = None;
        let mut color = None;
        for token in split_tokens(value) {
            if let Some(w) = parse_non_auto(token) {
                width = Some(w);
            } else if let Some(c) = parse_color(token) {
                color = Some(c);
            } else if !BORDER_STYLES.contains(&token) {
                return false;
            }
        }
        if width.is_none() && color.is_none() {
            return false;
        }
        // A bare style keyword still draws a border, 1px by default.
        self.border_width = Some(width.unwrap_or(Dimension::Pt(0.75)));
        if color.is_some() {
            self.border_color = color;
        }
        true
    }

    /// Copy every declared field of `other` over `self`.
    pub fn overlay(&mut self, other: &Style) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            display, position, left, top, width, height, min_width, max_width,
            margin_top, margin_right, margin_bottom, margin_left,
            padding_top, padding_right, padding_bottom, padding_left,
            border_width, border_color, border_radius, background, box_shadow,
            color, font_size, font_family, font_weight, text_align, line_height,
            text_transform, flex_grow, flex_basis, gap, justify_content,
        );
    }
}

const BORDER_STYLES: &[&str] = &[
    "solid", "dashed", "dotted", "double", "groove", "ridge", "inset", "outset", "none", "hidden",
];

fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn parse_non_auto(value: &str) -> Option<Dimension> {
    parse_length(value).filter(|d| !d.is_auto())
}

fn has_auto(edges: &values::EdgeValues<Dimension>) -> bool {
    [edges.top, edges.right, edges.bottom, edges.left]
        .iter()
        .any(Dimension::is_auto)
}

fn parse_display(v: &str) -> Option<Display> {
    match v {
        "block" | "list-item" => Some(Display::Block),
        "inline" => Some(Display::Inline),
        "inline-block" => Some(Display::InlineBlock),
        "flex" => Some(Display::Flex),
        "inline-flex" => Some(Display::InlineFlex),
        "none" => Some(Display::None),
        _ => None,
    }
}

/// Built-in style for a tag, applied beneath every stylesheet rule.
pub fn default_style_for_tag(tag: &str) -> Style {
    let display = match tag {
        "img" => Display::InlineBlock,
        "span" | "strong" | "em" | "b" | "i" => Display::Inline,
        "head" | "title" | "meta" | "link" | "script" | "style" => Display::None,
        _ => Display::Block,
    };
    Style {
        display: Some(display),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inline_block() {
        let s = Style::parse_declarations("color: #ff0000; font-size: 20px; width: 50%");
        assert_eq!(s.color, Some(Color::rgba(255, 0, 0, 1.0)));
        assert_eq!(s.font_size, Some(Dimension::Pt(15.0)));
        assert_eq!(s.width, Some(Dimension::Percent(50.0)));
    }

    #[test]
    fn malformed_pairs_are_skipped() {
        let s = Style::parse_declarations("color; : red; width: ; height: 10pt; bogus: 1; margin: x");
        assert_eq!(s.height, Some(Dimension::Pt(10.0)));
        assert_eq!(s.color, None);
        assert_eq!(s.width, None);
        assert_eq!(s.margin_top, None);
    }

    #[test]
    fn later_declaration_wins_across_shorthand() {
        let s = Style::parse_declarations("margin-top: 5pt; margin: 1pt 2pt");
        assert_eq!(s.margin_top, Some(Dimension::Pt(1.0)));
        assert_eq!(s.margin_right, Some(Dimension::Pt(2.0)));
        assert_eq!(s.margin_bottom, Some(Dimension::Pt(1.0)));
        assert_eq!(s.margin_left, Some(Dimension::Pt(2.0)));

        let s = Style::parse_declarations("margin: 1pt; margin-left: auto");
        assert_eq!(s.margin_left, Some(Dimension::Auto));
        assert_eq!(s.margin_right, Some(Dimension::Pt(1.0)));
    }

    #[test]
    fn border_shorthand_any_order() {
        let s = Style::parse_declarations("border: #00f solid 2pt");
        assert_eq!(s.border_width, Some(Dimension::Pt(2.0)));
        assert_eq!(s.border_color, Some(Color::rgba(0, 0, 255, 1.0)));
        let s = Style::parse_declarations("border: none");
        assert_eq!(s.border_width, Some(Dimension::Pt(0.0)));
    }

    #[test]
    fn flex_shorthand_takes_grow() {
        assert_eq!(Style::parse_declarations("flex: 2 1 0").flex_grow, Some(2.0));
        assert_eq!(Style::parse_declarations("flex: none").flex_grow, Some(0.0));
        assert_eq!(Style::parse_declarations("flex-grow: -1").flex_grow, None);
    }

    #[test]
    fn line_height_forms() {
        let ctx = values::LengthContext {
            font_size: 10.0,
            viewport_width: 0.0,
            viewport_height: 0.0,
        };
        let lh = |s: &str| {
            Style::parse_declarations(&format!("line-height: {}", s))
                .line_height
                .unwrap()
                .resolve(10.0, &ctx)
        };
        assert!((lh("2") - 20.0).abs() < 0.01);
        assert!((lh("18pt") - 18.0).abs() < 0.01);
        assert!((lh("150%") - 15.0).abs() < 0.01);
        assert!((lh("normal") - 14.0).abs() < 0.01);
    }

    #[test]
    fn important_is_stripped() {
        let s = Style::parse_declarations("color: #000 !important");
        assert_eq!(s.color, Some(Color::BLACK));
    }

    #[test]
    fn overlay_only_copies_declared_fields() {
        let mut base = Style::parse_declarations("color: #f00; width: 10pt");
        base.overlay(&Style::parse_declarations("width: 20pt"));
        assert_eq!(base.color, Some(Color::rgba(255, 0, 0, 1.0)));
        assert_eq!(base.width, Some(Dimension::Pt(20.0)));
    }

    #[test]
    fn tag_defaults() {
        assert_eq!(default_style_for_tag("div").display, Some(Display::Block));
        assert_eq!(default_style_for_tag("em").display, Some(Display::Inline));
        assert_eq!(default_style_for_tag("img").display, Some(Display::InlineBlock));
        assert_eq!(default_style_for_tag("head").display, Some(Display::None));
        assert_eq!(default_style_for_tag("custom-tag").display, Some(Display::Block));
    }
}
