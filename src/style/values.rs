//! Typed style values and their parsers.
//!
//! Every parser returns `None` for input it does not understand; callers
//! treat that as "declaration absent".

use crate::model::{Rgb, PT_PER_IN, PT_PER_MM, PT_PER_PX};
use serde::{Deserialize, Serialize};

/// Font size `rem` resolves against.
pub const ROOT_FONT_SIZE: f64 = 12.0;

/// A length as written, before it is resolved against a box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    /// Absolute size in points.
    Pt(f64),
    /// Percentage of a base supplied at resolve time.
    Percent(f64),
    /// Multiple of the element's font size.
    Em(f64),
    /// Percentage of the page width.
    Vw(f64),
    /// Percentage of the page height.
    Vh(f64),
    Auto,
}

/// What relative units resolve against.
#[derive(Debug, Clone, Copy)]
pub struct LengthContext {
    pub font_size: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Dimension {
    /// Resolve to points. Percentages use `base`. Returns `None` for `Auto`.
    pub fn resolve(&self, base: f64, ctx: &LengthContext) -> Option<f64> {
        match *self {
            Dimension::Pt(v) => Some(v),
            Dimension::Percent(p) => Some(base * p / 100.0),
            Dimension::Em(v) => Some(v * ctx.font_size),
            Dimension::Vw(v) => Some(ctx.viewport_width * v / 100.0),
            Dimension::Vh(v) => Some(ctx.viewport_height * v / 100.0),
            Dimension::Auto => None,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Dimension::Auto)
    }
}

/// Split a leading number off `s`, returning it and the remaining suffix.
fn split_number(s: &str) -> Option<(f64, &str)> {
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);
    let num = s[..end].parse::<f64>().ok()?;
    num.is_finite().then_some((num, &s[end..]))
}

/// Parse `12pt`, `16px`, `5mm`, `1.5em`, `50%`, `10vw`, `auto`, or a bare number (points).
pub fn parse_length(value: &str) -> Option<Dimension> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("auto") {
        return Some(Dimension::Auto);
    }
    let (num, unit) = split_number(value)?;
    let dim = match unit.to_ascii_lowercase().as_str() {
        "" | "pt" => Dimension::Pt(num),
        "px" => Dimension::Pt(num * PT_PER_PX),
        "mm" => Dimension::Pt(num * PT_PER_MM),
        "cm" => Dimension::Pt(num * PT_PER_MM * 10.0),
        "in" => Dimension::Pt(num * PT_PER_IN),
        "em" => Dimension::Em(num),
        "rem" => Dimension::Pt(num * ROOT_FONT_SIZE),
        "%" => Dimension::Percent(num),
        "vw" => Dimension::Vw(num),
        "vh" => Dimension::Vh(num),
        _ => return None,
    };
    Some(dim)
}

/// Parse a plain number such as a flex factor or a unitless line height.
pub fn parse_number(value: &str) -> Option<f64> {
    let (num, rest) = split_number(value.trim())?;
    rest.is_empty().then_some(num)
}

/// An 8-bit RGB colour with alpha in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 1.0,
    };

    pub fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }

    /// Linear mix: `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(…)`, `rgba(…)` and a
/// few keywords.
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = value.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let channel = |s: &str| parse_number(s).map(|v| v.clamp(0.0, 255.0).round() as u8);
        let alpha = match parts.get(3) {
            Some(a) => parse_number(a)?.clamp(0.0, 1.0),
            None => 1.0,
        };
        return Some(Color::rgba(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        ));
    }
    let named = match lower.as_str() {
        "black" => Color::rgba(0, 0, 0, 1.0),
        "white" => Color::rgba(255, 255, 255, 1.0),
        "red" => Color::rgba(255, 0, 0, 1.0),
        "green" => Color::rgba(0, 128, 0, 1.0),
        "blue" => Color::rgba(0, 0, 255, 1.0),
        "gray" | "grey" => Color::rgba(128, 128, 128, 1.0),
        "transparent" => Color::rgba(0, 0, 0, 0.0),
        _ => return None,
    };
    Some(named)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return None,
    };
    let byte = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    let a = if expanded.len() == 8 {
        byte(6)? as f64 / 255.0
    } else {
        1.0
    };
    Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, a))
}

/// Split on `sep` outside parentheses.
pub fn split_top_level(value: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if c == sep && depth <= 0 => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Whitespace-separated tokens, keeping `rgb( 1, 2, 3 )` together.
pub fn split_tokens(value: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0i32;
    let mut start: Option<usize> = None;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if c.is_whitespace() && depth <= 0 {
            if let Some(s) = start.take() {
                tokens.push(&value[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&value[s..]);
    }
    tokens
}

/// Expand 1-4 values into top, right, bottom, left.
pub fn expand_shorthand<T: Copy>(values: &[T]) -> Option<[T; 4]> {
    match *values {
        [all] => Some([all, all, all, all]),
        [v, h] => Some([v, h, v, h]),
        [t, h, b] => Some([t, h, b, h]),
        [t, r, b, l] => Some([t, r, b, l]),
        _ => None,
    }
}

/// Four independent edge values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeValues<T: Copy> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

impl<T: Copy> EdgeValues<T> {
    pub fn from_array([top, right, bottom, left]: [T; 4]) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// Parse a margin/padding shorthand into four dimensions.
pub fn parse_edges(value: &str) -> Option<EdgeValues<Dimension>> {
    let dims = value
        .split_whitespace()
        .map(parse_length)
        .collect::<Option<Vec<_>>>()?;
    expand_shorthand(&dims).map(EdgeValues::from_array)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub color: Color,
    /// Position along the gradient line, 0.0 to 1.0.
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Background {
    None,
    Solid(Color),
    /// Angle in degrees, CSS convention (0 = towards the top, 180 = towards the bottom).
    LinearGradient { angle: f64, stops: Vec<ColorStop> },
}

pub fn parse_background(value: &str) -> Option<Background> {
    let value = value.trim();
    let lower = value.to_ascii_lowercase();
    match lower.find("linear-gradient(") {
        Some(at) => {
            let open = at + "linear-gradient(".len();
            let close = value.rfind(')')?;
            (close > open)
                .then(|| parse_gradient(&value[open..close]))
                .flatten()
        }
        None => parse_color(value).map(Background::Solid),
    }
}

fn parse_gradient(args: &str) -> Option<Background> {
    let mut parts = split_top_level(args, ',')
        .into_iter()
        .map(str::trim)
        .peekable();

    let mut angle = 180.0;
    if let Some(first) = parts.peek() {
        let lower = first.to_ascii_lowercase();
        if let Some(deg) = lower.strip_suffix("deg") {
            angle = parse_number(deg)?;
            parts.next();
        } else if let Some(side) = lower.strip_prefix("to ") {
            angle = side_angle(side)?;
            parts.next();
        }
    }

    let raw: Vec<(Color, Option<f64>)> = parts
        .filter_map(|part| {
            let (color_text, pos) = match part.rsplit_once(char::is_whitespace) {
                Some((c, p)) if p.ends_with('%') => {
                    (c.trim(), parse_number(p.trim_end_matches('%')).map(|v| v / 100.0))
                }
                _ => (part, None),
            };
            parse_color(color_text).map(|c| (c, pos))
        })
        .collect();
    if raw.len() < 2 {
        return None;
    }

    let last = (raw.len() - 1) as f64;
    let mut stops: Vec<ColorStop> = raw
        .iter()
        .enumerate()
        .map(|(i, (color, pos))| ColorStop {
            color: *color,
            position: pos.unwrap_or(i as f64 / last),
        })
        .collect();
    stops.sort_by(|a, b| a.position.total_cmp(&b.position));

    Some(Background::LinearGradient { angle, stops })
}

fn side_angle(side: &str) -> Option<f64> {
    let mut words: Vec<&str> = side.split_whitespace().collect();
    words.sort_unstable();
    let angle = match words.as_slice() {
        ["top"] => 0.0,
        ["right"] => 90.0,
        ["bottom"] => 180.0,
        ["left"] => 270.0,
        ["right", "top"] => 45.0,
        ["bottom", "right"] => 135.0,
        ["bottom", "left"] => 225.0,
        ["left", "top"] => 315.0,
        _ => return None,
    };
    Some(angle)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxShadow {
    pub offset_x: Dimension,
    pub offset_y: Dimension,
    /// Parsed but not rendered.
    pub blur: Dimension,
    pub spread: Dimension,
    pub color: Color,
}

impl BoxShadow {
    /// `box-shadow: none`. Fully transparent, so it never paints.
    pub const NONE: BoxShadow = BoxShadow {
        offset_x: Dimension::Pt(0.0),
        offset_y: Dimension::Pt(0.0),
        blur: Dimension::Pt(0.0),
        spread: Dimension::Pt(0.0),
        color: Color {
            r: 0,
            g: 0,
            b: 0,
            a: 0.0,
        },
    };
}

/// Parse `ox oy [blur [spread]] color` (colour may also come first).
pub fn parse_box_shadow(value: &str) -> Option<BoxShadow> {
    let mut color = None;
    let mut lengths = Vec::new();
    for token in split_tokens(value) {
        if let Some(len) = parse_length(token).filter(|d| !d.is_auto()) {
            lengths.push(len);
        } else if let Some(c) = parse_color(token) {
            color = Some(c);
        } else {
            return None;
        }
    }
    let zero = Dimension::Pt(0.0);
    match lengths.as_slice() {
        [x, y, rest @ ..] if rest.len() <= 2 => Some(BoxShadow {
            offset_x: *x,
            offset_y: *y,
            blur: rest.first().copied().unwrap_or(zero),
            spread: rest.get(1).copied().unwrap_or(zero),
            color: color?,
        }),
        _ => None,
    }
}
