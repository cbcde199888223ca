//! Style resolution: inheritance, tag defaults, matched rules, inline style.
//!
//! Elements are visited breadth-first so a parent's computed style always
//! exists before its children read it. The result is an immutable
//! [`StyleMap`] keyed by [`NodeId`].

use super::sheet::Stylesheet;
use super::values::{Background, BoxShadow, Color, Dimension, EdgeValues, LengthContext};
use super::{
    default_style_for_tag, Display, JustifyContent, LineHeight, Position, Style, TextAlign,
    TextTransform,
};
use crate::markup::{NodeId, Tree};
use std::collections::VecDeque;

/// Font size of the root element when nothing is declared.
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Fully cascaded style of one element.
///
/// Inherited properties are concrete. Box properties stay as [`Dimension`]
/// because percentages depend on the containing box, known only at layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub position: Position,
    pub left: Option<Dimension>,
    pub top: Option<Dimension>,
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Option<Dimension>,
    pub max_width: Option<Dimension>,
    pub margin: EdgeValues<Dimension>,
    pub padding: EdgeValues<Dimension>,
    pub border_width: Dimension,
    pub border_color: Option<Color>,
    pub border_radius: Dimension,
    pub background: Background,
    pub box_shadow: Option<BoxShadow>,

    // Inherited
    pub color: Color,
    /// Resolved, in points.
    pub font_size: f64,
    pub font_family: Option<String>,
    pub font_weight: u32,
    pub text_align: TextAlign,
    pub line_height: Option<LineHeight>,
    pub text_transform: TextTransform,

    pub flex_grow: f64,
    pub flex_basis: Option<Dimension>,
    pub gap: Dimension,
    pub justify_content: JustifyContent,
}

impl ComputedStyle {
    /// Compute from declared values and the parent's computed style.
    pub fn compute(declared: &Style, parent: Option<&ComputedStyle>, viewport: (f64, f64)) -> Self {
        let parent_font_size = parent.map_or(DEFAULT_FONT_SIZE, |p| p.font_size);
        let ctx = LengthContext {
            font_size: parent_font_size,
            viewport_width: viewport.0,
            viewport_height: viewport.1,
        };
        let font_size = declared
            .font_size
            .and_then(|d| d.resolve(parent_font_size, &ctx))
            .filter(|s| *s > 0.0)
            .unwrap_or(parent_font_size);

        let zero = Dimension::Pt(0.0);
        ComputedStyle {
            display: declared.display.unwrap_or_default(),
            position: declared.position.unwrap_or_default(),
            left: declared.left,
            top: declared.top,
            width: declared.width.unwrap_or(Dimension::Auto),
            height: declared.height.unwrap_or(Dimension::Auto),
            min_width: declared.min_width,
            max_width: declared.max_width,
            margin: EdgeValues {
                top: declared.margin_top.unwrap_or(zero),
                right: declared.margin_right.unwrap_or(zero),
                bottom: declared.margin_bottom.unwrap_or(zero),
                left: declared.margin_left.unwrap_or(zero),
            },
            padding: EdgeValues {
                top: declared.padding_top.unwrap_or(zero),
                right: declared.padding_right.unwrap_or(zero),
                bottom: declared.padding_bottom.unwrap_or(zero),
                left: declared.padding_left.unwrap_or(zero),
            },
            border_width: declared.border_width.unwrap_or(zero),
            border_color: declared.border_color,
            border_radius: declared.border_radius.unwrap_or(zero),
            background: declared.background.clone().unwrap_or(Background::None),
            box_shadow: declared.box_shadow,

            color: declared
                .color
                .or(parent.map(|p| p.color))
                .unwrap_or(Color::BLACK),
            font_size,
            font_family: declared
                .font_family
                .clone()
                .or_else(|| parent.and_then(|p| p.font_family.clone())),
            font_weight: declared
                .font_weight
                .or(parent.map(|p| p.font_weight))
                .unwrap_or(400),
            text_align: declared
                .text_align
                .or(parent.map(|p| p.text_align))
                .unwrap_or_default(),
            line_height: declared.line_height.or(parent.and_then(|p| p.line_height)),
            text_transform: declared
                .text_transform
                .or(parent.map(|p| p.text_transform))
                .unwrap_or_default(),

            flex_grow: declared.flex_grow.unwrap_or(0.0),
            flex_basis: declared.flex_basis,
            gap: declared.gap.unwrap_or(zero),
            justify_content: declared.justify_content.unwrap_or_default(),
        }
    }

    /// Context for resolving this element's own lengths.
    pub fn length_context(&self, viewport: (f64, f64)) -> LengthContext {
        LengthContext {
            font_size: self.font_size,
            viewport_width: viewport.0,
            viewport_height: viewport.1,
        }
    }

    /// Baseline-to-baseline distance for this element's text.
    pub fn line_height_pt(&self, viewport: (f64, f64)) -> f64 {
        let ctx = self.length_context(viewport);
        match self.line_height {
            Some(lh) => lh.resolve(self.font_size, &ctx),
            None => self.font_size * super::DEFAULT_LINE_HEIGHT,
        }
    }
}

/// Computed styles for every element reachable from the root.
#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    styles: Vec<Option<ComputedStyle>>,
}

impl StyleMap {
    pub fn get(&self, id: NodeId) -> Option<&ComputedStyle> {
        self.styles.get(id.0).and_then(Option::as_ref)
    }
}

/// Resolve styles for the whole tree.
pub fn resolve_styles(tree: &Tree, sheet: &Stylesheet, viewport: (f64, f64)) -> StyleMap {
    let mut styles: Vec<Option<ComputedStyle>> = vec![None; tree.len()];
    let mut queue = VecDeque::from([tree.root()]);

    while let Some(id) = queue.pop_front() {
        queue.extend(
            tree.children(id)
                .iter()
                .copied()
                .filter(|&c| tree.element(c).is_some()),
        );
        let Some(element) = tree.element(id) else {
            continue;
        };

        let mut declared = default_style_for_tag(&element.tag);
        for rule in sheet.matching(element) {
            declared.overlay(&rule.style);
        }
        if let Some(inline) = element.attr("style") {
            declared.overlay(&Style::parse_declarations(inline));
        }

        let parent = tree.parent(id).and_then(|p| styles[p.0].as_ref());
        let computed = ComputedStyle::compute(&declared, parent, viewport);
        styles[id.0] = Some(computed);
    }

    StyleMap { styles }
}
