//! # Layout Engine
//!
//! One recursive, depth-first pass over the styled tree. Each element gets a
//! border box in top-down page coordinates, and its decorations are painted
//! as soon as the box is final, before control returns to the parent.
//!
//! Block flow stacks children with a vertical cursor. Runs of text and
//! inline elements are gathered into a paragraph, wrapped greedily, and
//! emitted line by line. `display: flex` containers hand their children to
//! [`flex`]. Absolutely positioned children are set aside and laid out
//! against the element that found them once that element is painted.
//!
//! The whole document is one fixed-size page. Content that runs past the
//! bottom edge is neither clipped nor moved to a new page.

pub mod flex;

use crate::error::FolioError;
use crate::font::{FallbackMetrics, FontHandle, TextMeasure};
use crate::image_loader::{FileImageResolver, ImageResolver};
use crate::markup::{NodeId, Tree};
use crate::model::{Document, Page};
use crate::paint;
use crate::resource::{FsResourceResolver, ResourceResolver};
use crate::style::cascade::{ComputedStyle, StyleMap};
use crate::style::values::{Background, Color, Dimension, LengthContext};
use crate::style::{Display, Position, TextAlign};
use crate::text::{apply_text_transform, wrap_lines};
use log::trace;
use std::path::Path;

/// The external collaborators layout calls out to.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub measure: &'a dyn TextMeasure,
    pub images: &'a dyn ImageResolver,
    pub resources: &'a dyn ResourceResolver,
}

impl Default for Services<'_> {
    /// Half-em metrics, file/data-URI images, filesystem paths.
    fn default() -> Self {
        Self {
            measure: &FallbackMetrics,
            images: &FileImageResolver,
            resources: &FsResourceResolver,
        }
    }
}

/// Resolved edge sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub width: f64,
    pub color: Color,
    pub radius: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub offset_x: f64,
    pub offset_y: f64,
    pub blur: f64,
    pub spread: f64,
    pub color: Color,
}

/// Final geometry and decoration of one element.
///
/// `x`/`y` are the top-left corner of the border box, measured from the
/// page's top-left corner. They are only flipped when primitives are built.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub margin: Edges,
    pub padding: Edges,
    pub border: Border,
    pub background: Background,
    pub shadow: Option<Shadow>,
    pub font_size: f64,
    /// First y below this box's bottom margin: where the next sibling starts.
    pub after: f64,
    pub page_index: usize,
}

impl LayoutBox {
    pub fn content_x(&self) -> f64 {
        self.x + self.padding.left + self.border.width
    }

    pub fn content_y(&self) -> f64 {
        self.y + self.padding.top + self.border.width
    }

    pub fn content_width(&self) -> f64 {
        (self.width - self.padding.horizontal() - 2.0 * self.border.width).max(0.0)
    }
}

/// Layout boxes keyed by node. Each slot is written at most once.
#[derive(Debug, Clone, Default)]
pub struct BoxMap {
    boxes: Vec<Option<LayoutBox>>,
}

impl BoxMap {
    fn with_capacity(len: usize) -> Self {
        Self {
            boxes: vec![None; len],
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&LayoutBox> {
        self.boxes.get(id.0).and_then(Option::as_ref)
    }

    fn insert(&mut self, id: NodeId, b: LayoutBox) {
        debug_assert!(self.boxes[id.0].is_none(), "node laid out twice");
        self.boxes[id.0] = Some(b);
    }
}

/// Where a child may place itself: the left edge and width it fills, the
/// height percentages refer to, and the width and horizontal margins a flex
/// container has already settled for it.
#[derive(Debug, Clone, Copy)]
pub struct ContainingBlock {
    pub x: f64,
    pub width: f64,
    pub height: f64,
    pub forced_width: Option<f64>,
    /// `(left, right)` margins resolved against the flex container, not the slot.
    pub forced_margin: Option<(f64, f64)>,
}

/// Everything a finished layout pass produced.
#[derive(Debug, Clone)]
pub struct LayoutOutput {
    pub document: Document,
    pub boxes: BoxMap,
}

pub struct LayoutEngine<'a> {
    tree: &'a Tree,
    styles: &'a StyleMap,
    services: Services<'a>,
    base_path: Option<&'a Path>,
    font: FontHandle,
    viewport: (f64, f64),
    page_index: usize,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(
        tree: &'a Tree,
        styles: &'a StyleMap,
        services: Services<'a>,
        base_path: Option<&'a Path>,
        font: FontHandle,
        page_size: (f64, f64),
    ) -> Self {
        Self {
            tree,
            styles,
            services,
            base_path,
            font,
            viewport: page_size,
            page_index: 0,
        }
    }

    /// Lay out the subtree at `root` onto a single page.
    pub fn layout(&self, root: Option<NodeId>) -> Result<LayoutOutput, FolioError> {
        let (width, height) = self.viewport;
        let mut out = LayoutOutput {
            document: Document {
                pages: vec![Page::new(width, height)],
            },
            boxes: BoxMap::with_capacity(self.tree.len()),
        };
        if let Some(root) = root {
            let cb = ContainingBlock {
                x: 0.0,
                width,
                height,
                forced_width: None,
                forced_margin: None,
            };
            let mut cursor = 0.0;
            self.layout_child(&mut out, root, &cb, &mut cursor)?;
        }
        Ok(out)
    }

    fn page<'o>(&self, out: &'o mut LayoutOutput) -> Result<&'o mut Page, FolioError> {
        out.document.page_mut(self.page_index)
    }

    fn length_context(&self, style: &ComputedStyle) -> LengthContext {
        style.length_context(self.viewport)
    }

    /// Route a flow child to image or element layout.
    fn layout_child(
        &self,
        out: &mut LayoutOutput,
        id: NodeId,
        cb: &ContainingBlock,
        cursor: &mut f64,
    ) -> Result<(), FolioError> {
        if self.tree.tag(id) == Some("img") {
            self.layout_image(out, id, cb, cursor)
        } else {
            self.layout_element(out, id, cb, cursor)
        }
    }

    /// Lay out one element starting at `*cursor`, paint it, then move the
    /// cursor to the element's `after`.
    pub fn layout_element(
        &self,
        out: &mut LayoutOutput,
        id: NodeId,
        cb: &ContainingBlock,
        cursor: &mut f64,
    ) -> Result<(), FolioError> {
        let Some(style) = self.styles.get(id) else {
            return Ok(());
        };
        if style.display == Display::None {
            return Ok(());
        }
        let start_index = self.page(out)?.items.len();
        let lc = self.length_context(style);

        // ── Box model ──────────────────────────────────────────
        let resolve = |d: Dimension| d.resolve(cb.width, &lc);
        let (margin_left, margin_right) = match cb.forced_margin {
            Some((left, right)) => (Some(left), Some(right)),
            None => (resolve(style.margin.left), resolve(style.margin.right)),
        };
        let mut margin = Edges {
            top: resolve(style.margin.top).unwrap_or(0.0),
            right: margin_right.unwrap_or(0.0),
            bottom: resolve(style.margin.bottom).unwrap_or(0.0),
            left: margin_left.unwrap_or(0.0),
        };
        let padding = Edges {
            top: resolve(style.padding.top).unwrap_or(0.0),
            right: resolve(style.padding.right).unwrap_or(0.0),
            bottom: resolve(style.padding.bottom).unwrap_or(0.0),
            left: resolve(style.padding.left).unwrap_or(0.0),
        };
        let border = Border {
            width: resolve(style.border_width).unwrap_or(0.0).max(0.0),
            color: style.border_color.unwrap_or(style.color),
            radius: resolve(style.border_radius).unwrap_or(0.0).max(0.0),
        };

        let width = match cb.forced_width {
            Some(forced) => forced,
            None => {
                let available = cb.width - margin.horizontal();
                let min = style.min_width.and_then(resolve);
                let max = style.max_width.and_then(resolve);
                let width = resolve(style.width).unwrap_or(available);
                clamp_width(width, min, max)
            }
        };

        if cb.forced_width.is_none() {
            match (margin_left, margin_right) {
                (None, None) => {
                    let offset = (cb.width - width) / 2.0;
                    margin.left = offset;
                    margin.right = offset;
                }
                (None, Some(right)) => margin.left = cb.width - width - right,
                (Some(left), None) => margin.right = cb.width - width - left,
                (Some(_), Some(_)) => {}
            }
        }

        let x = cb.x + margin.left;
        let y = *cursor + margin.top;
        let inner_x = x + padding.left + border.width;
        let inner_width = (width - padding.horizontal() - 2.0 * border.width).max(0.0);
        let content_top = y + padding.top + border.width;

        let explicit_height = style.height.resolve(cb.height, &lc).map(|h| h.max(0.0));
        let child_cb = ContainingBlock {
            x: inner_x,
            width: inner_width,
            height: explicit_height.unwrap_or(cb.height),
            forced_width: None,
            forced_margin: None,
        };

        // ── Children ───────────────────────────────────────────
        let mut absolute = Vec::new();
        let mut inner_cursor = content_top;
        if style.display.is_flex() {
            inner_cursor = flex::layout_flex(self, out, id, style, &child_cb, content_top, &mut absolute)?;
        } else {
            self.layout_block_children(out, id, style, &child_cb, &mut inner_cursor, &mut absolute)?;
        }

        let content_height = inner_cursor - content_top;
        let height =
            explicit_height.unwrap_or(content_height) + padding.vertical() + 2.0 * border.width;
        let after = y + height + margin.bottom;
        *cursor = after;

        let shadow = style.box_shadow.map(|s| Shadow {
            offset_x: resolve(s.offset_x).unwrap_or(0.0),
            offset_y: resolve(s.offset_y).unwrap_or(0.0),
            blur: resolve(s.blur).unwrap_or(0.0),
            spread: resolve(s.spread).unwrap_or(0.0),
            color: s.color,
        });

        let layout_box = LayoutBox {
            x,
            y,
            width,
            height,
            margin,
            padding,
            border,
            background: style.background.clone(),
            shadow,
            font_size: style.font_size,
            after,
            page_index: self.page_index,
        };
        trace!(
            "<{}> box ({:.2}, {:.2}) {:.2}x{:.2}",
            self.tree.tag(id).unwrap_or("?"),
            x,
            y,
            width,
            height
        );

        paint::paint_box(self.page(out)?, &layout_box, start_index);
        out.boxes.insert(id, layout_box);

        for child in absolute {
            self.layout_absolute(out, child, id)?;
        }
        Ok(())
    }

    /// Block flow: paragraphs of inline content between block children.
    fn layout_block_children(
        &self,
        out: &mut LayoutOutput,
        id: NodeId,
        style: &ComputedStyle,
        cb: &ContainingBlock,
        cursor: &mut f64,
        absolute: &mut Vec<NodeId>,
    ) -> Result<(), FolioError> {
        let mut paragraph = String::new();

        for &child in self.tree.children(id) {
            if let Some(text) = self.tree.text(child) {
                paragraph.push(' ');
                paragraph.push_str(text);
                continue;
            }
            let Some(child_style) = self.styles.get(child) else {
                continue;
            };
            match (child_style.position, child_style.display) {
                (_, Display::None) => {}
                (Position::Absolute, _) => absolute.push(child),
                (_, Display::Inline) => {
                    paragraph.push(' ');
                    paragraph.push_str(&self.tree.text_content(child));
                }
                _ => {
                    self.flush_paragraph(out, &paragraph, style, cb, cursor)?;
                    paragraph.clear();
                    self.layout_child(out, child, cb, cursor)?;
                }
            }
        }
        self.flush_paragraph(out, &paragraph, style, cb, cursor)
    }

    /// Wrap and emit buffered text, advancing the cursor one line height per line.
    fn flush_paragraph(
        &self,
        out: &mut LayoutOutput,
        paragraph: &str,
        style: &ComputedStyle,
        cb: &ContainingBlock,
        cursor: &mut f64,
    ) -> Result<(), FolioError> {
        let text = paragraph.trim();
        if text.is_empty() {
            return Ok(());
        }
        let measure = self.services.measure;
        let size = style.font_size;
        let line_height = style.line_height_pt(self.viewport);
        let text = apply_text_transform(text, style.text_transform);

        let page = self.page(out)?;
        for line in wrap_lines(&text, cb.width, size, measure) {
            let x = match style.text_align {
                TextAlign::Left => cb.x,
                TextAlign::Center => cb.x + (cb.width - line.width) / 2.0,
                TextAlign::Right => cb.x + cb.width - line.width,
            };
            let baseline = *cursor + measure.ascent(size);
            paint::emit_text(page, line.text, x, baseline, size, style.color, &self.font);
            *cursor += line_height;
        }
        Ok(())
    }

    /// Place an absolutely positioned element against the content box of
    /// `anchor`. The anchor's cursor and `after` are untouched.
    fn layout_absolute(
        &self,
        out: &mut LayoutOutput,
        id: NodeId,
        anchor: NodeId,
    ) -> Result<(), FolioError> {
        let (Some(style), Some(anchor_box)) = (self.styles.get(id), out.boxes.get(anchor)) else {
            return Ok(());
        };
        let lc = self.length_context(style);
        let inner_width = anchor_box.content_width();
        let left = style
            .left
            .and_then(|d| d.resolve(inner_width, &lc))
            .unwrap_or(0.0);
        let top = style
            .top
            .and_then(|d| d.resolve(anchor_box.height, &lc))
            .unwrap_or(0.0);

        let cb = ContainingBlock {
            x: anchor_box.content_x() + left,
            width: inner_width,
            height: anchor_box.height,
            forced_width: None,
            forced_margin: None,
        };
        let mut cursor = anchor_box.content_y() + top;
        self.layout_child(out, id, &cb, &mut cursor)
    }

    /// Images size from their intrinsic dimensions, keeping the aspect ratio
    /// when only one side is given, and draw a single image primitive.
    fn layout_image(
        &self,
        out: &mut LayoutOutput,
        id: NodeId,
        cb: &ContainingBlock,
        cursor: &mut f64,
    ) -> Result<(), FolioError> {
        let (Some(style), Some(element)) = (self.styles.get(id), self.tree.element(id)) else {
            return Ok(());
        };
        if style.display == Display::None {
            return Ok(());
        }
        let Some(src) = element.attr("src").filter(|s| !s.trim().is_empty()) else {
            return Ok(());
        };
        let path = self.services.resources.resolve(src, self.base_path);
        let intrinsic = self.services.images.intrinsic_size(&path);

        let lc = self.length_context(style);
        let resolve = |d: Dimension| d.resolve(cb.width, &lc);
        let (left, right) = cb.forced_margin.unwrap_or_else(|| {
            (
                resolve(style.margin.left).unwrap_or(0.0),
                resolve(style.margin.right).unwrap_or(0.0),
            )
        });
        let margin = Edges {
            top: resolve(style.margin.top).unwrap_or(0.0),
            right,
            bottom: resolve(style.margin.bottom).unwrap_or(0.0),
            left,
        };
        let padding = Edges {
            top: resolve(style.padding.top).unwrap_or(0.0),
            right: resolve(style.padding.right).unwrap_or(0.0),
            bottom: resolve(style.padding.bottom).unwrap_or(0.0),
            left: resolve(style.padding.left).unwrap_or(0.0),
        };
        let border_width = resolve(style.border_width).unwrap_or(0.0).max(0.0);

        let requested_width = cb.forced_width.or_else(|| resolve(style.width));
        let requested_height = style.height.resolve(cb.height, &lc);
        let (mut width, height) = match (requested_width, requested_height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w * intrinsic.height / intrinsic.width),
            (None, Some(h)) => (h * intrinsic.width / intrinsic.height, h),
            (None, None) => (intrinsic.width, intrinsic.height),
        };
        width = width.min(cb.width - margin.horizontal()).max(0.0);

        let x = cb.x + margin.left;
        let y = *cursor + margin.top;
        let content_x = x + padding.left + border_width;
        let content_y = y + padding.top + border_width;
        paint::emit_image(self.page(out)?, path, content_x, content_y, width, height);

        let outer_height = height + padding.vertical() + 2.0 * border_width;
        let after = y + outer_height + margin.bottom;
        *cursor = after;
        out.boxes.insert(
            id,
            LayoutBox {
                x,
                y,
                width: width + padding.horizontal() + 2.0 * border_width,
                height: outer_height,
                margin,
                padding,
                border: Border {
                    width: border_width,
                    color: style.border_color.unwrap_or(style.color),
                    radius: 0.0,
                },
                background: Background::None,
                shadow: None,
                font_size: style.font_size,
                after,
                page_index: self.page_index,
            },
        );
        Ok(())
    }
}

/// Apply `max-width`, then `min-width`, then keep the result non-negative.
pub fn clamp_width(width: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let mut w = width;
    if let Some(max) = max {
        w = w.min(max);
    }
    if let Some(min) = min {
        w = w.max(min);
    }
    w.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::{ImageSize, FALLBACK_SIZE};
    use crate::model::Primitive;
    use crate::style::cascade::resolve_styles;
    use crate::style::sheet::Stylesheet;

    struct FixedImages(ImageSize);

    impl ImageResolver for FixedImages {
        fn intrinsic_size(&self, _path: &str) -> ImageSize {
            self.0
        }
    }

    fn run_with_images(html: &str, page: (f64, f64), images: &dyn ImageResolver) -> (Tree, LayoutOutput) {
        let mut tree = Tree::parse(html);
        let sheet = Stylesheet::parse(&tree.take_stylesheets());
        let styles = resolve_styles(&tree, &sheet, page);
        let services = Services {
            measure: &FallbackMetrics,
            images,
            resources: &FsResourceResolver,
        };
        let engine = LayoutEngine::new(&tree, &styles, services, None, FontHandle::default(), page);
        let out = engine.layout(tree.layout_root()).unwrap();
        (tree, out)
    }

    fn run(html: &str, page: (f64, f64)) -> (Tree, LayoutOutput) {
        run_with_images(html, page, &FixedImages(FALLBACK_SIZE))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    fn boxed<'o>(tree: &Tree, out: &'o LayoutOutput, id_attr: &str) -> &'o LayoutBox {
        let id = tree
            .descendants(tree.root())
            .into_iter()
            .find(|&n| tree.element(n).and_then(|e| e.id()) == Some(id_attr))
            .unwrap();
        out.boxes.get(id).unwrap()
    }

    #[test]
    fn flex_item_percent_margins_match_slot() {
        let (tree, out) = run(
            r#"<body><div style="display: flex; width: 200pt"><div id="a" style="width: 50pt; margin: 0 10% 0 5%"></div><div id="b" style="width: 20pt"></div></div></body>"#,
            (300.0, 200.0),
        );
        let a = boxed(&tree, &out, "a");
        assert!(approx(a.margin.left, 10.0));
        assert!(approx(a.margin.right, 20.0));
        assert!(approx(a.x, 10.0));
        assert!(approx(a.width, 50.0));
        assert!(approx(boxed(&tree, &out, "b").x, 80.0));
    }

    #[test]
    fn block_children_stack() {
        let (tree, out) = run(
            r#"<body><div id="a" style="height: 20pt; margin-bottom: 5pt"></div><div id="b" style="height: 10pt; margin-top: 3pt"></div></body>"#,
            (300.0, 200.0),
        );
        let a = boxed(&tree, &out, "a");
        let b = boxed(&tree, &out, "b");
        assert!(approx(a.y, 0.0));
        assert!(approx(a.after, 25.0));
        assert!(approx(b.y, 28.0));
        assert!(approx(b.after, 38.0));
        assert!(a.after <= b.y);
    }

    #[test]
    fn auto_width_fills_available() {
        let (tree, out) = run(
            r#"<body><div id="a" style="margin: 0 10pt; padding: 5pt; border-width: 1pt"></div></body>"#,
            (300.0, 200.0),
        );
        let a = boxed(&tree, &out, "a");
        assert!(approx(a.x, 10.0));
        assert!(approx(a.width, 280.0));
        assert!(approx(a.content_width(), 268.0));
        // Empty content: padding and border only.
        assert!(approx(a.height, 12.0));
    }

    #[test]
    fn auto_margins_center() {
        let (tree, out) = run(
            r#"<body><div id="a" style="width: 100pt; margin: 0 auto"></div></body>"#,
            (300.0, 200.0),
        );
        let a = boxed(&tree, &out, "a");
        assert!(approx(a.margin.left, 100.0));
        assert!(approx(a.margin.right, 100.0));
        assert!(approx(a.x, 100.0));
    }

    #[test]
    fn single_auto_margin_absorbs_space() {
        let (tree, out) = run(
            r#"<body><div id="a" style="width: 100pt; margin-left: auto; margin-right: 20pt"></div></body>"#,
            (300.0, 200.0),
        );
        let a = boxed(&tree, &out, "a");
        assert!(approx(a.x, 180.0));
    }

    #[test]
    fn min_max_width_clamp() {
        assert!(approx(clamp_width(500.0, Some(10.0), Some(200.0)), 200.0));
        assert!(approx(clamp_width(5.0, Some(10.0), Some(200.0)), 10.0));
        assert!(approx(clamp_width(-5.0, None, None), 0.0));
        let (tree, out) = run(
            r#"<body><div id="a" style="max-width: 50%"></div><div id="b" style="width: 10pt; min-width: 40pt"></div></body>"#,
            (300.0, 200.0),
        );
        assert!(approx(boxed(&tree, &out, "a").width, 150.0));
        assert!(approx(boxed(&tree, &out, "b").width, 40.0));
    }

    #[test]
    fn explicit_height_is_content_height() {
        let (tree, out) = run(
            r#"<body><div id="a" style="height: 50pt; padding: 10pt; border: 2pt solid #000"></div></body>"#,
            (300.0, 200.0),
        );
        let a = boxed(&tree, &out, "a");
        assert!(approx(a.height, 74.0));
        assert!(approx(a.after, 74.0));
    }

    #[test]
    fn paragraph_lines_advance_by_line_height() {
        // Fallback metrics: 5pt per char at 10pt, ascent = size.
        let (_, out) = run(
            r#"<body style="font-size: 10pt; line-height: 2">aaa bbb <span>ccc</span></body>"#,
            (40.0, 200.0),
        );
        let texts: Vec<(String, f64)> = out.document.pages[0]
            .items
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { content, y, .. } => Some((content.clone(), *y)),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].0, "aaa bbb");
        assert_eq!(texts[1].0, "ccc");
        assert!(approx(texts[0].1, 190.0));
        assert!(approx(texts[1].1, 170.0));
    }

    #[test]
    fn text_align_and_transform() {
        let (_, out) = run(
            r#"<body><p style="font-size: 10pt; text-align: right; text-transform: uppercase">ab</p><p style="font-size: 10pt; text-align: center">ab</p></body>"#,
            (100.0, 100.0),
        );
        let texts: Vec<(String, f64)> = out.document.pages[0]
            .items
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { content, x, .. } => Some((content.clone(), *x)),
                _ => None,
            })
            .collect();
        assert_eq!(texts[0].0, "AB");
        assert!(approx(texts[0].1, 90.0));
        assert!(approx(texts[1].1, 45.0));
    }

    #[test]
    fn display_none_is_skipped() {
        let (tree, out) = run(
            r#"<body><div id="a" style="display:none; height: 10pt; background: #000"></div><div id="b" style="height: 5pt"></div></body>"#,
            (100.0, 100.0),
        );
        assert!(approx(boxed(&tree, &out, "b").y, 0.0));
        assert!(out.document.pages[0].items.is_empty());
    }

    #[test]
    fn absolute_child_leaves_flow_alone() {
        let (tree, out) = run(
            r#"<body><div id="anchor" style="padding: 10pt; height: 100pt"><div id="abs" style="position: absolute; left: 20pt; top: 30pt; width: 40pt; height: 5pt"></div><div id="flow" style="height: 10pt"></div></div></body>"#,
            (300.0, 300.0),
        );
        let abs = boxed(&tree, &out, "abs");
        assert!(approx(abs.x, 30.0));
        assert!(approx(abs.y, 40.0));
        assert!(approx(abs.width, 40.0));
        let flow = boxed(&tree, &out, "flow");
        assert!(approx(flow.y, 10.0));
        assert!(approx(boxed(&tree, &out, "anchor").height, 120.0));
    }

    #[test]
    fn image_keeps_aspect_ratio() {
        let images = FixedImages(ImageSize {
            width: 200.0,
            height: 100.0,
        });
        let (tree, out) = run_with_images(
            r#"<body><img id="i" src="a.png" style="width: 100pt"><div id="after" style="height: 1pt"></div></body>"#,
            (300.0, 300.0),
            &images,
        );
        let img = boxed(&tree, &out, "i");
        assert!(approx(img.width, 100.0));
        assert!(approx(img.height, 50.0));
        assert!(approx(boxed(&tree, &out, "after").y, 50.0));
        match &out.document.pages[0].items[0] {
            Primitive::Image { path, y, h, .. } => {
                assert_eq!(path, "a.png");
                assert!(approx(*y, 250.0));
                assert!(approx(*h, 50.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn image_width_is_capped() {
        let images = FixedImages(ImageSize {
            width: 1000.0,
            height: 10.0,
        });
        let (tree, out) = run_with_images(r#"<body><img id="i" src="wide.png"></body>"#, (300.0, 300.0), &images);
        assert!(approx(boxed(&tree, &out, "i").width, 300.0));
    }

    #[test]
    fn image_without_src_is_skipped() {
        let (_, out) = run(r#"<body><img><p>x</p></body>"#, (300.0, 300.0));
        let items = &out.document.pages[0].items;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Primitive::Text { .. }));
    }

    #[test]
    fn empty_document_has_one_blank_page() {
        let (_, out) = run("", (100.0, 50.0));
        assert_eq!(out.document.pages.len(), 1);
        assert!(out.document.pages[0].items.is_empty());
    }
}
