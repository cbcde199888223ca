//! # Painting
//!
//! Turns finished layout boxes into primitives. This is the only place that
//! converts from top-down layout coordinates to the bottom-left convention
//! of [`Page`].
//!
//! A box's decorations go in at the index recorded before its children were
//! laid out, so they sit behind the children's primitives even though they
//! are produced after them. Within a box the order is shadow, background,
//! border.

use crate::font::FontHandle;
use crate::layout::LayoutBox;
use crate::model::{Page, Primitive};
use crate::style::values::{Background, Color, ColorStop};

/// Minimum number of bands a gradient is split into.
pub const MIN_GRADIENT_BANDS: usize = 8;
/// Bands per colour stop.
pub const BANDS_PER_STOP: usize = 16;
/// Each band but the last overlaps the next by this much to hide seams.
const BAND_OVERLAP: f64 = 1.0;

/// Paint the decorations of `b` and splice them in at `insert_at`.
pub fn paint_box(page: &mut Page, b: &LayoutBox, insert_at: usize) {
    let bottom = page.flip_y(b.y, b.height);
    let mut items = Vec::new();

    if let Some(shadow) = b.shadow.filter(|s| s.color.a > 0.0) {
        let spread = shadow.spread;
        items.push(Primitive::fill(
            b.x + shadow.offset_x - spread,
            bottom - shadow.offset_y - spread,
            (b.width + 2.0 * spread).max(0.0),
            (b.height + 2.0 * spread).max(0.0),
            shadow.color.rgb(),
            shadow.color.a,
            b.border.radius,
        ));
    }

    match &b.background {
        Background::None => {}
        Background::Solid(color) => {
            if color.a > 0.0 {
                items.push(Primitive::fill(
                    b.x,
                    bottom,
                    b.width,
                    b.height,
                    color.rgb(),
                    color.a,
                    b.border.radius,
                ));
            }
        }
        Background::LinearGradient { angle, stops } => {
            items.extend(gradient_bands(page, b, *angle, stops));
        }
    }

    if b.border.width > 0.0 {
        items.push(Primitive::StrokeRect {
            x: b.x,
            y: bottom,
            w: b.width,
            h: b.height,
            stroke: b.border.color.rgb(),
            stroke_width: b.border.width,
            alpha: b.border.color.a,
            radius: b.border.radius,
        });
    }

    page.insert_at(insert_at, items);
}

/// Approximate a linear gradient with solid bands swept across the box
/// along whichever axis dominates the gradient direction.
fn gradient_bands(page: &Page, b: &LayoutBox, angle: f64, stops: &[ColorStop]) -> Vec<Primitive> {
    if stops.is_empty() || b.width <= 0.0 || b.height <= 0.0 {
        return Vec::new();
    }
    let count = MIN_GRADIENT_BANDS.max(BANDS_PER_STOP * stops.len());
    let radians = angle.to_radians();
    // CSS bearing, not a math angle: 0deg points up, 90deg right, 180deg
    // down (top to bottom). Coordinates here are top-down.
    let (dx, dy) = (radians.sin(), -radians.cos());
    let horizontal = dx.abs() >= dy.abs();
    let forward = if horizontal { dx >= 0.0 } else { dy >= 0.0 };
    let length = if horizontal { b.width } else { b.height };
    let step = length / count as f64;

    let mut bands = Vec::with_capacity(count);
    for i in 0..count {
        let color = sample_stops(stops, (i as f64 + 0.5) / count as f64);
        let overlap = if i + 1 < count { BAND_OVERLAP.min(step) } else { 0.0 };
        let extent = step + overlap;
        // Offset of the band's leading edge from the box's start edge.
        let offset = if forward {
            i as f64 * step
        } else {
            length - (i as f64 + 1.0) * step - overlap
        };
        let (x, top, w, h) = if horizontal {
            (b.x + offset, b.y, extent, b.height)
        } else {
            (b.x, b.y + offset, b.width, extent)
        };
        bands.push(Primitive::fill(
            x,
            page.flip_y(top, h),
            w,
            h,
            color.rgb(),
            color.a,
            0.0,
        ));
    }
    bands
}

/// Colour at `t` along the gradient line, interpolated between the stops
/// that bracket it.
pub fn sample_stops(stops: &[ColorStop], t: f64) -> Color {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Color::BLACK;
    };
    if t <= first.position {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if t <= b.position {
            let span = b.position - a.position;
            if span <= f64::EPSILON {
                return b.color;
            }
            return a.color.lerp(&b.color, (t - a.position) / span);
        }
    }
    last.color
}

/// Emit one line of text whose baseline sits `baseline` points below the
/// top of the page.
pub fn emit_text(
    page: &mut Page,
    content: String,
    x: f64,
    baseline: f64,
    size: f64,
    color: Color,
    font: &FontHandle,
) {
    let y = page.height - baseline;
    page.items.push(Primitive::Text {
        content,
        x,
        y,
        size,
        color: color.rgb(),
        alpha: color.a,
        font: font.clone(),
    });
}

/// Emit an image whose top-left corner is at (`x`, `top`) in layout coordinates.
pub fn emit_image(page: &mut Page, path: String, x: f64, top: f64, w: f64, h: f64) {
    let y = page.flip_y(top, h);
    page.items.push(Primitive::Image { path, x, y, w, h });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Border, Edges, Shadow};

    fn layout_box(background: Background) -> LayoutBox {
        LayoutBox {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 50.0,
            margin: Edges::default(),
            padding: Edges::default(),
            border: Border {
                width: 0.0,
                color: Color::BLACK,
                radius: 0.0,
            },
            background,
            shadow: None,
            font_size: 12.0,
            after: 70.0,
            page_index: 0,
        }
    }

    fn stop(r: u8, position: f64) -> ColorStop {
        ColorStop {
            color: Color::rgba(r, 0, 0, 1.0),
            position,
        }
    }

    #[test]
    fn solid_background_flips_once() {
        let mut page = Page::new(200.0, 300.0);
        paint_box(&mut page, &layout_box(Background::Solid(Color::rgba(0, 0, 255, 1.0))), 0);
        match &page.items[0] {
            Primitive::Rect { x, y, w, h, fill, .. } => {
                assert_eq!((*x, *y, *w, *h), (10.0, 230.0, 100.0, 50.0));
                assert_eq!(fill.map(|c| c.b), Some(255));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn decorations_go_behind_existing_children() {
        let mut page = Page::new(200.0, 300.0);
        page.items.push(Primitive::Image {
            path: "a.png".into(),
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
        });
        let mut b = layout_box(Background::Solid(Color::BLACK));
        b.border.width = 2.0;
        b.shadow = Some(Shadow {
            offset_x: 3.0,
            offset_y: 4.0,
            blur: 0.0,
            spread: 1.0,
            color: Color::rgba(0, 0, 0, 0.5),
        });
        paint_box(&mut page, &b, 0);
        assert_eq!(page.items.len(), 4);
        match &page.items[0] {
            Primitive::Rect { x, y, w, h, alpha, .. } => {
                assert_eq!((*x, *y, *w, *h), (12.0, 225.0, 102.0, 52.0));
                assert_eq!(*alpha, 0.5);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(page.items[1], Primitive::Rect { .. }));
        assert!(matches!(page.items[2], Primitive::StrokeRect { .. }));
        assert!(matches!(page.items[3], Primitive::Image { .. }));
    }

    #[test]
    fn transparent_shadow_and_background_paint_nothing() {
        let mut page = Page::new(200.0, 300.0);
        let mut b = layout_box(Background::Solid(Color::rgba(0, 0, 0, 0.0)));
        b.shadow = Some(Shadow {
            offset_x: 1.0,
            offset_y: 1.0,
            blur: 0.0,
            spread: 0.0,
            color: Color::rgba(0, 0, 0, 0.0),
        });
        paint_box(&mut page, &b, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn gradient_band_count_and_colors() {
        let mut page = Page::new(200.0, 300.0);
        let stops = vec![stop(0, 0.0), stop(255, 1.0)];
        paint_box(
            &mut page,
            &layout_box(Background::LinearGradient { angle: 90.0, stops }),
            0,
        );
        assert_eq!(page.items.len(), 32);
        let fills: Vec<(f64, u8)> = page
            .items
            .iter()
            .map(|p| match p {
                Primitive::Rect { x, fill, .. } => (*x, fill.map_or(0, |c| c.r)),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        // Left to right, dark to light.
        assert!((fills[0].0 - 10.0).abs() < 0.01);
        assert!(fills[0].1 < fills[31].1);
        assert!(fills.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn vertical_gradient_sweeps_top_down() {
        let mut page = Page::new(200.0, 300.0);
        let stops = vec![stop(0, 0.0), stop(200, 0.5), stop(255, 1.0)];
        paint_box(
            &mut page,
            &layout_box(Background::LinearGradient { angle: 180.0, stops }),
            0,
        );
        assert_eq!(page.items.len(), 48);
        match (&page.items[0], &page.items[47]) {
            (Primitive::Rect { y: first, h, .. }, Primitive::Rect { y: last, .. }) => {
                // First band hugs the top edge of the box (top-down y = 20).
                assert!((first + h - 280.0).abs() < 0.01);
                assert!((last - 230.0).abs() < 0.01);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn stop_sampling() {
        let stops = vec![stop(0, 0.0), stop(100, 0.5), stop(200, 1.0)];
        assert_eq!(sample_stops(&stops, -1.0).r, 0);
        assert_eq!(sample_stops(&stops, 0.25).r, 50);
        assert_eq!(sample_stops(&stops, 0.75).r, 150);
        assert_eq!(sample_stops(&stops, 2.0).r, 200);
    }

    #[test]
    fn text_baseline_is_flipped() {
        let mut page = Page::new(200.0, 300.0);
        emit_text(&mut page, "Hi".into(), 5.0, 12.0, 12.0, Color::BLACK, &FontHandle::default());
        match &page.items[0] {
            Primitive::Text { y, font, .. } => {
                assert_eq!(*y, 288.0);
                assert_eq!(font.as_str(), "F1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
