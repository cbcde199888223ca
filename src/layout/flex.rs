//! # Flex Rows
//!
//! Single-line, row-direction flex layout. Items start at their basis,
//! share leftover width by `flex-grow`, and are spread along the row by
//! `justify-content`. Items never wrap and the cross axis is always
//! start-aligned.

use super::{ContainingBlock, LayoutEngine, LayoutOutput};
use crate::error::FolioError;
use crate::markup::NodeId;
use crate::style::cascade::ComputedStyle;
use crate::style::{Display, JustifyContent, Position};
use log::trace;

/// Distribute remaining space among items based on flex-grow factors.
pub fn distribute_grow(items: &mut [(f64, f64)], remaining: f64) {
    // items: [(current_width, flex_grow)]
    let total_grow: f64 = items.iter().map(|(_, g)| g).sum();
    if total_grow <= 0.0 || remaining <= 0.0 {
        return;
    }
    for (width, grow) in items.iter_mut() {
        *width += remaining * (*grow / total_grow);
    }
}

/// Offset of the first item and extra space between neighbours for `count`
/// items leaving `slack` unused on the row.
pub fn justify_offsets(justify: JustifyContent, slack: f64, count: usize) -> (f64, f64) {
    let slack = slack.max(0.0);
    let n = count as f64;
    match justify {
        JustifyContent::FlexStart => (0.0, 0.0),
        JustifyContent::FlexEnd => (slack, 0.0),
        JustifyContent::Center => (slack / 2.0, 0.0),
        JustifyContent::SpaceBetween => {
            if count > 1 {
                (0.0, slack / (n - 1.0))
            } else {
                (0.0, 0.0)
            }
        }
        JustifyContent::SpaceAround => {
            if count > 0 {
                let space = slack / n;
                (space / 2.0, space)
            } else {
                (0.0, 0.0)
            }
        }
        JustifyContent::SpaceEvenly => {
            let space = slack / (n + 1.0);
            (space, space)
        }
    }
}

struct FlexItem {
    id: NodeId,
    margin_left: f64,
    margin_right: f64,
    width: f64,
}

/// Lay out the children of a flex container in one row starting at
/// `start_y`. Returns the lowest `after` among the items.
pub(super) fn layout_flex(
    engine: &LayoutEngine<'_>,
    out: &mut LayoutOutput,
    container: NodeId,
    style: &ComputedStyle,
    cb: &ContainingBlock,
    start_y: f64,
    absolute: &mut Vec<NodeId>,
) -> Result<f64, FolioError> {
    let mut items = Vec::new();
    let mut sizing = Vec::new();
    for &child in engine.tree.children(container) {
        let Some(child_style) = engine.styles.get(child) else {
            continue;
        };
        if child_style.display == Display::None {
            continue;
        }
        if child_style.position == Position::Absolute {
            absolute.push(child);
            continue;
        }
        let lc = engine.length_context(child_style);
        let margin_left = child_style.margin.left.resolve(cb.width, &lc).unwrap_or(0.0);
        let margin_right = child_style.margin.right.resolve(cb.width, &lc).unwrap_or(0.0);
        let basis = child_style
            .flex_basis
            .and_then(|d| d.resolve(cb.width, &lc))
            .or_else(|| child_style.width.resolve(cb.width, &lc))
            .unwrap_or(0.0)
            .max(0.0);
        items.push(FlexItem {
            id: child,
            margin_left,
            margin_right,
            width: basis,
        });
        sizing.push((basis, child_style.flex_grow));
    }
    if items.is_empty() {
        return Ok(start_y);
    }

    let lc = engine.length_context(style);
    let gap = style.gap.resolve(cb.width, &lc).unwrap_or(0.0).max(0.0);
    let gaps = gap * (items.len() - 1) as f64;
    let margins: f64 = items.iter().map(|i| i.margin_left + i.margin_right).sum();
    let bases: f64 = sizing.iter().map(|(w, _)| w).sum();
    let free = (cb.width - bases - margins - gaps).max(0.0);

    distribute_grow(&mut sizing, free);
    for (item, (width, _)) in items.iter_mut().zip(&sizing) {
        item.width = *width;
    }

    let occupied: f64 = items
        .iter()
        .map(|i| i.width + i.margin_left + i.margin_right)
        .sum();
    let slack = cb.width - occupied - gaps;
    let (start_offset, between_extra) = justify_offsets(style.justify_content, slack, items.len());
    trace!(
        "flex row: {} items, free {:.2}, slack {:.2}",
        items.len(),
        free,
        slack
    );

    let mut x = cb.x + start_offset;
    let mut bottom = start_y;
    for item in &items {
        let slot = ContainingBlock {
            x,
            width: item.width + item.margin_left + item.margin_right,
            height: cb.height,
            forced_width: Some(item.width),
            forced_margin: Some((item.margin_left, item.margin_right)),
        };
        let mut cursor = start_y;
        engine.layout_child(out, item.id, &slot, &mut cursor)?;
        bottom = bottom.max(cursor);
        x += slot.width + gap + between_extra;
    }
    Ok(bottom)
}
