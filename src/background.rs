//! Recursive Background Filter
//!
//! Removes white geometry from the bleed layer. The tree is walked once to
//! collect handles and only then mutated, so removals never shift what the
//! walk still has to visit.

use crate::diagnostics::{Diagnostics, Phase};
use crate::document::{Document, ItemError, Selection};
use crate::geometry::{walk_leaves, Color, ItemId, Leaf, PageItem};
use crate::print::BACKGROUND_SPOT;

/// `Some(true)` for CMYK 0/0/0/0 or the background spot ink, `None` if the paint can't be read.
pub fn is_background(color: &Color) -> Option<bool> {
    match color {
        Color::Cmyk { cyan, magenta, yellow, black } => {
            Some(*cyan == 0.0 && *magenta == 0.0 && *yellow == 0.0 && *black == 0.0)
        }
        Color::Spot { name } => Some(name == BACKGROUND_SPOT),
        Color::Unsupported { .. } => None,
    }
}

fn paint_is_background(leaf: &Leaf, active: bool, color: Option<&Color>) -> Result<bool, ItemError> {
    match (active, color) {
        (true, Some(color)) => is_background(color).ok_or_else(|| {
            let kind = match color {
                Color::Unsupported { kind } => kind.clone(),
                _ => "unknown".to_string(),
            };
            ItemError::UnreadableColor(leaf.id, kind)
        }),
        _ => Ok(false),
    }
}

/// Fill and stroke are judged independently; either one flags the leaf.
pub fn leaf_is_background(leaf: &Leaf) -> Result<bool, ItemError> {
    let fill = paint_is_background(leaf, leaf.filled, leaf.fill_color.as_ref())?;
    let stroke = paint_is_background(leaf, leaf.stroked, leaf.stroke_color.as_ref())?;
    Ok(fill || stroke)
}

/// Append every background leaf under `item` to `into`. Containers are never collected.
pub fn collect_background(item: &PageItem, into: &mut Vec<ItemId>, diagnostics: &mut Diagnostics) {
    walk_leaves(item, &mut |leaf, _| match leaf_is_background(leaf) {
        Ok(true) => into.push(leaf.id),
        Ok(false) => {}
        Err(e) => diagnostics.skip(Phase::BackgroundFilter, Some(leaf.id), e),
    });
}

/// Strip background leaves from `layer`, then select what is left.
pub fn strip_background(doc: &mut Document, layer: &str, diagnostics: &mut Diagnostics) -> Selection {
    let mut doomed = vec![];
    if let Some(l) = doc.find_layer(layer) {
        for item in &l.items {
            collect_background(item, &mut doomed, diagnostics);
        }
    }

    let mut removed = 0;
    for id in &doomed {
        match doc.remove_item(*id) {
            Ok(()) => removed += 1,
            Err(e) => diagnostics.skip(Phase::BackgroundFilter, Some(*id), e),
        }
    }
    tracing::info!(layer, flagged = doomed.len(), removed, "background stripped");

    doc.select_all(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Group;
    use kurbo::Rect;

    fn rect() -> Rect {
        Rect::new(0.0, 0.0, 1.0, 1.0)
    }

    #[test]
    fn test_background_predicate() {
        assert_eq!(is_background(&Color::cmyk(0.0, 0.0, 0.0, 0.0)), Some(true));
        assert_eq!(is_background(&Color::cmyk(0.0, 0.0, 0.0, 1.0)), Some(false));
        assert_eq!(is_background(&Color::spot("Blanc")), Some(true));
        assert_eq!(is_background(&Color::spot("Rouge")), Some(false));
        assert_eq!(is_background(&Color::Unsupported { kind: "gradient".into() }), None);
    }

    #[test]
    fn test_white_stroke_alone_flags_the_leaf() {
        let mut leaf = Leaf::filled_path(rect(), Color::spot("Rouge"));
        leaf.stroked = true;
        leaf.stroke_color = Some(Color::spot("Blanc"));
        assert_eq!(leaf_is_background(&leaf), Ok(true));
    }

    #[test]
    fn test_disabled_fill_is_ignored() {
        let mut leaf = Leaf::filled_path(rect(), Color::cmyk(0.0, 0.0, 0.0, 0.0));
        leaf.filled = false;
        assert_eq!(leaf_is_background(&leaf), Ok(false));
    }

    #[test]
    fn test_group_is_never_collected() {
        let mut white = Leaf::filled_path(rect(), Color::cmyk(0.0, 0.0, 0.0, 0.0));
        white.id = ItemId(2);
        let mut red = Leaf::filled_path(rect(), Color::cmyk(0.0, 100.0, 100.0, 0.0));
        red.id = ItemId(3);
        let mut group = Group::new(vec![white.into(), red.into()]);
        group.id = ItemId(1);

        let mut found = vec![];
        collect_background(&group.into(), &mut found, &mut Diagnostics::new());
        assert_eq!(found, vec![ItemId(2)]);
    }

    #[test]
    fn test_unreadable_paint_is_skipped_not_flagged() {
        let leaf = Leaf::filled_path(rect(), Color::Unsupported { kind: "pattern".into() });
        let mut found = vec![];
        let mut diagnostics = Diagnostics::new();
        collect_background(&leaf.into(), &mut found, &mut diagnostics);
        assert!(found.is_empty());
        assert_eq!(diagnostics.in_phase(Phase::BackgroundFilter).count(), 1);
    }
}
