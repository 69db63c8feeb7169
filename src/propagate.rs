//! Propagation Duplicator
//!
//! Copies every item of one layer into another. Each copy lands at the
//! beginning of the target, so the target ends up in reverse source order.
//! Downstream tooling expects that order; keep it.

use crate::diagnostics::{Diagnostics, Phase};
use crate::document::{Document, Placement};
use crate::geometry::ItemId;

/// Duplicate `source` into `target`; returns the handles of the copies made.
pub fn duplicate_into(doc: &mut Document, source: &str, target: &str, diagnostics: &mut Diagnostics) -> Vec<ItemId> {
    let ids = match doc.find_layer(source) {
        Some(layer) => layer.item_ids(),
        None => {
            diagnostics.skip(Phase::Propagate, None, format!("source layer not found: {}", source));
            return vec![];
        }
    };

    let mut copies = vec![];
    for id in ids {
        match doc.duplicate_item(id, target, Placement::Beginning) {
            Ok(copy) => copies.push(copy),
            Err(e) => diagnostics.skip(Phase::Propagate, Some(id), e),
        }
    }
    tracing::info!(source, target, copied = copies.len(), "layer duplicated");
    copies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Color, Leaf};
    use kurbo::Rect;

    #[test]
    fn test_target_order_is_reversed() {
        let mut doc = Document::new("dup", Rect::new(0.0, 0.0, 10.0, 10.0));
        doc.ensure_layer("S");
        doc.ensure_layer("T");
        for name in ["A", "B", "C"] {
            doc.append_item("S", Leaf::filled_path(Rect::new(0.0, 0.0, 1.0, 1.0), Color::spot("Rouge")).named(name))
                .unwrap();
        }

        let copies = duplicate_into(&mut doc, "S", "T", &mut Diagnostics::new());
        assert_eq!(copies.len(), 3);

        let names: Vec<_> = doc.find_layer("T").unwrap().items.iter().map(|i| i.name().unwrap()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
        assert_eq!(doc.find_layer("S").unwrap().items.len(), 3);
    }

    #[test]
    fn test_empty_source_is_a_no_op() {
        let mut doc = Document::new("dup", Rect::new(0.0, 0.0, 10.0, 10.0));
        doc.ensure_layer("S");
        doc.ensure_layer("T");
        let mut diagnostics = Diagnostics::new();
        assert!(duplicate_into(&mut doc, "S", "T", &mut diagnostics).is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_locked_target_is_recorded_per_item() {
        let mut doc = Document::new("dup", Rect::new(0.0, 0.0, 10.0, 10.0));
        doc.ensure_layer("S");
        doc.ensure_layer("T");
        doc.append_item("S", Leaf::filled_path(Rect::new(0.0, 0.0, 1.0, 1.0), Color::spot("Rouge")))
            .unwrap();
        doc.set_layer_locked("T", true).unwrap();
        let mut diagnostics = Diagnostics::new();
        assert!(duplicate_into(&mut doc, "S", "T", &mut diagnostics).is_empty());
        assert_eq!(diagnostics.len(), 1);
    }
}
