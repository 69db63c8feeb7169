//! Layer Structure Manager
//!
//! Ensures the production layers exist, migrates the legacy default layer
//! and fixes the stacking order. Nothing here is fatal; running it twice
//! leaves the document as the first run did.

use crate::diagnostics::{Diagnostics, Phase};
use crate::document::{Document, Placement};
use crate::print::{ProductionLayer, LEGACY_LAYER};

pub fn prepare_layers(doc: &mut Document, diagnostics: &mut Diagnostics) {
    for layer in [
        ProductionLayer::FondPerdu,
        ProductionLayer::Artwork,
        ProductionLayer::CutContour,
    ] {
        doc.ensure_layer(layer.name());
    }

    migrate_legacy_layer(doc, diagnostics);
    fix_stacking(doc, diagnostics);
}

fn migrate_legacy_layer(doc: &mut Document, diagnostics: &mut Diagnostics) {
    let ids = match doc.find_layer(LEGACY_LAYER) {
        Some(layer) => layer.item_ids(),
        None => return,
    };
    tracing::info!(items = ids.len(), "migrating legacy layer");

    let artwork = ProductionLayer::Artwork.name();
    // A previous run leaves Artwork locked.
    for layer in [artwork, LEGACY_LAYER] {
        if let Err(e) = doc.set_layer_locked(layer, false) {
            diagnostics.skip(Phase::Layers, None, e);
        }
    }

    // Back to front, each landing at the beginning: relative order survives.
    for id in ids.into_iter().rev() {
        if let Err(e) = doc.move_item(id, artwork, Placement::Beginning) {
            diagnostics.skip(Phase::Layers, Some(id), e);
        }
    }

    // Never delete art along with the layer.
    let left = doc.find_layer(LEGACY_LAYER).map_or(0, |l| l.items.len());
    if left > 0 {
        diagnostics.skip(
            Phase::Layers,
            None,
            format!("layer '{}' kept, {} items could not be moved", LEGACY_LAYER, left),
        );
        return;
    }
    if let Err(e) = doc.remove_layer(LEGACY_LAYER) {
        diagnostics.skip(Phase::Layers, None, e);
    }
}

fn fix_stacking(doc: &mut Document, diagnostics: &mut Diagnostics) {
    let cut = ProductionLayer::CutContour.name();
    let artwork = ProductionLayer::Artwork.name();
    let bleed = ProductionLayer::FondPerdu.name();

    if let Err(e) = doc.send_layer_to_front(cut) {
        diagnostics.skip(Phase::Layers, None, e);
    }
    // Artwork comes forward until it sits right behind the cut layer.
    if let Err(e) = doc.place_layer_behind(artwork, cut) {
        diagnostics.skip(Phase::Layers, None, e);
    }
    if let Err(e) = doc.send_layer_to_back(bleed) {
        diagnostics.skip(Phase::Layers, None, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Color, Leaf};
    use kurbo::Rect;

    fn legacy_doc() -> Document {
        let mut doc = Document::new("legacy", Rect::new(0.0, 0.0, 100.0, 100.0));
        doc.ensure_layer(LEGACY_LAYER);
        for i in 0..3 {
            let x = i as f64 * 10.0;
            doc.append_item(
                LEGACY_LAYER,
                Leaf::filled_path(Rect::new(x, 0.0, x + 5.0, 5.0), Color::cmyk(0.0, 0.0, 0.0, 100.0))
                    .named(format!("item{}", i)),
            )
            .unwrap();
        }
        doc
    }

    #[test]
    fn test_migrates_legacy_content_in_order() {
        let mut doc = legacy_doc();
        let mut diagnostics = Diagnostics::new();
        prepare_layers(&mut doc, &mut diagnostics);

        assert!(doc.find_layer(LEGACY_LAYER).is_none());
        let names: Vec<_> = doc
            .find_layer("Artwork")
            .unwrap()
            .items
            .iter()
            .map(|i| i.name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["item0", "item1", "item2"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_stacking_is_cut_artwork_bleed() {
        let mut doc = legacy_doc();
        doc.ensure_layer("Notes");
        prepare_layers(&mut doc, &mut Diagnostics::new());
        let names = doc.layer_names();
        assert_eq!(names[0], "CutContour");
        assert_eq!(names[1], "Artwork");
        assert_eq!(*names.last().unwrap(), "FondPerdu");
    }

    #[test]
    fn test_locked_legacy_item_does_not_block_the_rest() {
        let mut doc = legacy_doc();
        let first = doc.find_layer(LEGACY_LAYER).unwrap().items[0].id();
        doc.find_item_mut(first).unwrap().set_locked(true);

        let mut diagnostics = Diagnostics::new();
        prepare_layers(&mut doc, &mut diagnostics);

        assert_eq!(doc.find_layer("Artwork").unwrap().items.len(), 2);
        // one failed move, one note about the kept layer
        assert_eq!(diagnostics.in_phase(Phase::Layers).count(), 2);
        let legacy = doc.find_layer(LEGACY_LAYER).expect("legacy layer kept");
        assert_eq!(legacy.item_ids(), vec![first]);
    }

    #[test]
    fn test_locked_artwork_still_receives_legacy_items() {
        let mut doc = legacy_doc();
        doc.ensure_layer("Artwork");
        doc.set_layer_locked("Artwork", true).unwrap();

        let mut diagnostics = Diagnostics::new();
        prepare_layers(&mut doc, &mut diagnostics);

        assert!(doc.find_layer(LEGACY_LAYER).is_none());
        let artwork = doc.find_layer("Artwork").unwrap();
        assert!(!artwork.locked);
        assert_eq!(artwork.items.len(), 3);
        assert!(diagnostics.is_empty());
    }
}
