//! Contour Finalizer
//!
//! Unites the cut-contour copy into one path and paints it as the die line.
//! The layer is left unlocked on exit: the spot swatch is applied by hand
//! afterwards.

use std::path::Path;

use crate::diagnostics::{Diagnostics, Phase};
use crate::document::{Document, ItemError, Selection};
use crate::macros::{resolve, run_macro, MacroPlayer};
use crate::print::{cut_line_color, ProductionLayer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContourReport {
    /// The union action ran and returned without error
    pub united: bool,
    /// Item taken as the merge result
    pub selection: Selection,
    pub recolored: usize,
}

pub fn finalize<P: MacroPlayer + ?Sized>(
    doc: &mut Document,
    player: &mut P,
    union_action: Option<&Path>,
    procedure: &str,
    diagnostics: &mut Diagnostics,
) -> ContourReport {
    let layer = ProductionLayer::CutContour.name();
    let mut report = ContourReport::default();

    if let Err(e) = doc.set_layer_locked(layer, false) {
        diagnostics.skip(Phase::Contour, None, e);
        return report;
    }

    let selection = doc.select_all(layer);
    if !selection.is_empty() {
        match resolve(union_action) {
            Some(path) => match run_macro(player, doc, &selection, path, procedure) {
                Ok(()) => report.united = true,
                Err(e) => diagnostics.skip(Phase::Contour, None, e),
            },
            None if selection.len() > 1 => diagnostics.note(
                Phase::Contour,
                format!("union action not available, {} cut paths left unmerged", selection.len()),
            ),
            None => {}
        }
    }

    // Whatever now sits first in the layer is taken as the merged path.
    let first = doc.find_layer(layer).and_then(|l| l.items.first()).map(|item| item.id());
    report.selection = match first {
        Some(id) => doc.select(id).unwrap_or_else(|e| {
            diagnostics.skip(Phase::Contour, Some(id), e);
            Selection::new()
        }),
        None => Selection::new(),
    };

    if !report.selection.is_empty() {
        report.recolored = paint_cut_line(doc, &report.selection, diagnostics);
    }
    tracing::info!(united = report.united, recolored = report.recolored, "cut contour finalized");
    report
}

/// Unfilled, stroked, cut-line colored. Returns the number of leaves painted.
fn paint_cut_line(doc: &mut Document, selection: &Selection, diagnostics: &mut Diagnostics) -> usize {
    let color = cut_line_color();
    let mut painted = 0;
    doc.visit_selected_leaves_mut(selection, &mut |leaf, reach| {
        if reach.locked {
            diagnostics.skip(Phase::Contour, Some(leaf.id), ItemError::Locked(leaf.id));
            return;
        }
        leaf.filled = false;
        leaf.stroked = true;
        leaf.stroke_color = Some(color.clone());
        painted += 1;
    });
    painted
}
