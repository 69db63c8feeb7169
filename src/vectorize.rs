//! Vectorization - Text and Strokes to Outlines
//!
//! Optional pre-pass. Every failure is recorded and the run carries on;
//! later phases are correct with or without outlines.

use std::path::Path;

use crate::config::PipelineParams;
use crate::diagnostics::{Diagnostics, Phase};
use crate::document::{Document, Selection};
use crate::geometry::{walk_leaves, Leaf, LeafKind};
use crate::macros::{resolve, run_macro, MacroPlayer};

/// Leaves across the document that a user could select right now and that match `keep`.
fn selectable_leaves<F>(doc: &Document, keep: F) -> Selection
where
    F: Fn(&Leaf) -> bool,
{
    let mut found = Selection::new();
    for layer in doc.layers.iter().filter(|l| !l.locked && !l.hidden) {
        for item in &layer.items {
            walk_leaves(item, &mut |leaf, reach| {
                if !reach.locked && !reach.hidden && keep(leaf) {
                    found.push(leaf.id);
                }
            });
        }
    }
    found
}

pub fn text_frames(doc: &Document) -> Selection {
    selectable_leaves(doc, |leaf| leaf.kind == LeafKind::Text)
}

pub fn stroked_paths(doc: &Document) -> Selection {
    selectable_leaves(doc, |leaf| leaf.kind == LeafKind::Path && leaf.stroked)
}

pub fn vectorize<P: MacroPlayer + ?Sized>(
    doc: &mut Document,
    player: &mut P,
    params: &PipelineParams,
    diagnostics: &mut Diagnostics,
) {
    let procedures = &params.options.procedures;

    let texts = text_frames(doc);
    outline(doc, player, &texts, params.vecto_texte_action_path.as_deref(), &procedures.outline_text, diagnostics);

    // Re-scan: outlining text may have produced new stroked paths.
    let strokes = stroked_paths(doc);
    outline(
        doc,
        player,
        &strokes,
        params.vecto_contour_action_path.as_deref(),
        &procedures.outline_stroke,
        diagnostics,
    );
}

fn outline<P: MacroPlayer + ?Sized>(
    doc: &mut Document,
    player: &mut P,
    selection: &Selection,
    action: Option<&Path>,
    procedure: &str,
    diagnostics: &mut Diagnostics,
) {
    if selection.is_empty() {
        return;
    }
    let Some(path) = resolve(action) else {
        tracing::debug!(procedure, "action not available, outlining skipped");
        return;
    };
    match run_macro(player, doc, selection, path, procedure) {
        Ok(()) => tracing::info!(procedure, items = selection.len(), "outlined"),
        Err(e) => diagnostics.skip(Phase::Vectorize, None, e),
    }
}
