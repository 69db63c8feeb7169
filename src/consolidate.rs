//! Artwork Consolidator
//!
//! Wraps everything on the Artwork layer in one group, resizes that group
//! to the target box and derives the artboard from it.

use kurbo::{Affine, Rect, Vec2};

use crate::config::{PipelineOptions, ResizeMode};
use crate::diagnostics::{Diagnostics, Phase};
use crate::document::Document;
use crate::geometry::ItemId;
use crate::pipeline::PipelineError;
use crate::print::{mm_to_pt, ProductionLayer};

/// Group, resize, then fit the artboard. Returns the group, if any art existed.
pub fn consolidate(
    doc: &mut Document,
    options: &PipelineOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Option<ItemId>, PipelineError> {
    let artwork = ProductionLayer::Artwork.name();
    let snapshot = doc
        .find_layer(artwork)
        .map(|layer| layer.item_ids())
        .unwrap_or_default();
    if snapshot.is_empty() {
        tracing::info!("artwork layer is empty, nothing to consolidate");
        return Ok(None);
    }

    let group = doc
        .create_group(artwork)
        .map_err(|e| PipelineError::Grouping(e.to_string()))?;
    for id in snapshot.into_iter().rev() {
        doc.move_into_group(id, group)
            .map_err(|e| PipelineError::Grouping(format!("cannot move {} into the artwork group: {}", id, e)))?;
    }

    resize_group(doc, group, options)?;
    fit_artboard(doc, group, mm_to_pt(options.artboard_margin_mm), diagnostics);
    Ok(Some(group))
}

/// Affine taking `bounds` to `target` x `target`, anchored at the top-left corner.
pub fn resize_transform(bounds: Rect, target: f64, mode: ResizeMode) -> Option<Affine> {
    let (w, h) = (bounds.width(), bounds.height());
    if !(w > 0.0 && h > 0.0) || !w.is_finite() || !h.is_finite() {
        return None;
    }
    let (sx, sy) = match mode {
        ResizeMode::Stretch => (target / w, target / h),
        ResizeMode::Uniform => {
            let s = (target / w).min(target / h);
            (s, s)
        }
    };
    let anchor = Vec2::new(bounds.x0, bounds.y1);
    Some(Affine::translate(anchor) * Affine::scale_non_uniform(sx, sy) * Affine::translate(-anchor))
}

fn resize_group(doc: &mut Document, group: ItemId, options: &PipelineOptions) -> Result<(), PipelineError> {
    let item = doc
        .find_item_mut(group)
        .ok_or_else(|| PipelineError::Consolidation(format!("artwork group {} vanished", group)))?;
    let bounds = item
        .bounds()
        .ok_or_else(|| PipelineError::Consolidation("artwork group has no geometry to resize".into()))?;
    let affine = resize_transform(bounds, options.target_size, options.resize_mode).ok_or_else(|| {
        PipelineError::Consolidation(format!(
            "cannot resize artwork of {:.3} x {:.3} pt",
            bounds.width(),
            bounds.height()
        ))
    })?;

    item.transform(affine);
    tracing::info!(
        from_w = bounds.width(),
        from_h = bounds.height(),
        target = options.target_size,
        mode = ?options.resize_mode,
        "artwork resized"
    );
    Ok(())
}

fn fit_artboard(doc: &mut Document, group: ItemId, margin: f64, diagnostics: &mut Diagnostics) {
    let visible = doc.find_item(group).and_then(|item| item.visible_bounds());
    match visible {
        // left -= m, right += m, top += m, bottom -= m
        Some(bounds) => {
            doc.artboard = bounds.inflate(margin, margin);
            tracing::info!(artboard = ?doc.artboard, "artboard fitted");
        }
        None => diagnostics.skip(
            Phase::Consolidate,
            Some(group),
            "artwork has no visible bounds, artboard left unchanged",
        ),
    }
}
