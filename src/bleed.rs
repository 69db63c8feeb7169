//! Bleed Expansion Step
//!
//! Grows the filtered bleed geometry outward through the offset action.
//! Unlike the other macro steps, a failure here is returned to the caller:
//! a bleed layer that was never offset is not a bleed.

use std::path::Path;

use crate::document::{Document, Selection};
use crate::macros::{resolve, run_macro, MacroError, MacroPlayer};

/// Returns whether the offset action actually ran.
pub fn apply_offset<P: MacroPlayer + ?Sized>(
    doc: &mut Document,
    selection: &Selection,
    player: &mut P,
    offset_action: Option<&Path>,
    procedure: &str,
) -> Result<bool, MacroError> {
    if selection.is_empty() {
        tracing::info!("bleed selection is empty, offset skipped");
        return Ok(false);
    }
    let Some(path) = resolve(offset_action) else {
        tracing::info!(path = ?offset_action, "offset action not available, offset skipped");
        return Ok(false);
    };

    run_macro(player, doc, selection, path, procedure)?;
    tracing::info!(items = selection.len(), "bleed offset applied");
    Ok(true)
}
