//! Macro Interface - Recorded Actions Behind a Trait
//!
//! Offsetting, boolean union and outlining are host features invoked as
//! recorded actions. The pipeline only sees [`MacroPlayer`]; a host bridge
//! implements it for real, [`GeometryPlayer`] implements it on the
//! in-memory model from JSON action files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::document::{Document, ItemError, Selection};
use crate::geometry::{walk_leaves, CompoundPath, LeafKind, PageItem};

#[derive(Debug, Error)]
pub enum MacroError {
    #[error("Action file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read action file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid action file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Action set '{0}' is not loaded")]
    NotLoaded(String),

    #[error("Action set '{set}' has no action '{procedure}'")]
    UnknownProcedure { set: String, procedure: String },

    #[error("Action '{procedure}' failed: {reason}")]
    Playback { procedure: String, reason: String },

    #[error("Action '{procedure}' failed: {source}")]
    Item {
        procedure: String,
        #[source]
        source: ItemError,
    },
}

/// A loaded action file, named by its set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSet {
    pub name: String,
    pub path: PathBuf,
}

pub trait MacroPlayer {
    fn load(&mut self, path: &Path) -> Result<ActionSet, MacroError>;

    /// Run `procedure` from `set` against the current selection.
    fn play(
        &mut self,
        doc: &mut Document,
        selection: &Selection,
        set: &ActionSet,
        procedure: &str,
    ) -> Result<(), MacroError>;

    fn unload(&mut self, set: &ActionSet) -> Result<(), MacroError>;
}

/// `Some(path)` only when a configured path points at an existing file.
pub fn resolve(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| p.is_file())
}

/// Load, play and unload. Unload is attempted whenever load succeeded.
pub fn run_macro<P: MacroPlayer + ?Sized>(
    player: &mut P,
    doc: &mut Document,
    selection: &Selection,
    path: &Path,
    procedure: &str,
) -> Result<(), MacroError> {
    let set = player.load(path)?;
    tracing::debug!(set = %set.name, procedure, selected = selection.len(), "playing action");
    let played = player.play(doc, selection, &set, procedure);
    let unloaded = player.unload(&set);
    played?;
    unloaded
}

// --- Action files ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFile {
    pub set: String,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    #[serde(flatten)]
    pub op: ActionOp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ActionOp {
    OutlineText,
    OutlineStroke,
    /// Grow every selected shape outward by `distance` points
    Offset { distance: f64 },
    Union,
}

impl ActionFile {
    pub fn load(path: &Path) -> Result<Self, MacroError> {
        if !path.is_file() {
            return Err(MacroError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| MacroError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| MacroError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Plays action files directly on the document model.
#[derive(Debug, Default)]
pub struct GeometryPlayer {
    loaded: HashMap<String, ActionFile>,
}

impl GeometryPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MacroPlayer for GeometryPlayer {
    fn load(&mut self, path: &Path) -> Result<ActionSet, MacroError> {
        let file = ActionFile::load(path)?;
        let set = ActionSet {
            name: file.set.clone(),
            path: path.to_path_buf(),
        };
        self.loaded.insert(file.set.clone(), file);
        Ok(set)
    }

    fn play(
        &mut self,
        doc: &mut Document,
        selection: &Selection,
        set: &ActionSet,
        procedure: &str,
    ) -> Result<(), MacroError> {
        let file = self
            .loaded
            .get(&set.name)
            .ok_or_else(|| MacroError::NotLoaded(set.name.clone()))?;
        let spec = file
            .actions
            .iter()
            .find(|a| a.name == procedure)
            .ok_or_else(|| MacroError::UnknownProcedure {
                set: set.name.clone(),
                procedure: procedure.to_string(),
            })?;

        match spec.op {
            ActionOp::OutlineText => outline_text(doc, selection),
            ActionOp::OutlineStroke => outline_stroke(doc, selection),
            ActionOp::Offset { distance } => offset(doc, selection, distance),
            ActionOp::Union => union(doc, selection, procedure)?,
        }
        Ok(())
    }

    fn unload(&mut self, set: &ActionSet) -> Result<(), MacroError> {
        self.loaded
            .remove(&set.name)
            .map(|_| ())
            .ok_or_else(|| MacroError::NotLoaded(set.name.clone()))
    }
}

fn outline_text(doc: &mut Document, selection: &Selection) {
    doc.visit_selected_leaves_mut(selection, &mut |leaf, reach| {
        if leaf.kind == LeafKind::Text && !reach.locked {
            leaf.kind = LeafKind::Path;
        }
    });
}

fn outline_stroke(doc: &mut Document, selection: &Selection) {
    doc.visit_selected_leaves_mut(selection, &mut |leaf, reach| {
        if leaf.stroked && leaf.kind == LeafKind::Path && !reach.locked {
            leaf.filled = true;
            leaf.fill_color = leaf.stroke_color.take();
            leaf.stroked = false;
        }
    });
}

fn offset(doc: &mut Document, selection: &Selection, distance: f64) {
    doc.visit_selected_leaves_mut(selection, &mut |leaf, reach| {
        if !reach.locked {
            leaf.bounds = leaf.bounds.inflate(distance, distance);
        }
    });
}

/// Merge the selected top-level items of one layer into a single compound path.
fn union(doc: &mut Document, selection: &Selection, procedure: &str) -> Result<(), MacroError> {
    let playback = |reason: String| MacroError::Playback {
        procedure: procedure.to_string(),
        reason,
    };
    let first = selection
        .first()
        .ok_or_else(|| playback("nothing selected".into()))?;
    let (layer_index, insert_at) = doc
        .top_level_position(first)
        .ok_or_else(|| playback(format!("{} is not a top-level item", first)))?;
    let item_error = |source: ItemError| MacroError::Item {
        procedure: procedure.to_string(),
        source,
    };
    // Everything is checked before the first item is detached.
    for id in selection.iter() {
        match doc.top_level_position(id) {
            Some((li, ii)) if li == layer_index => {
                if doc.layers[li].items[ii].is_locked() {
                    return Err(item_error(ItemError::Locked(id)));
                }
            }
            _ => return Err(playback(format!("{} is not in the same layer", id))),
        }
    }
    let layer = doc.layers[layer_index].name.clone();
    if doc.layers[layer_index].locked {
        return Err(item_error(ItemError::LayerLocked(layer)));
    }

    let mut taken = vec![];
    for id in selection.iter() {
        taken.push(doc.take_item(id).map_err(item_error)?);
    }

    let mut paths = vec![];
    for item in &taken {
        walk_leaves(item, &mut |leaf, _| paths.push(leaf.clone()));
    }
    let mut merged = CompoundPath::new(paths);
    merged.id = doc.alloc_id();

    doc.insert_item_at(&layer, insert_at, PageItem::CompoundPath(merged))
        .map_err(item_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Color, Leaf};
    use kurbo::Rect;
    use std::io::Write;

    fn action_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    fn doc_with_squares() -> Document {
        let mut doc = Document::new("m", Rect::new(0.0, 0.0, 100.0, 100.0));
        doc.ensure_layer("L");
        doc.append_item("L", Leaf::filled_path(Rect::new(0.0, 0.0, 10.0, 10.0), Color::spot("Rouge")))
            .unwrap();
        doc.append_item("L", Leaf::stroked_path(Rect::new(5.0, 5.0, 15.0, 15.0), Color::spot("Noir")))
            .unwrap();
        doc
    }

    #[test]
    fn test_resolve_requires_existing_file() {
        let file = action_file("{}");
        assert!(resolve(Some(file.path())).is_some());
        assert!(resolve(Some(Path::new("/definitely/not/here.json"))).is_none());
        assert!(resolve(None).is_none());
    }

    #[test]
    fn test_action_file_parses_flattened_ops() {
        let file = action_file(r#"{"set": "Bleed", "actions": [{"name": "Offset", "op": "offset", "distance": 8.5}]}"#);
        let parsed = ActionFile::load(file.path()).unwrap();
        assert_eq!(parsed.actions[0].op, ActionOp::Offset { distance: 8.5 });
    }

    #[test]
    fn test_offset_inflates_selected_leaves() {
        let file = action_file(r#"{"set": "Bleed", "actions": [{"name": "Offset", "op": "offset", "distance": 2}]}"#);
        let mut doc = doc_with_squares();
        let selection = doc.select_all("L");
        run_macro(&mut GeometryPlayer::new(), &mut doc, &selection, file.path(), "Offset").unwrap();
        assert_eq!(doc.find_layer("L").unwrap().items[0].bounds(), Some(Rect::new(-2.0, -2.0, 12.0, 12.0)));
    }

    #[test]
    fn test_union_merges_into_one_compound_path() {
        let file = action_file(r#"{"set": "Cut", "actions": [{"name": "Union", "op": "union"}]}"#);
        let mut doc = doc_with_squares();
        let selection = doc.select_all("L");
        run_macro(&mut GeometryPlayer::new(), &mut doc, &selection, file.path(), "Union").unwrap();
        let layer = doc.find_layer("L").unwrap();
        assert_eq!(layer.items.len(), 1);
        assert!(matches!(&layer.items[0], PageItem::CompoundPath(c) if c.paths.len() == 2));
    }

    #[test]
    fn test_failed_union_leaves_every_item_in_place() {
        let file = action_file(r#"{"set": "Cut", "actions": [{"name": "Union", "op": "union"}]}"#);
        let mut doc = doc_with_squares();
        let ids = doc.find_layer("L").unwrap().item_ids();
        doc.find_item_mut(ids[1]).unwrap().set_locked(true);
        let selection: Selection = ids.iter().copied().collect();

        let err = run_macro(&mut GeometryPlayer::new(), &mut doc, &selection, file.path(), "Union").unwrap_err();
        assert!(matches!(err, MacroError::Item { source: ItemError::Locked(_), .. }));
        assert_eq!(doc.find_layer("L").unwrap().item_ids(), ids);
    }

    #[test]
    fn test_unknown_procedure_still_unloads() {
        let file = action_file(r#"{"set": "Cut", "actions": []}"#);
        let mut player = GeometryPlayer::new();
        let mut doc = doc_with_squares();
        let err = run_macro(&mut player, &mut doc, &Selection::new(), file.path(), "Union").unwrap_err();
        assert!(matches!(err, MacroError::UnknownProcedure { .. }));
        assert!(player.loaded.is_empty());
    }

    #[test]
    fn test_outline_stroke_moves_paint_to_fill() {
        let file = action_file(r#"{"set": "Vecto", "actions": [{"name": "VectoContour", "op": "outlineStroke"}]}"#);
        let mut doc = doc_with_squares();
        let selection = doc.select_all("L");
        run_macro(&mut GeometryPlayer::new(), &mut doc, &selection, file.path(), "VectoContour").unwrap();
        match &doc.find_layer("L").unwrap().items[1] {
            PageItem::Leaf(leaf) => {
                assert!(leaf.filled && !leaf.stroked);
                assert_eq!(leaf.fill_color, Some(Color::spot("Noir")));
            }
            other => panic!("expected leaf, got {:?}", other),
        }
    }
}
