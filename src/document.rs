//! Document Model - Layers, Items, Selection
//!
//! The document is the single shared mutable resource of a run. Every
//! operation here is item-level: it either succeeds or returns an
//! [`ItemError`] that the caller decides to swallow or propagate.

use std::fs;
use std::path::Path;

use kurbo::Rect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{reassign_ids, walk_leaves_mut_from, Group, ItemId, Leaf, PageItem, Reach};
use crate::DOCUMENT_FORMAT_VERSION;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ItemError {
    #[error("Item {0} not found")]
    NotFound(ItemId),

    #[error("Item {0} is locked")]
    Locked(ItemId),

    #[error("Item {0} is hidden")]
    Hidden(ItemId),

    #[error("Item {0} is not a group")]
    NotAGroup(ItemId),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer is locked: {0}")]
    LayerLocked(String),

    #[error("Item {0} has an unreadable {1} paint")]
    UnreadableColor(ItemId, String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid document format version: {0}")]
    InvalidVersion(String),

    #[error("Document format {found} is not supported, engine reads up to {supported}")]
    UnsupportedVersion { found: String, supported: String },
}

/// Where a moved or duplicated item lands in its new container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Frontmost position (index 0)
    Beginning,
    End,
}

/// Item handles currently selected, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    items: Vec<ItemId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn first(&self) -> Option<ItemId> {
        self.items.first().copied()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains(&id)
    }

    pub fn push(&mut self, id: ItemId) {
        if !self.contains(id) {
            self.items.push(id);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().copied()
    }
}

impl FromIterator<ItemId> for Selection {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for id in iter {
            selection.push(id);
        }
        selection
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub name: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
    /// Front-to-back; index 0 is the frontmost item
    #[serde(default)]
    pub items: Vec<PageItem>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locked: false,
            hidden: false,
            items: vec![],
        }
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(PageItem::id).collect()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.iter().any(|item| item.contains(id))
    }
}

/// An open vector document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default = "default_format_version")]
    pub format_version: String,
    #[serde(default)]
    pub name: String,
    /// Active artboard, y axis up
    pub artboard: Rect,
    /// Front-to-back; index 0 is the topmost layer
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(skip)]
    next_id: u64,
}

fn default_format_version() -> String {
    DOCUMENT_FORMAT_VERSION.to_string()
}

impl Document {
    pub fn new(name: impl Into<String>, artboard: Rect) -> Self {
        Self {
            format_version: default_format_version(),
            name: name.into(),
            artboard,
            layers: vec![],
            next_id: 0,
        }
    }

    /// Parse a document and assign fresh handles to every item.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let mut doc: Document = serde_json::from_str(json)?;
        doc.check_format_version()?;
        doc.renumber();
        Ok(doc)
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn check_format_version(&self) -> Result<(), DocumentError> {
        let found = semver::Version::parse(&self.format_version)
            .map_err(|_| DocumentError::InvalidVersion(self.format_version.clone()))?;
        let supported = semver::Version::parse(DOCUMENT_FORMAT_VERSION)
            .map_err(|_| DocumentError::InvalidVersion(DOCUMENT_FORMAT_VERSION.to_string()))?;

        if found.major != supported.major || found > supported {
            return Err(DocumentError::UnsupportedVersion {
                found: self.format_version.clone(),
                supported: DOCUMENT_FORMAT_VERSION.to_string(),
            });
        }
        Ok(())
    }

    fn renumber(&mut self) {
        let mut next = 0;
        let mut alloc = || {
            next += 1;
            ItemId(next)
        };
        for layer in &mut self.layers {
            for item in &mut layer.items {
                reassign_ids(item, &mut alloc);
            }
        }
        self.next_id = next;
    }

    pub fn alloc_id(&mut self) -> ItemId {
        self.next_id += 1;
        ItemId(self.next_id)
    }

    /// Insert a freshly built item, giving it and its descendants new handles.
    pub fn add_item(&mut self, layer: &str, item: impl Into<PageItem>) -> Result<ItemId, ItemError> {
        let mut item = item.into();
        self.adopt(&mut item);
        let id = item.id();
        self.insert_item(layer, Placement::Beginning, item)?;
        Ok(id)
    }

    /// Like [`Document::add_item`], but behind everything already in `layer`.
    pub fn append_item(&mut self, layer: &str, item: impl Into<PageItem>) -> Result<ItemId, ItemError> {
        let mut item = item.into();
        self.adopt(&mut item);
        let id = item.id();
        self.insert_item(layer, Placement::End, item)?;
        Ok(id)
    }

    fn adopt(&mut self, item: &mut PageItem) {
        let mut next = self.next_id;
        reassign_ids(item, &mut || {
            next += 1;
            ItemId(next)
        });
        self.next_id = next;
    }

    // --- Layers ---

    pub fn find_layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn find_layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// Existing layer, or a new one added on top of the stack.
    pub fn ensure_layer(&mut self, name: &str) -> &mut Layer {
        let index = match self.layer_index(name) {
            Some(index) => index,
            None => {
                self.layers.insert(0, Layer::new(name));
                0
            }
        };
        &mut self.layers[index]
    }

    /// Delete a layer together with whatever it still holds.
    pub fn remove_layer(&mut self, name: &str) -> Result<Layer, ItemError> {
        let index = self
            .layer_index(name)
            .ok_or_else(|| ItemError::LayerNotFound(name.to_string()))?;
        if self.layers[index].locked {
            return Err(ItemError::LayerLocked(name.to_string()));
        }
        Ok(self.layers.remove(index))
    }

    pub fn set_layer_locked(&mut self, name: &str, locked: bool) -> Result<(), ItemError> {
        let layer = self
            .find_layer_mut(name)
            .ok_or_else(|| ItemError::LayerNotFound(name.to_string()))?;
        layer.locked = locked;
        Ok(())
    }

    pub fn send_layer_to_front(&mut self, name: &str) -> Result<(), ItemError> {
        let index = self.require_layer(name)?;
        let layer = self.layers.remove(index);
        self.layers.insert(0, layer);
        Ok(())
    }

    pub fn send_layer_to_back(&mut self, name: &str) -> Result<(), ItemError> {
        let index = self.require_layer(name)?;
        let layer = self.layers.remove(index);
        self.layers.push(layer);
        Ok(())
    }

    /// Move `name` so it sits directly behind `anchor`.
    pub fn place_layer_behind(&mut self, name: &str, anchor: &str) -> Result<(), ItemError> {
        let index = self.require_layer(name)?;
        self.require_layer(anchor)?;
        let layer = self.layers.remove(index);
        let anchor_index = self.require_layer(anchor)?;
        self.layers.insert(anchor_index + 1, layer);
        Ok(())
    }

    fn require_layer(&self, name: &str) -> Result<usize, ItemError> {
        self.layer_index(name)
            .ok_or_else(|| ItemError::LayerNotFound(name.to_string()))
    }

    fn unlocked_layer_mut(&mut self, name: &str) -> Result<&mut Layer, ItemError> {
        let layer = self
            .find_layer_mut(name)
            .ok_or_else(|| ItemError::LayerNotFound(name.to_string()))?;
        if layer.locked {
            return Err(ItemError::LayerLocked(name.to_string()));
        }
        Ok(layer)
    }

    // --- Items ---

    /// Index of the layer holding `id` anywhere in its tree.
    pub fn layer_of(&self, id: ItemId) -> Option<usize> {
        self.layers.iter().position(|l| l.contains(id))
    }

    /// `(layer index, item index)` when `id` is a direct child of a layer.
    pub fn top_level_position(&self, id: ItemId) -> Option<(usize, usize)> {
        self.layers.iter().enumerate().find_map(|(li, layer)| {
            layer
                .items
                .iter()
                .position(|item| item.id() == id)
                .map(|ii| (li, ii))
        })
    }

    pub fn find_item(&self, id: ItemId) -> Option<&PageItem> {
        self.layers.iter().find_map(|l| find_in(&l.items, id))
    }

    pub fn find_item_mut(&mut self, id: ItemId) -> Option<&mut PageItem> {
        self.layers.iter_mut().find_map(|l| find_in_mut(&mut l.items, id))
    }

    pub fn insert_item(
        &mut self,
        layer: &str,
        placement: Placement,
        item: PageItem,
    ) -> Result<(), ItemError> {
        let layer = self.unlocked_layer_mut(layer)?;
        match placement {
            Placement::Beginning => layer.items.insert(0, item),
            Placement::End => layer.items.push(item),
        }
        Ok(())
    }

    pub fn insert_item_at(&mut self, layer: &str, index: usize, item: PageItem) -> Result<(), ItemError> {
        let layer = self.unlocked_layer_mut(layer)?;
        let index = index.min(layer.items.len());
        layer.items.insert(index, item);
        Ok(())
    }

    /// Detach an item (not a sub-path) from wherever it lives.
    pub fn take_item(&mut self, id: ItemId) -> Result<PageItem, ItemError> {
        let li = self.layer_of(id).ok_or(ItemError::NotFound(id))?;
        let layer = &mut self.layers[li];
        if layer.locked {
            return Err(ItemError::LayerLocked(layer.name.clone()));
        }
        detach_in(&mut layer.items, id, false).unwrap_or(Err(ItemError::NotFound(id)))
    }

    pub fn move_item(&mut self, id: ItemId, target: &str, placement: Placement) -> Result<(), ItemError> {
        self.unlocked_layer_mut(target)?;
        let item = self.take_item(id)?;
        self.insert_item(target, placement, item)
    }

    /// Move an item into `group` at the front of its children.
    pub fn move_into_group(&mut self, id: ItemId, group: ItemId) -> Result<(), ItemError> {
        if self.find_item(id).map_or(false, |item| item.contains(group)) {
            return Err(ItemError::NotAGroup(group));
        }
        match self.find_item(group) {
            Some(PageItem::Group(g)) if g.locked => return Err(ItemError::Locked(group)),
            Some(PageItem::Group(_)) => {}
            Some(_) => return Err(ItemError::NotAGroup(group)),
            None => return Err(ItemError::NotFound(group)),
        }
        let li = self.layer_of(group).ok_or(ItemError::NotFound(group))?;
        if self.layers[li].locked {
            return Err(ItemError::LayerLocked(self.layers[li].name.clone()));
        }
        let item = self.take_item(id)?;
        match self.find_item_mut(group) {
            Some(PageItem::Group(g)) => {
                g.children.insert(0, item);
                Ok(())
            }
            _ => Err(ItemError::NotFound(group)),
        }
    }

    /// Copy an item, with fresh handles, into `target`.
    pub fn duplicate_item(&mut self, id: ItemId, target: &str, placement: Placement) -> Result<ItemId, ItemError> {
        self.unlocked_layer_mut(target)?;
        let mut copy = self.find_item(id).cloned().ok_or(ItemError::NotFound(id))?;
        self.adopt(&mut copy);
        let new_id = copy.id();
        self.insert_item(target, placement, copy)?;
        Ok(new_id)
    }

    /// Delete an item or a compound sub-path.
    pub fn remove_item(&mut self, id: ItemId) -> Result<(), ItemError> {
        let li = self.layer_of(id).ok_or(ItemError::NotFound(id))?;
        let layer = &mut self.layers[li];
        if layer.locked {
            return Err(ItemError::LayerLocked(layer.name.clone()));
        }
        remove_in(&mut layer.items, id, false).unwrap_or(Err(ItemError::NotFound(id)))
    }

    /// New empty group at the front of `layer`.
    pub fn create_group(&mut self, layer: &str) -> Result<ItemId, ItemError> {
        self.unlocked_layer_mut(layer)?;
        let id = self.alloc_id();
        let mut group = Group::new(vec![]);
        group.id = id;
        self.insert_item(layer, Placement::Beginning, group.into())?;
        Ok(id)
    }

    // --- Selection ---

    /// Top-level items of `layer` that can be selected.
    pub fn select_all(&self, layer: &str) -> Selection {
        match self.find_layer(layer) {
            Some(l) if !l.locked && !l.hidden => l
                .items
                .iter()
                .filter(|item| !item.is_locked() && !item.is_hidden())
                .map(PageItem::id)
                .collect(),
            _ => Selection::new(),
        }
    }

    /// Selection holding only `id`, if the item can be selected.
    pub fn select(&self, id: ItemId) -> Result<Selection, ItemError> {
        let li = self.layer_of(id).ok_or(ItemError::NotFound(id))?;
        let layer = &self.layers[li];
        if layer.locked {
            return Err(ItemError::LayerLocked(layer.name.clone()));
        }
        let item = self.find_item(id).ok_or(ItemError::NotFound(id))?;
        if item.is_locked() {
            return Err(ItemError::Locked(id));
        }
        if item.is_hidden() || layer.hidden {
            return Err(ItemError::Hidden(id));
        }
        Ok([id].into_iter().collect())
    }

    /// Visit every leaf reachable from each selected handle.
    ///
    /// Handles may name top-level items, nested items or compound sub-paths.
    pub fn visit_selected_leaves_mut<F>(&mut self, selection: &Selection, visit: &mut F)
    where
        F: FnMut(&mut Leaf, Reach),
    {
        for id in selection.iter() {
            for layer in &mut self.layers {
                let reach = Reach {
                    locked: layer.locked,
                    hidden: layer.hidden,
                };
                if visit_node_mut(&mut layer.items, id, reach, visit) {
                    break;
                }
            }
        }
    }
}

fn find_in(items: &[PageItem], id: ItemId) -> Option<&PageItem> {
    for item in items {
        if item.id() == id {
            return Some(item);
        }
        if let PageItem::Group(g) = item {
            if let Some(found) = find_in(&g.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_in_mut(items: &mut [PageItem], id: ItemId) -> Option<&mut PageItem> {
    for item in items {
        if item.id() == id {
            return Some(item);
        }
        if let PageItem::Group(g) = item {
            if let Some(found) = find_in_mut(&mut g.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn detach_in(items: &mut Vec<PageItem>, id: ItemId, ancestor_locked: bool) -> Option<Result<PageItem, ItemError>> {
    for index in 0..items.len() {
        let locked = ancestor_locked || items[index].is_locked();
        if items[index].id() == id {
            if locked {
                return Some(Err(ItemError::Locked(id)));
            }
            return Some(Ok(items.remove(index)));
        }
        if let PageItem::Group(g) = &mut items[index] {
            if let Some(result) = detach_in(&mut g.children, id, locked) {
                return Some(result);
            }
        }
    }
    None
}

fn remove_in(items: &mut Vec<PageItem>, id: ItemId, ancestor_locked: bool) -> Option<Result<(), ItemError>> {
    for index in 0..items.len() {
        let locked = ancestor_locked || items[index].is_locked();
        if items[index].id() == id {
            if locked {
                return Some(Err(ItemError::Locked(id)));
            }
            items.remove(index);
            return Some(Ok(()));
        }
        match &mut items[index] {
            PageItem::Group(g) => {
                if let Some(result) = remove_in(&mut g.children, id, locked) {
                    return Some(result);
                }
            }
            PageItem::CompoundPath(c) => {
                if let Some(pos) = c.paths.iter().position(|p| p.id == id) {
                    if locked || c.paths[pos].locked {
                        return Some(Err(ItemError::Locked(id)));
                    }
                    c.paths.remove(pos);
                    return Some(Ok(()));
                }
            }
            PageItem::Leaf(_) => {}
        }
    }
    None
}

fn visit_node_mut<F>(items: &mut [PageItem], id: ItemId, reach: Reach, visit: &mut F) -> bool
where
    F: FnMut(&mut Leaf, Reach),
{
    for item in items {
        if item.id() == id {
            walk_leaves_mut_from(item, reach, visit);
            return true;
        }
        let inner = Reach {
            locked: reach.locked || item.is_locked(),
            hidden: reach.hidden || item.is_hidden(),
        };
        match item {
            PageItem::Group(g) => {
                if visit_node_mut(&mut g.children, id, inner, visit) {
                    return true;
                }
            }
            PageItem::CompoundPath(c) => {
                if let Some(sub) = c.paths.iter_mut().find(|p| p.id == id) {
                    let r = Reach {
                        locked: inner.locked || sub.locked,
                        hidden: inner.hidden || sub.hidden,
                    };
                    visit(sub, r);
                    return true;
                }
            }
            PageItem::Leaf(_) => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Color, CompoundPath};

    fn red() -> Color {
        Color::cmyk(0.0, 100.0, 100.0, 0.0)
    }

    fn doc_with_layer() -> Document {
        let mut doc = Document::new("test", Rect::new(0.0, 0.0, 100.0, 100.0));
        doc.ensure_layer("L");
        doc
    }

    #[test]
    fn test_ensure_layer_adds_on_top_once() {
        let mut doc = doc_with_layer();
        doc.ensure_layer("M");
        doc.ensure_layer("M");
        assert_eq!(doc.layer_names(), vec!["M", "L"]);
    }

    #[test]
    fn test_locked_item_cannot_be_moved() {
        let mut doc = doc_with_layer();
        doc.ensure_layer("T");
        let id = doc
            .add_item("L", Leaf::filled_path(Rect::new(0.0, 0.0, 1.0, 1.0), red()).locked())
            .unwrap();
        assert_eq!(doc.move_item(id, "T", Placement::Beginning), Err(ItemError::Locked(id)));
        assert!(doc.find_layer("L").unwrap().contains(id));
    }

    #[test]
    fn test_duplicate_gets_fresh_handles() {
        let mut doc = doc_with_layer();
        doc.ensure_layer("T");
        let group = Group::new(vec![Leaf::filled_path(Rect::new(0.0, 0.0, 1.0, 1.0), red()).into()]);
        let id = doc.add_item("L", group).unwrap();
        let copy = doc.duplicate_item(id, "T", Placement::Beginning).unwrap();
        assert_ne!(id, copy);
        let original_leaf = match doc.find_item(id).unwrap() {
            PageItem::Group(g) => g.children[0].id(),
            _ => unreachable!(),
        };
        assert!(!doc.find_layer("T").unwrap().contains(original_leaf));
    }

    #[test]
    fn test_remove_reaches_compound_sub_paths() {
        let mut doc = doc_with_layer();
        let compound = CompoundPath::new(vec![
            Leaf::filled_path(Rect::new(0.0, 0.0, 1.0, 1.0), red()),
            Leaf::filled_path(Rect::new(2.0, 2.0, 3.0, 3.0), red()),
        ]);
        let id = doc.add_item("L", compound).unwrap();
        let sub = match doc.find_item(id).unwrap() {
            PageItem::CompoundPath(c) => c.paths[1].id,
            _ => unreachable!(),
        };
        doc.remove_item(sub).unwrap();
        match doc.find_item(id).unwrap() {
            PageItem::CompoundPath(c) => assert_eq!(c.paths.len(), 1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_locked_layer_rejects_mutation() {
        let mut doc = doc_with_layer();
        let id = doc
            .add_item("L", Leaf::filled_path(Rect::new(0.0, 0.0, 1.0, 1.0), red()))
            .unwrap();
        doc.set_layer_locked("L", true).unwrap();
        assert_eq!(doc.remove_item(id), Err(ItemError::LayerLocked("L".into())));
        assert!(doc.select_all("L").is_empty());
    }

    #[test]
    fn test_place_layer_behind_anchor() {
        let mut doc = doc_with_layer();
        doc.ensure_layer("A");
        doc.ensure_layer("B");
        doc.place_layer_behind("B", "L").unwrap();
        assert_eq!(doc.layer_names(), vec!["A", "L", "B"]);
    }

    #[test]
    fn test_rejects_newer_format() {
        let json = r#"{"formatVersion":"2.0.0","artboard":{"x0":0,"y0":0,"x1":1,"y1":1},"layers":[]}"#;
        assert!(matches!(
            Document::from_json(json),
            Err(DocumentError::UnsupportedVersion { .. })
        ));
    }
}
