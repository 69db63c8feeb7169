//! Geometry Tree Model - Leaves, Groups, Compound Paths
//!
//! Every phase of the pipeline walks the same recursive item tree.
//! Traversal lives here, once, so the background filter and the contour
//! recolor step cannot disagree about what a "leaf" is.

use std::fmt;

use kurbo::{Affine, Rect};
use serde::{Deserialize, Serialize};

/// Opaque handle to an item inside a [`crate::Document`].
///
/// Handles are allocated by the document and never reused within it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Paint applied to a fill or a stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Color {
    /// Process color, each channel in [0, 100]
    Cmyk {
        cyan: f64,
        magenta: f64,
        yellow: f64,
        black: f64,
    },
    /// Named ink
    Spot { name: String },
    /// Gradient, pattern or any paint that is neither CMYK nor spot
    Unsupported { kind: String },
}

impl Color {
    pub fn cmyk(cyan: f64, magenta: f64, yellow: f64, black: f64) -> Self {
        Self::Cmyk { cyan, magenta, yellow, black }
    }

    pub fn spot(name: impl Into<String>) -> Self {
        Self::Spot { name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafKind {
    #[default]
    Path,
    Text,
}

/// A paintable shape: a path, a sub-path of a compound path, or a text frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaf {
    #[serde(default)]
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: LeafKind,
    /// Geometric bounds in points, y axis up (`y1` is the top edge)
    pub bounds: Rect,
    #[serde(default)]
    pub filled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    #[serde(default)]
    pub stroked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<Color>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl Leaf {
    /// Filled, unstroked path.
    pub fn filled_path(bounds: Rect, fill: Color) -> Self {
        Self {
            id: ItemId::default(),
            name: None,
            kind: LeafKind::Path,
            bounds,
            filled: true,
            fill_color: Some(fill),
            stroked: false,
            stroke_color: None,
            locked: false,
            hidden: false,
        }
    }

    pub fn stroked_path(bounds: Rect, stroke: Color) -> Self {
        Self {
            id: ItemId::default(),
            name: None,
            kind: LeafKind::Path,
            bounds,
            filled: false,
            fill_color: None,
            stroked: true,
            stroke_color: Some(stroke),
            locked: false,
            hidden: false,
        }
    }

    pub fn text(bounds: Rect, fill: Color) -> Self {
        Self {
            kind: LeafKind::Text,
            ..Self::filled_path(bounds, fill)
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub children: Vec<PageItem>,
}

impl Group {
    pub fn new(children: Vec<PageItem>) -> Self {
        Self {
            id: ItemId::default(),
            name: None,
            locked: false,
            hidden: false,
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundPath {
    #[serde(default)]
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub paths: Vec<Leaf>,
}

impl CompoundPath {
    pub fn new(paths: Vec<Leaf>) -> Self {
        Self {
            id: ItemId::default(),
            name: None,
            locked: false,
            hidden: false,
            paths,
        }
    }
}

/// A node of the artwork tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageItem {
    Leaf(Leaf),
    Group(Group),
    CompoundPath(CompoundPath),
}

impl From<Leaf> for PageItem {
    fn from(leaf: Leaf) -> Self {
        Self::Leaf(leaf)
    }
}

impl From<Group> for PageItem {
    fn from(group: Group) -> Self {
        Self::Group(group)
    }
}

impl From<CompoundPath> for PageItem {
    fn from(path: CompoundPath) -> Self {
        Self::CompoundPath(path)
    }
}

/// Effective lock/visibility of a node, inherited from its ancestors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reach {
    pub locked: bool,
    pub hidden: bool,
}

impl Reach {
    fn enter(self, locked: bool, hidden: bool) -> Self {
        Self {
            locked: self.locked || locked,
            hidden: self.hidden || hidden,
        }
    }
}

impl PageItem {
    pub fn id(&self) -> ItemId {
        match self {
            Self::Leaf(l) => l.id,
            Self::Group(g) => g.id,
            Self::CompoundPath(c) => c.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Leaf(l) => l.name.as_deref(),
            Self::Group(g) => g.name.as_deref(),
            Self::CompoundPath(c) => c.name.as_deref(),
        }
    }

    pub fn is_locked(&self) -> bool {
        match self {
            Self::Leaf(l) => l.locked,
            Self::Group(g) => g.locked,
            Self::CompoundPath(c) => c.locked,
        }
    }

    pub fn is_hidden(&self) -> bool {
        match self {
            Self::Leaf(l) => l.hidden,
            Self::Group(g) => g.hidden,
            Self::CompoundPath(c) => c.hidden,
        }
    }

    pub fn set_locked(&mut self, locked: bool) {
        match self {
            Self::Leaf(l) => l.locked = locked,
            Self::Group(g) => g.locked = locked,
            Self::CompoundPath(c) => c.locked = locked,
        }
    }

    /// Union of all leaf bounds, hidden ones included.
    pub fn bounds(&self) -> Option<Rect> {
        let mut acc: Option<Rect> = None;
        walk_leaves(self, &mut |leaf, _| {
            acc = Some(acc.map_or(leaf.bounds, |r| r.union(leaf.bounds)));
        });
        acc
    }

    /// Union of the bounds of leaves that are actually drawn.
    pub fn visible_bounds(&self) -> Option<Rect> {
        let mut acc: Option<Rect> = None;
        walk_leaves(self, &mut |leaf, reach| {
            if !reach.hidden {
                acc = Some(acc.map_or(leaf.bounds, |r| r.union(leaf.bounds)));
            }
        });
        acc
    }

    pub fn transform(&mut self, affine: Affine) {
        walk_leaves_mut(self, &mut |leaf, _| {
            leaf.bounds = affine.transform_rect_bbox(leaf.bounds);
        });
    }

    /// True if `id` names this item or anything below it, sub-paths included.
    pub fn contains(&self, id: ItemId) -> bool {
        if self.id() == id {
            return true;
        }
        match self {
            Self::Leaf(_) => false,
            Self::Group(g) => g.children.iter().any(|c| c.contains(id)),
            Self::CompoundPath(c) => c.paths.iter().any(|p| p.id == id),
        }
    }

    pub fn leaf_count(&self) -> usize {
        let mut n = 0;
        walk_leaves(self, &mut |_, _| n += 1);
        n
    }
}

/// Pre-order, depth-first walk over every leaf reachable from `item`.
///
/// Groups recurse into children, compound paths into their sub-paths,
/// and a leaf visits itself.
pub fn walk_leaves<'a, F>(item: &'a PageItem, visit: &mut F)
where
    F: FnMut(&'a Leaf, Reach),
{
    walk_leaves_from(item, Reach::default(), visit);
}

pub fn walk_leaves_from<'a, F>(item: &'a PageItem, reach: Reach, visit: &mut F)
where
    F: FnMut(&'a Leaf, Reach),
{
    match item {
        PageItem::Leaf(leaf) => visit(leaf, reach.enter(leaf.locked, leaf.hidden)),
        PageItem::Group(group) => {
            let inner = reach.enter(group.locked, group.hidden);
            for child in &group.children {
                walk_leaves_from(child, inner, visit);
            }
        }
        PageItem::CompoundPath(path) => {
            let inner = reach.enter(path.locked, path.hidden);
            for sub in &path.paths {
                visit(sub, inner.enter(sub.locked, sub.hidden));
            }
        }
    }
}

pub fn walk_leaves_mut<F>(item: &mut PageItem, visit: &mut F)
where
    F: FnMut(&mut Leaf, Reach),
{
    walk_leaves_mut_from(item, Reach::default(), visit);
}

pub fn walk_leaves_mut_from<F>(item: &mut PageItem, reach: Reach, visit: &mut F)
where
    F: FnMut(&mut Leaf, Reach),
{
    match item {
        PageItem::Leaf(leaf) => {
            let r = reach.enter(leaf.locked, leaf.hidden);
            visit(leaf, r);
        }
        PageItem::Group(group) => {
            let inner = reach.enter(group.locked, group.hidden);
            for child in &mut group.children {
                walk_leaves_mut_from(child, inner, visit);
            }
        }
        PageItem::CompoundPath(path) => {
            let inner = reach.enter(path.locked, path.hidden);
            for sub in &mut path.paths {
                let r = inner.enter(sub.locked, sub.hidden);
                visit(sub, r);
            }
        }
    }
}

/// Give every node below `item` (and `item` itself) a fresh id.
pub(crate) fn reassign_ids(item: &mut PageItem, next: &mut impl FnMut() -> ItemId) {
    match item {
        PageItem::Leaf(l) => l.id = next(),
        PageItem::Group(g) => {
            g.id = next();
            for child in &mut g.children {
                reassign_ids(child, next);
            }
        }
        PageItem::CompoundPath(c) => {
            c.id = next();
            for sub in &mut c.paths {
                sub.id = next();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Rect {
        Rect::new(x, y, x + size, y + size)
    }

    fn nested() -> PageItem {
        let mut a = Leaf::filled_path(square(0.0, 0.0, 10.0), Color::cmyk(0.0, 100.0, 100.0, 0.0));
        a.id = ItemId(2);
        let mut b = Leaf::filled_path(square(20.0, 20.0, 10.0), Color::cmyk(0.0, 0.0, 0.0, 0.0)).hidden();
        b.id = ItemId(4);
        let mut sub = Leaf::filled_path(square(-5.0, -5.0, 2.0), Color::spot("Blanc"));
        sub.id = ItemId(6);
        let mut compound = CompoundPath::new(vec![sub]);
        compound.id = ItemId(5);
        compound.locked = true;
        let mut inner = Group::new(vec![b.into(), compound.into()]);
        inner.id = ItemId(3);
        let mut outer = Group::new(vec![a.into(), inner.into()]);
        outer.id = ItemId(1);
        outer.into()
    }

    #[test]
    fn test_walk_is_preorder_depth_first() {
        let item = nested();
        let mut seen = vec![];
        walk_leaves(&item, &mut |leaf, _| seen.push(leaf.id));
        assert_eq!(seen, vec![ItemId(2), ItemId(4), ItemId(6)]);
    }

    #[test]
    fn test_reach_inherits_lock_and_visibility() {
        let item = nested();
        let mut reach = vec![];
        walk_leaves(&item, &mut |leaf, r| reach.push((leaf.id, r)));
        assert!(!reach[0].1.locked && !reach[0].1.hidden);
        assert!(reach[1].1.hidden);
        assert!(reach[2].1.locked);
    }

    #[test]
    fn test_visible_bounds_skip_hidden_leaves() {
        let item = nested();
        assert_eq!(item.bounds(), Some(Rect::new(-5.0, -5.0, 30.0, 30.0)));
        assert_eq!(item.visible_bounds(), Some(Rect::new(-5.0, -5.0, 10.0, 10.0)));
    }

    #[test]
    fn test_contains_reaches_sub_paths() {
        let item = nested();
        assert!(item.contains(ItemId(6)));
        assert!(!item.contains(ItemId(7)));
        assert_eq!(item.leaf_count(), 3);
    }

    #[test]
    fn test_transform_scales_every_leaf() {
        let mut item = nested();
        item.transform(Affine::scale(2.0));
        assert_eq!(item.bounds(), Some(Rect::new(-10.0, -10.0, 60.0, 60.0)));
    }

    #[test]
    fn test_color_serializes_tagged() {
        let json = serde_json::to_string(&Color::spot("Blanc")).unwrap();
        assert_eq!(json, r#"{"type":"spot","name":"Blanc"}"#);
    }
}
