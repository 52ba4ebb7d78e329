//! The model registry
//!
//! Owns every node, link and line in flat id-keyed maps, the containment tree
//! rooted at [`Id::ROOT`], the layout configuration and the tile cache. All
//! access goes through a single `&mut Model`, which the [`crate::Canvas`]
//! facade guards with one mutex.

use kurbo::{Point, Rect, TranslateScale, Vec2};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

use super::{Line, Link, Node};
use crate::core::geometry::{container, identity, map_rect, placement};
use crate::core::Id;
use crate::layout::LayoutConfig;
use crate::render::TileCache;

/// Which registry an id resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Node,
    Link,
    Line,
}

/// Item counts, excluding the root node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelStats {
    pub nodes: usize,
    pub links: usize,
    pub lines: usize,
}

impl fmt::Display for ModelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} links, {} lines",
            self.nodes, self.links, self.lines
        )
    }
}

/// Registry owning the node tree, links, lines and the tile cache
#[derive(Debug)]
pub struct Model {
    pub(crate) nodes: HashMap<Id, Node>,
    pub(crate) links: HashMap<Id, Link>,
    pub(crate) lines: HashMap<Id, Line>,
    pub(crate) tiles: TileCache,
    pub(crate) layout_config: LayoutConfig,
    /// Last stamp handed out by `begin_update`
    pub(crate) stamp: u64,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Create a model containing only the root node
    pub fn new() -> Self {
        Self::with_layout_config(LayoutConfig::default())
    }

    /// Create an empty model with a specific layout configuration
    pub fn with_layout_config(layout_config: LayoutConfig) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(Id::ROOT, Node::root());
        Self {
            nodes,
            links: HashMap::new(),
            lines: HashMap::new(),
            tiles: TileCache::default(),
            layout_config,
            stamp: 0,
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn root(&self) -> &Node {
        &self.nodes[&Id::ROOT]
    }

    pub fn node(&self, id: Id) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: Id) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.get(&Id::from_name(name))
    }

    pub fn link(&self, id: Id) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn line(&self, id: Id) -> Option<&Line> {
        self.lines.get(&id)
    }

    /// Line for the ordered hop pair, if one exists
    pub fn line_between(&self, source: Id, target: Id) -> Option<&Line> {
        self.lines.get(&Id::for_line(source, target))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.values()
    }

    /// Resolve an id against the item registry
    pub fn item_kind(&self, id: Id) -> Option<ItemKind> {
        if self.nodes.contains_key(&id) {
            Some(ItemKind::Node)
        } else if self.links.contains_key(&id) {
            Some(ItemKind::Link)
        } else if self.lines.contains_key(&id) {
            Some(ItemKind::Line)
        } else {
            None
        }
    }

    pub fn contains(&self, id: Id) -> bool {
        self.item_kind(id).is_some()
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            nodes: self.nodes.len() - 1,
            links: self.links.len(),
            lines: self.lines.len(),
        }
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    /// Replace the layout configuration and schedule a fresh layout of every
    /// container that the user has not rearranged
    pub fn set_layout_config(&mut self, config: LayoutConfig) {
        self.layout_config = config;
        for node in self.nodes.values_mut() {
            if !node.children.is_empty() && !node.is_layout_customized {
                node.is_layout_required = true;
            }
        }
        self.invalidate();
    }

    pub fn tile_cache(&self) -> &TileCache {
        &self.tiles
    }

    pub(crate) fn tile_cache_mut(&mut self) -> &mut TileCache {
        &mut self.tiles
    }

    /// Drop every cached tile; called after any visible mutation
    pub fn invalidate(&mut self) {
        self.tiles.clear();
    }

    // ========================================================================
    // Tree queries
    // ========================================================================

    /// The node followed by its ancestors up to and including the root
    pub fn ancestors(&self, id: Id) -> Vec<Id> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&id);
        while let Some(node) = current {
            chain.push(node.id);
            current = node.parent.and_then(|p| self.nodes.get(&p));
        }
        chain
    }

    /// True if `ancestor` appears on `id`'s ancestor chain (self included)
    pub fn is_ancestor_or_self(&self, ancestor: Id, id: Id) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Every node below `id`, depth first, excluding `id` itself
    pub fn descendants(&self, id: Id) -> Vec<Id> {
        let mut result = Vec::new();
        let mut stack: Vec<Id> = match self.nodes.get(&id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return result,
        };
        while let Some(next) = stack.pop() {
            result.push(next);
            if let Some(node) = self.nodes.get(&next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        result
    }

    /// Lowest common ancestor: the first node on `target`'s chain that is also
    /// on `source`'s chain
    pub fn lowest_common_ancestor(&self, source: Id, target: Id) -> Option<Id> {
        let source_chain = self.ancestors(source);
        self.ancestors(target)
            .into_iter()
            .find(|id| source_chain.contains(id))
    }

    // ========================================================================
    // Coordinates
    // ========================================================================

    /// Transform from `id`'s child space into global space
    pub fn child_transform(&self, id: Id) -> Option<TranslateScale> {
        self.relative_child_transform(Id::ROOT, id)
    }

    /// Transform from `descendant`'s child space into `ancestor`'s child space
    ///
    /// Returns `None` if either id is unknown or `ancestor` is not on the chain.
    pub fn relative_child_transform(&self, ancestor: Id, descendant: Id) -> Option<TranslateScale> {
        let chain = self.ancestors(descendant);
        let depth = chain.iter().position(|id| *id == ancestor)?;
        // The root's container transform is pinned to identity
        let mut transform = identity();
        // Walk from just below the ancestor down to the descendant
        for id in chain[..depth].iter().rev() {
            let node = self.nodes.get(id)?;
            transform = transform
                * placement(node.boundary)
                * container(node.container_zoom, node.container_offset);
        }
        Some(transform)
    }

    /// Scale at which the node's boundary is drawn globally
    pub fn global_zoom(&self, id: Id) -> Option<f64> {
        let node = self.nodes.get(&id)?;
        match node.parent {
            None => Some(1.0),
            Some(parent) => self.child_transform(parent).map(|t| t.scale),
        }
    }

    /// Global position of the node's top-left corner
    pub fn global_position(&self, id: Id) -> Option<Point> {
        let node = self.nodes.get(&id)?;
        match node.parent {
            None => Some(Point::ZERO),
            Some(parent) => self
                .child_transform(parent)
                .map(|t| t * node.boundary.origin()),
        }
    }

    /// Global rectangle of the node
    pub fn global_rect(&self, id: Id) -> Option<Rect> {
        let node = self.nodes.get(&id)?;
        let parent = node.parent?;
        self.child_transform(parent)
            .map(|t| map_rect(t, node.boundary))
    }

    /// The node's own frame expressed in its child space
    pub fn inner_rect(&self, id: Id) -> Option<Rect> {
        let node = self.nodes.get(&id)?;
        let local = Rect::from_origin_size(Point::ZERO, node.boundary.size());
        let inverse = container(node.container_zoom, node.container_offset).inverse();
        Some(map_rect(inverse, local))
    }

    // ========================================================================
    // Query-and-mutate entry points (return false for unknown ids)
    // ========================================================================

    pub fn node_boundary(&self, id: Id) -> Option<Rect> {
        self.nodes.get(&id).map(|n| n.boundary)
    }

    /// Move or resize a node; marks its parent as manually arranged
    pub fn set_node_boundary(&mut self, id: Id, boundary: Rect) -> bool {
        let parent = match self.nodes.get_mut(&id) {
            Some(node) if !node.is_root() => {
                node.boundary = boundary;
                node.parent
            }
            _ => return false,
        };
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.is_layout_customized = true;
        }
        trace!(node = %id, ?boundary, "Set node boundary");
        self.invalidate();
        true
    }

    pub fn node_container(&self, id: Id) -> Option<(f64, Vec2)> {
        self.nodes
            .get(&id)
            .map(|n| (n.container_zoom, n.container_offset))
    }

    /// Set the container transform (pan/zoom inside a node)
    pub fn set_node_container(&mut self, id: Id, zoom: f64, offset: Vec2) -> bool {
        let band = (self.layout_config.min_zoom, self.layout_config.max_zoom);
        match self.nodes.get_mut(&id) {
            Some(node) if !node.is_root() => {
                node.container_zoom = zoom.clamp(band.0, band.1);
                node.container_offset = offset;
            }
            _ => return false,
        }
        self.invalidate();
        true
    }

    /// Set the user hidden flag and propagate it to all descendants
    pub fn set_node_hidden(&mut self, id: Id, hidden: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if !node.is_root() => node.is_user_set_hidden = hidden,
            _ => return false,
        }
        self.propagate_hidden(id);
        debug!(node = %id, hidden, "Changed node visibility");
        self.invalidate();
        true
    }

    pub fn is_node_hidden(&self, id: Id) -> Option<bool> {
        self.nodes.get(&id).map(Node::is_hidden)
    }

    pub(crate) fn propagate_hidden(&mut self, id: Id) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let (hidden, children) = match self.nodes.get(&current) {
                Some(node) => (node.is_hidden(), node.children.clone()),
                None => continue,
            };
            for child in children {
                if let Some(node) = self.nodes.get_mut(&child) {
                    node.is_parent_set_hidden = hidden;
                    stack.push(child);
                }
            }
        }
    }

    pub fn set_node_selected(&mut self, id: Id, selected: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => node.is_selected = selected,
            None => return false,
        }
        self.invalidate();
        true
    }

    /// Currently selected node ids
    pub fn selected_nodes(&self) -> Vec<Id> {
        let mut selected: Vec<Id> = self
            .nodes
            .values()
            .filter(|n| n.is_selected)
            .map(|n| n.id)
            .collect();
        selected.sort();
        selected
    }

    pub fn line_points(&self, id: Id) -> Option<&[Point]> {
        self.lines.get(&id).map(|l| l.points.as_slice())
    }

    /// Replace a line's user-edited middle points
    pub fn set_line_points(&mut self, id: Id, points: Vec<Point>) -> bool {
        match self.lines.get_mut(&id) {
            Some(line) => line.points = points,
            None => return false,
        }
        self.invalidate();
        true
    }

    /// A line is hidden when an endpoint is hidden or every link through it
    /// has a hidden endpoint
    pub fn is_line_hidden(&self, id: Id) -> Option<bool> {
        let line = self.lines.get(&id)?;
        let hidden = |node: Id| self.nodes.get(&node).map_or(true, Node::is_hidden);
        if hidden(line.source) || hidden(line.target) {
            return Some(true);
        }
        if line.links.is_empty() {
            return Some(false);
        }
        Some(line.links.iter().all(|link| match self.links.get(link) {
            Some(link) => hidden(link.source) || hidden(link.target),
            None => true,
        }))
    }
}
