//! Structure builder
//!
//! Folds node and link descriptors from the external parser into the model.
//! Every update in a parse pass carries the stamp returned by
//! [`Model::begin_update`]; [`Model::remove_obsolete`] then deletes whatever the
//! pass did not touch, which is how deletions in the source reach the model.

use kurbo::{Rect, Vec2};
use tracing::{debug, info, span, trace, warn, Level};

use super::node::remove_id;
use super::{Link, Model, Node};
use crate::core::geometry::is_placed;
use crate::core::{Id, NodeType};
use crate::layout::LayoutConfig;

/// A node record produced by the parsing layer
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor {
    /// Fully qualified, dotted name
    pub name: String,
    /// Declared parent name; `None` derives it from the dotted name
    pub parent: Option<String>,
    pub node_type: NodeType,
    pub description: Option<String>,
    pub color: Option<String>,
    pub boundary: Option<Rect>,
    pub zoom: Option<f64>,
    pub offset: Option<Vec2>,
}

impl NodeDescriptor {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            parent: None,
            node_type,
            description: None,
            color: None,
            boundary: None,
            zoom: None,
            offset: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_boundary(mut self, boundary: Rect) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Declared parent name, or the dotted prefix of the node name
    pub fn parent_name(&self) -> &str {
        match &self.parent {
            Some(parent) => parent,
            None => derived_parent_name(&self.name),
        }
    }
}

/// A link record produced by the parsing layer
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDescriptor {
    pub source: String,
    pub target: String,
    pub target_type: NodeType,
}

impl LinkDescriptor {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            target_type: NodeType::default(),
        }
    }

    pub fn with_target_type(mut self, target_type: NodeType) -> Self {
        self.target_type = target_type;
        self
    }
}

/// One record in a parser batch
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Node(NodeDescriptor),
    Link(LinkDescriptor),
}

impl From<NodeDescriptor> for Descriptor {
    fn from(value: NodeDescriptor) -> Self {
        Descriptor::Node(value)
    }
}

impl From<LinkDescriptor> for Descriptor {
    fn from(value: LinkDescriptor) -> Self {
        Descriptor::Link(value)
    }
}

/// Counts of items deleted by [`Model::remove_obsolete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemovalStats {
    pub nodes: usize,
    pub links: usize,
}

/// Parent of a dotted name: `a.b.c` -> `a.b`, `a` -> root
pub fn derived_parent_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) => &name[..pos],
        None => "",
    }
}

impl Model {
    /// Start a new parse pass and return its stamp
    pub fn begin_update(&mut self) -> u64 {
        self.stamp += 1;
        self.stamp
    }

    /// Stamp of the most recent parse pass
    pub fn current_stamp(&self) -> u64 {
        self.stamp
    }

    /// Fold one batch of descriptors into the model
    pub fn apply_batch(&mut self, batch: &[Descriptor], stamp: u64) {
        let batch_span = span!(Level::DEBUG, "apply_batch", items = batch.len(), stamp);
        let _enter = batch_span.enter();

        for descriptor in batch {
            match descriptor {
                Descriptor::Node(node) => {
                    self.add_or_update_node(node, stamp);
                }
                Descriptor::Link(link) => {
                    self.add_or_update_link(link, stamp);
                }
            }
        }
        debug!(stats = %self.stats(), "Applied batch");
    }

    /// Create the node, or refresh its mutable fields if it already exists
    pub fn add_or_update_node(&mut self, descriptor: &NodeDescriptor, stamp: u64) -> Id {
        if descriptor.name.is_empty() {
            return Id::ROOT;
        }
        let id = Id::from_name(&descriptor.name);
        let parent_id = self.ensure_node(descriptor.parent_name(), NodeType::Group, stamp);

        if self.nodes.contains_key(&id) {
            let current_parent = self.nodes.get(&id).and_then(|n| n.parent);
            if current_parent != Some(parent_id) {
                self.reparent(id, parent_id);
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                node.stamp = stamp;
                node.node_type = descriptor.node_type;
                apply_explicit_fields(node, descriptor, &self.layout_config);
            }
            trace!(node = %descriptor.name, "Updated node");
        } else {
            let mut node = Node::new(descriptor.name.clone(), descriptor.node_type, Some(parent_id));
            node.stamp = stamp;
            apply_explicit_fields(&mut node, descriptor, &self.layout_config);
            let needs_slot = !node.boundary.is_finite() || !is_placed(node.boundary);
            self.attach(node, parent_id, needs_slot);
            trace!(node = %descriptor.name, "Created node");
        }

        self.invalidate();
        id
    }

    /// Create the link unless it already exists; either way stamp it
    pub fn add_or_update_link(&mut self, descriptor: &LinkDescriptor, stamp: u64) -> Id {
        let id = Id::for_link(&descriptor.source, &descriptor.target);
        if let Some(link) = self.links.get_mut(&id) {
            link.stamp = stamp;
            let (source, target) = (link.source, link.target);
            self.touch(source, stamp);
            self.touch(target, stamp);
            return id;
        }

        let source = self.ensure_node(&descriptor.source, NodeType::default(), stamp);
        let target = self.ensure_node(&descriptor.target, descriptor.target_type, stamp);
        self.touch(source, stamp);
        self.touch(target, stamp);

        let mut link = Link::new(&descriptor.source, &descriptor.target, descriptor.target_type);
        link.stamp = stamp;
        self.links.insert(id, link);

        let first_registration = self
            .nodes
            .get_mut(&source)
            .map(|n| n.add_source_link(id))
            .unwrap_or(false);
        if let Some(node) = self.nodes.get_mut(&target) {
            node.add_target_link(id);
        }
        if first_registration {
            self.route_link(id);
        }

        trace!(source = %descriptor.source, target = %descriptor.target, "Created link");
        self.invalidate();
        id
    }

    /// Delete every link and childless node not carrying `stamp`
    ///
    /// Node deletion cascades upward through parents that became empty and
    /// were not touched either, stopping at the root.
    pub fn remove_obsolete(&mut self, stamp: u64) -> RemovalStats {
        let remove_span = span!(Level::DEBUG, "remove_obsolete", stamp);
        let _enter = remove_span.enter();

        let mut stats = RemovalStats::default();

        let obsolete_links: Vec<Id> = self
            .links
            .values()
            .filter(|l| l.stamp != stamp)
            .map(|l| l.id)
            .collect();
        for link in obsolete_links {
            if self.remove_link(link) {
                stats.links += 1;
            }
        }

        let mut candidates: Vec<Id> = self
            .nodes
            .values()
            .filter(|n| !n.is_root() && n.stamp != stamp && n.children.is_empty())
            .map(|n| n.id)
            .collect();
        candidates.sort();

        while let Some(id) = candidates.pop() {
            let removable = self
                .nodes
                .get(&id)
                .is_some_and(|n| !n.is_root() && n.stamp != stamp && n.children.is_empty());
            if !removable {
                continue;
            }
            let parent = self.remove_leaf(id);
            stats.nodes += 1;
            if let Some(parent) = parent.and_then(|p| self.nodes.get(&p)) {
                if !parent.is_root() && parent.stamp != stamp && parent.children.is_empty() {
                    candidates.push(parent.id);
                }
            }
        }

        if stats.nodes > 0 || stats.links > 0 {
            info!(nodes = stats.nodes, links = stats.links, "Removed obsolete items");
            self.invalidate();
        }
        stats
    }

    /// Remove a link, dropping lines it was the last link of
    pub fn remove_link(&mut self, id: Id) -> bool {
        let Some(link) = self.links.remove(&id) else {
            return false;
        };
        self.release_lines(id, &link.lines);
        if let Some(node) = self.nodes.get_mut(&link.source) {
            remove_id(&mut node.source_links, id);
        }
        if let Some(node) = self.nodes.get_mut(&link.target) {
            remove_id(&mut node.target_links, id);
        }
        self.invalidate();
        true
    }

    /// Resolve a node by name, creating it and its implied ancestors if needed
    fn ensure_node(&mut self, name: &str, node_type: NodeType, stamp: u64) -> Id {
        if name.is_empty() {
            return Id::ROOT;
        }
        let id = Id::from_name(name);
        if self.nodes.contains_key(&id) {
            return id;
        }
        let parent_id = self.ensure_node(derived_parent_name(name), NodeType::Group, stamp);
        let mut node = Node::new(name, node_type, Some(parent_id));
        node.stamp = stamp;
        self.attach(node, parent_id, true);
        trace!(node = name, "Created implied node");
        id
    }

    fn touch(&mut self, id: Id, stamp: u64) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.stamp = stamp;
        }
    }

    fn attach(&mut self, mut node: Node, parent_id: Id, needs_slot: bool) {
        let id = node.id;
        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.children.push(id);
            if needs_slot {
                parent.is_layout_required = true;
            }
            node.is_parent_set_hidden = parent.is_hidden();
        }
        self.nodes.insert(id, node);
    }

    /// Move a node under a new parent and re-route every link through it
    fn reparent(&mut self, id: Id, new_parent: Id) {
        if self.is_ancestor_or_self(id, new_parent) {
            warn!(node = %id, parent = %new_parent, "Refusing to move a node below itself");
            return;
        }
        let old_parent = self.nodes.get(&id).and_then(|n| n.parent);
        if let Some(old) = old_parent.and_then(|p| self.nodes.get_mut(&p)) {
            remove_id(&mut old.children, id);
        }
        let hidden = match self.nodes.get_mut(&new_parent) {
            Some(parent) => {
                parent.children.push(id);
                parent.is_layout_required = true;
                parent.is_hidden()
            }
            None => false,
        };
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(new_parent);
            node.boundary = Rect::ZERO;
            node.has_explicit_boundary = false;
            node.is_parent_set_hidden = hidden;
        }
        self.propagate_hidden(id);

        let mut subtree = self.descendants(id);
        subtree.push(id);
        let mut links: Vec<Id> = Vec::new();
        for node in subtree.iter().filter_map(|n| self.nodes.get(n)) {
            for link in node.source_links.iter().chain(node.target_links.iter()) {
                if !links.contains(link) {
                    links.push(*link);
                }
            }
        }
        for link in &links {
            self.unroute_link(*link);
            self.route_link(*link);
        }
        debug!(node = %id, rerouted = links.len(), "Re-parented node");
    }

    /// Remove a childless node together with its links and lines
    fn remove_leaf(&mut self, id: Id) -> Option<Id> {
        let node = self.nodes.get(&id)?;
        let parent = node.parent;
        let links: Vec<Id> = node
            .source_links
            .iter()
            .chain(node.target_links.iter())
            .copied()
            .collect();
        for link in links {
            self.remove_link(link);
        }
        let lines: Vec<Id> = self
            .nodes
            .get(&id)
            .map(|n| n.source_lines.iter().chain(n.target_lines.iter()).copied().collect())
            .unwrap_or_default();
        for line in lines {
            self.remove_line(line);
        }
        self.nodes.remove(&id);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            remove_id(&mut parent.children, id);
        }
        trace!(node = %id, "Removed node");
        parent
    }
}

fn apply_explicit_fields(node: &mut Node, descriptor: &NodeDescriptor, config: &LayoutConfig) {
    if let Some(description) = &descriptor.description {
        node.description = description.clone();
    }
    if let Some(color) = &descriptor.color {
        node.color = Some(color.clone());
    }
    if let Some(boundary) = descriptor.boundary {
        node.boundary = boundary;
        node.has_explicit_boundary = boundary.is_finite() && is_placed(boundary);
    }
    if let Some(zoom) = descriptor.zoom {
        node.container_zoom = config.clamp_zoom(zoom);
    }
    if let Some(offset) = descriptor.offset {
        node.container_offset = offset;
    }
}
