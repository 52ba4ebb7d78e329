//! Node entity
//!
//! Nodes live in the model's flat registry. A parent owns its children through
//! the ordered `children` id list; the child keeps only a non-owning `parent`
//! id, so re-parenting is an explicit detach/attach pair.

use kurbo::{Rect, Vec2};

use crate::core::{Id, NodeType};

/// A tree entity with its own coordinate system for its children
#[derive(Debug, Clone)]
pub struct Node {
    pub id: Id,
    pub name: String,
    /// Parent back-reference; `None` only for the root
    pub parent: Option<Id>,
    pub node_type: NodeType,
    pub description: String,
    /// Explicit fill color; `None` uses the type's default
    pub color: Option<String>,
    /// Rectangle in the parent's child-coordinate space; zero area means unplaced
    pub boundary: Rect,
    /// Scale applied when mapping children into this node's local space
    pub container_zoom: f64,
    /// Translation applied after the zoom when mapping children
    pub container_offset: Vec2,
    pub children: Vec<Id>,
    pub source_links: Vec<Id>,
    pub target_links: Vec<Id>,
    pub source_lines: Vec<Id>,
    pub target_lines: Vec<Id>,
    pub is_user_set_hidden: bool,
    pub is_parent_set_hidden: bool,
    pub is_selected: bool,
    /// Children need placement before the next render
    pub is_layout_required: bool,
    /// The user moved children by hand; only new children are auto-placed
    pub is_layout_customized: bool,
    /// Boundary was supplied by a descriptor; the solver leaves it in place
    pub has_explicit_boundary: bool,
    /// Stamp of the last structure update that touched this node
    pub stamp: u64,
}

impl Node {
    pub fn new(name: impl Into<String>, node_type: NodeType, parent: Option<Id>) -> Self {
        let name = name.into();
        Self {
            id: Id::from_name(&name),
            name,
            parent,
            node_type,
            description: String::new(),
            color: None,
            boundary: Rect::ZERO,
            container_zoom: 1.0,
            container_offset: Vec2::ZERO,
            children: Vec::new(),
            source_links: Vec::new(),
            target_links: Vec::new(),
            source_lines: Vec::new(),
            target_lines: Vec::new(),
            is_user_set_hidden: false,
            is_parent_set_hidden: false,
            is_selected: false,
            is_layout_required: false,
            is_layout_customized: false,
            has_explicit_boundary: false,
            stamp: 0,
        }
    }

    /// The root node: empty name, zoom 1, no boundary semantics
    pub fn root() -> Self {
        Self::new("", NodeType::Root, None)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Hidden by the user or by an ancestor
    pub fn is_hidden(&self) -> bool {
        self.is_user_set_hidden || self.is_parent_set_hidden
    }

    /// Short display label: the last segment of a dotted name
    pub fn label(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) if pos + 1 < self.name.len() => &self.name[pos + 1..],
            _ => &self.name,
        }
    }

    /// Fill color, falling back to the type default
    pub fn fill_color(&self) -> &str {
        self.color
            .as_deref()
            .unwrap_or_else(|| self.node_type.info().color)
    }

    /// Register an outgoing link; returns false if it was already registered
    pub fn add_source_link(&mut self, link: Id) -> bool {
        push_unique(&mut self.source_links, link)
    }

    /// Register an incoming link; returns false if it was already registered
    pub fn add_target_link(&mut self, link: Id) -> bool {
        push_unique(&mut self.target_links, link)
    }

    pub fn add_source_line(&mut self, line: Id) -> bool {
        push_unique(&mut self.source_lines, line)
    }

    pub fn add_target_line(&mut self, line: Id) -> bool {
        push_unique(&mut self.target_lines, line)
    }
}

pub(crate) fn push_unique(list: &mut Vec<Id>, id: Id) -> bool {
    if list.contains(&id) {
        false
    } else {
        list.push(id);
        true
    }
}

pub(crate) fn remove_id(list: &mut Vec<Id>, id: Id) -> bool {
    match list.iter().position(|x| *x == id) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}
