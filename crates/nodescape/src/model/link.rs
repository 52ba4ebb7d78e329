//! Link entity: a logical directed edge, never rendered directly

use crate::core::{Id, NodeType};

/// Directed edge between two nodes, unique per (source, target)
#[derive(Debug, Clone)]
pub struct Link {
    pub id: Id,
    pub source: Id,
    pub target: Id,
    pub target_type: NodeType,
    /// Lines this link routes through, source side first
    pub lines: Vec<Id>,
    pub stamp: u64,
}

impl Link {
    pub fn new(source_name: &str, target_name: &str, target_type: NodeType) -> Self {
        Self {
            id: Id::for_link(source_name, target_name),
            source: Id::from_name(source_name),
            target: Id::from_name(target_name),
            target_type,
            lines: Vec::new(),
            stamp: 0,
        }
    }
}
