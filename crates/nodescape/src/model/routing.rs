//! Link routing
//!
//! A link is decomposed into hops along the containment tree: up from the
//! source to just below the lowest common ancestor, one hop across between the
//! two frontiers, then down to the target. Each hop is a [`Line`] keyed by its
//! ordered endpoint pair, so links that share a hop share the line.

use tracing::{debug, trace};

use super::node::{push_unique, remove_id};
use super::{Line, Model};
use crate::core::Id;

impl Model {
    /// Hop pairs a link between `source` and `target` routes through
    pub fn route_hops(&self, source: Id, target: Id) -> Vec<(Id, Id)> {
        let Some(lca) = self.lowest_common_ancestor(source, target) else {
            return Vec::new();
        };
        let parent_of = |id: Id| self.nodes.get(&id).and_then(|n| n.parent);

        let mut hops = Vec::new();
        let mut source_frontier = source;
        while source_frontier != lca {
            match parent_of(source_frontier) {
                Some(parent) if parent != lca => {
                    hops.push((source_frontier, parent));
                    source_frontier = parent;
                }
                _ => break,
            }
        }

        let mut downward = Vec::new();
        let mut target_frontier = target;
        while target_frontier != lca {
            match parent_of(target_frontier) {
                Some(parent) if parent != lca => {
                    downward.push((parent, target_frontier));
                    target_frontier = parent;
                }
                _ => break,
            }
        }

        if source_frontier != target_frontier {
            hops.push((source_frontier, target_frontier));
        }
        hops.extend(downward.into_iter().rev());
        hops
    }

    /// Create or extend the lines a link routes through
    pub(crate) fn route_link(&mut self, link_id: Id) {
        let Some(link) = self.links.get(&link_id) else {
            return;
        };
        let hops = self.route_hops(link.source, link.target);
        for (source, target) in &hops {
            self.add_line_hop(*source, *target, link_id, false);
        }
        trace!(link = %link_id, hops = hops.len(), "Routed link");
    }

    /// Detach a link from all its lines, dropping lines left without links
    pub(crate) fn unroute_link(&mut self, link_id: Id) {
        let lines = match self.links.get_mut(&link_id) {
            Some(link) => std::mem::take(&mut link.lines),
            None => return,
        };
        self.release_lines(link_id, &lines);
    }

    /// Route a link through a single user-authored line from its source
    /// straight to its target, replacing its hierarchical hops
    pub fn add_direct_line(&mut self, link_id: Id) -> Option<Id> {
        let (source, target) = {
            let link = self.links.get(&link_id)?;
            (link.source, link.target)
        };
        if source == target {
            return None;
        }
        self.unroute_link(link_id);
        let line = self.add_line_hop(source, target, link_id, true);
        debug!(link = %link_id, line = %line, "Added direct line");
        self.invalidate();
        Some(line)
    }

    /// Remove a direct line and route its links hierarchically again
    pub fn remove_direct_line(&mut self, line_id: Id) -> bool {
        let links = match self.lines.get(&line_id) {
            Some(line) if line.is_direct => line.links.clone(),
            _ => return false,
        };
        for link in &links {
            self.unroute_link(*link);
        }
        self.remove_line(line_id);
        for link in &links {
            self.route_link(*link);
        }
        self.invalidate();
        true
    }

    /// The node whose child space a line is drawn in
    pub fn line_owner(&self, line_id: Id) -> Option<Id> {
        let line = self.lines.get(&line_id)?;
        self.lowest_common_ancestor(line.source, line.target)
    }

    pub(crate) fn remove_line(&mut self, line_id: Id) {
        let Some(line) = self.lines.remove(&line_id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&line.source) {
            remove_id(&mut node.source_lines, line_id);
        }
        if let Some(node) = self.nodes.get_mut(&line.target) {
            remove_id(&mut node.target_lines, line_id);
        }
        for link in &line.links {
            if let Some(link) = self.links.get_mut(link) {
                remove_id(&mut link.lines, line_id);
            }
        }
    }

    pub(crate) fn release_lines(&mut self, link_id: Id, lines: &[Id]) {
        for line_id in lines {
            let empty = match self.lines.get_mut(line_id) {
                Some(line) => {
                    remove_id(&mut line.links, link_id);
                    line.links.is_empty()
                }
                None => continue,
            };
            if empty {
                self.remove_line(*line_id);
            }
        }
    }

    fn add_line_hop(&mut self, source: Id, target: Id, link_id: Id, is_direct: bool) -> Id {
        let line_id = if is_direct {
            Id::for_direct_line(source, target)
        } else {
            Id::for_line(source, target)
        };
        let line = self
            .lines
            .entry(line_id)
            .or_insert_with(|| Line::new(source, target, is_direct));
        push_unique(&mut line.links, link_id);

        if let Some(node) = self.nodes.get_mut(&source) {
            node.add_source_line(line_id);
        }
        if let Some(node) = self.nodes.get_mut(&target) {
            node.add_target_line(line_id);
        }
        if let Some(link) = self.links.get_mut(&link_id) {
            push_unique(&mut link.lines, line_id);
        }
        line_id
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{Id, NodeType};
    use crate::model::{LinkDescriptor, Model, NodeDescriptor, DIRECT_STROKE_WIDTH};

    fn model_with(names: &[&str]) -> Model {
        let mut model = Model::new();
        let stamp = model.begin_update();
        for name in names {
            model.add_or_update_node(&NodeDescriptor::new(*name, NodeType::Group), stamp);
        }
        model
    }

    fn link(model: &mut Model, source: &str, target: &str) -> Id {
        let stamp = model.current_stamp();
        model.add_or_update_link(&LinkDescriptor::new(source, target), stamp)
    }

    fn id(name: &str) -> Id {
        Id::from_name(name)
    }

    #[test]
    fn test_cousin_link_routes_up_across_down() {
        let mut model = model_with(&["a", "a.x", "b", "b.y"]);
        let link_id = link(&mut model, "a.x", "b.y");
        assert_eq!(
            model.route_hops(id("a.x"), id("b.y")),
            vec![(id("a.x"), id("a")), (id("a"), id("b")), (id("b"), id("b.y"))]
        );
        assert_eq!(model.link(link_id).unwrap().lines.len(), 3);
        assert_eq!(model.stats().lines, 3);
    }

    #[test]
    fn test_sibling_link_is_one_hop() {
        let mut model = model_with(&["a", "b"]);
        link(&mut model, "a", "b");
        assert!(model.line_between(id("a"), id("b")).is_some());
        assert_eq!(model.stats().lines, 1);
    }

    #[test]
    fn test_link_to_own_descendant() {
        let model = model_with(&["a", "a.b", "a.b.c"]);
        assert_eq!(
            model.route_hops(id("a"), id("a.b.c")),
            vec![(id("a"), id("a.b")), (id("a.b"), id("a.b.c"))]
        );
        assert_eq!(
            model.route_hops(id("a.b.c"), id("a")),
            vec![(id("a.b.c"), id("a.b")), (id("a.b"), id("a"))]
        );
    }

    #[test]
    fn test_self_link_has_no_hops() {
        let mut model = model_with(&["a"]);
        let link_id = link(&mut model, "a", "a");
        assert!(model.link(link_id).unwrap().lines.is_empty());
    }

    #[test]
    fn test_shared_hop_aggregates_links() {
        let mut model = model_with(&["a", "a.x", "a.z", "b", "b.y"]);
        link(&mut model, "a.x", "b.y");
        link(&mut model, "a.z", "b.y");
        let across = model.line_between(id("a"), id("b")).unwrap();
        assert_eq!(across.link_count(), 2);
        assert_eq!(across.stroke_width(), 1.5);
    }

    #[test]
    fn test_relinking_is_idempotent() {
        let mut model = model_with(&["a", "a.x", "b", "b.y"]);
        link(&mut model, "a.x", "b.y");
        let before = model.stats();
        link(&mut model, "a.x", "b.y");
        assert_eq!(model.stats(), before);
        let across = model.line_between(id("a"), id("b")).unwrap();
        assert_eq!(across.link_count(), 1);
    }

    #[test]
    fn test_removing_link_drops_unshared_lines() {
        let mut model = model_with(&["a", "a.x", "a.z", "b", "b.y"]);
        let first = link(&mut model, "a.x", "b.y");
        link(&mut model, "a.z", "b.y");
        assert!(model.remove_link(first));
        assert!(model.line_between(id("a.x"), id("a")).is_none());
        assert_eq!(model.line_between(id("a"), id("b")).unwrap().link_count(), 1);
        assert!(model.line_between(id("b"), id("b.y")).is_some());
    }

    #[test]
    fn test_direct_line_replaces_hops_and_back() {
        let mut model = model_with(&["a", "a.x", "b", "b.y"]);
        let link_id = link(&mut model, "a.x", "b.y");
        let line = model.add_direct_line(link_id).unwrap();
        assert_eq!(model.stats().lines, 1);
        assert!(model.line(line).unwrap().is_direct);
        assert_eq!(model.line_owner(line), Some(Id::ROOT));

        assert!(model.remove_direct_line(line));
        assert_eq!(model.stats().lines, 3);
        let hop = model.link(link_id).unwrap().lines[0];
        assert!(!model.remove_direct_line(hop));
    }

    #[test]
    fn test_direct_line_stays_apart_from_shared_hop() {
        let mut model = model_with(&["a", "a.x", "b", "b.y"]);
        link(&mut model, "a.x", "b.y");
        let shortcut = link(&mut model, "a", "b");
        let hop = model.line_between(id("a"), id("b")).unwrap().id;
        assert_eq!(model.line(hop).unwrap().link_count(), 2);

        let direct = model.add_direct_line(shortcut).unwrap();
        assert_ne!(direct, hop);
        let line = model.line(direct).unwrap();
        assert!(line.is_direct);
        assert_eq!(line.link_count(), 1);
        assert_eq!(line.stroke_width(), DIRECT_STROKE_WIDTH);
        assert_eq!(model.line(hop).unwrap().link_count(), 1);

        assert!(model.remove_direct_line(direct));
        assert!(model.line(direct).is_none());
        assert_eq!(model.line(hop).unwrap().link_count(), 2);
    }

    #[test]
    fn test_line_owner_for_hops() {
        let mut model = model_with(&["a", "a.x", "b"]);
        link(&mut model, "a.x", "b");
        let up = model.line_between(id("a.x"), id("a")).unwrap().id;
        let across = model.line_between(id("a"), id("b")).unwrap().id;
        assert_eq!(model.line_owner(up), Some(id("a")));
        assert_eq!(model.line_owner(across), Some(Id::ROOT));
    }

    #[test]
    fn test_reparent_reroutes_links() {
        let mut model = model_with(&["a", "a.x", "b", "c"]);
        link(&mut model, "a.x", "b");
        let stamp = model.current_stamp();
        model.add_or_update_node(
            &NodeDescriptor::new("a.x", NodeType::Group).with_parent("c"),
            stamp,
        );
        assert!(model.line_between(id("a.x"), id("a")).is_none());
        assert!(model.line_between(id("a.x"), id("c")).is_some());
        assert!(model.line_between(id("c"), id("b")).is_some());
    }
}
