//! Child ordering for the grid layout
//!
//! Children are sorted by `(edge group, topological rank, declaration index)`.
//! The key is a total order, so ties never depend on hash map iteration.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::core::Id;
use crate::model::Model;

/// Placement group relative to the parent edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EdgeGroup {
    /// The parent has a line into this child
    FromParent,
    Inner,
    /// This child has a line out to the parent
    ToParent,
}

/// Children of `parent` in layout order
pub fn order_children(model: &Model, parent: Id, children: &[Id]) -> Vec<Id> {
    let ranks = topological_ranks(model, children);
    let mut keyed: Vec<(EdgeGroup, usize, usize, Id)> = children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            let group = edge_group(model, parent, *child);
            (group, ranks[index], index, *child)
        })
        .collect();
    keyed.sort_by_key(|(group, rank, index, _)| (*group, *rank, *index));
    trace!(parent = %parent, count = keyed.len(), "Ordered children");
    keyed.into_iter().map(|(_, _, _, id)| id).collect()
}

fn edge_group(model: &Model, parent: Id, child: Id) -> EdgeGroup {
    if model.line_between(parent, child).is_some() {
        EdgeGroup::FromParent
    } else if model.line_between(child, parent).is_some() {
        EdgeGroup::ToParent
    } else {
        EdgeGroup::Inner
    }
}

/// Rank of each child (by position in `children`) in a topological order of
/// the sibling lines; siblings caught in a cycle keep declaration order after
/// the acyclic part
fn topological_ranks(model: &Model, children: &[Id]) -> Vec<usize> {
    let index_of: HashMap<Id, usize> = children
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();

    let mut in_degree = vec![0usize; children.len()];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); children.len()];

    for (from, child) in children.iter().enumerate() {
        let Some(node) = model.node(*child) else {
            continue;
        };
        for line in node.source_lines.iter().filter_map(|l| model.line(*l)) {
            if let Some(&to) = index_of.get(&line.target) {
                if to != from && !adjacency[from].contains(&to) {
                    adjacency[from].push(to);
                    in_degree[to] += 1;
                }
            }
        }
    }

    // Ready set kept sorted descending so `pop` yields the lowest index
    let mut queue: Vec<usize> = (0..children.len()).filter(|i| in_degree[*i] == 0).collect();
    queue.sort_by(|a, b| b.cmp(a));

    let mut order = Vec::with_capacity(children.len());
    while let Some(current) = queue.pop() {
        order.push(current);
        for &next in &adjacency[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push(next);
                queue.sort_by(|a, b| b.cmp(a));
            }
        }
    }

    if order.len() < children.len() {
        debug!(
            sorted_count = order.len(),
            total = children.len(),
            "Cycle detected among sibling lines"
        );
        for index in 0..children.len() {
            if !order.contains(&index) {
                order.push(index);
            }
        }
    }

    let mut ranks = vec![0usize; children.len()];
    for (rank, index) in order.into_iter().enumerate() {
        ranks[index] = rank;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NodeType;
    use crate::model::{LinkDescriptor, NodeDescriptor};

    fn model_with_links(children: &[&str], links: &[(&str, &str)]) -> Model {
        let mut model = Model::new();
        let stamp = model.begin_update();
        model.add_or_update_node(&NodeDescriptor::new("p", NodeType::Group), stamp);
        for child in children {
            model.add_or_update_node(&NodeDescriptor::new(*child, NodeType::Group), stamp);
        }
        for (source, target) in links {
            model.add_or_update_link(&LinkDescriptor::new(*source, *target), stamp);
        }
        model
    }

    fn names(model: &Model, ids: &[Id]) -> Vec<String> {
        ids.iter()
            .map(|id| model.node(*id).unwrap().name.clone())
            .collect()
    }

    fn ordered(model: &Model) -> Vec<String> {
        let parent = Id::from_name("p");
        let children = model.node(parent).unwrap().children.clone();
        names(model, &order_children(model, parent, &children))
    }

    #[test]
    fn test_unlinked_children_keep_declaration_order() {
        let model = model_with_links(&["p.c", "p.a", "p.b"], &[]);
        assert_eq!(ordered(&model), vec!["p.c", "p.a", "p.b"]);
    }

    #[test]
    fn test_source_sibling_comes_first() {
        let model = model_with_links(&["p.a", "p.b", "p.c"], &[("p.c", "p.a")]);
        assert_eq!(ordered(&model), vec!["p.b", "p.c", "p.a"]);
    }

    #[test]
    fn test_parent_edge_groups() {
        let model = model_with_links(
            &["p.a", "p.b", "p.c"],
            &[("p.a", "p"), ("p", "p.c")],
        );
        assert_eq!(ordered(&model), vec!["p.c", "p.b", "p.a"]);
    }

    #[test]
    fn test_cycle_falls_back_to_declaration_order() {
        let model = model_with_links(
            &["p.a", "p.b", "p.c"],
            &[("p.a", "p.b"), ("p.b", "p.a")],
        );
        assert_eq!(ordered(&model), vec!["p.c", "p.a", "p.b"]);
    }
}
