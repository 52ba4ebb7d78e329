//! Reversible model mutations
//!
//! Each command records only the fields it changes. Prior values are captured
//! on first execution and restored exactly on unexecute; re-executing after an
//! undo reapplies the new values.

use kurbo::{Point, Rect, Vec2};
use std::fmt;
use std::time::Instant;

use crate::core::Id;
use crate::model::Model;

/// Type tag used for coalescing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    NodeEdit,
    LineEdit,
    NodeVisibility,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::NodeEdit => write!(f, "node edit"),
            CommandKind::LineEdit => write!(f, "line edit"),
            CommandKind::NodeVisibility => write!(f, "node visibility"),
        }
    }
}

/// A reversible mutation against the model
pub trait Command: Send + fmt::Debug {
    fn kind(&self) -> CommandKind;

    /// When the command was issued
    fn timestamp(&self) -> Instant;

    /// Apply the change
    fn execute(&mut self, model: &mut Model);

    /// Restore the values captured by the first `execute`
    fn unexecute(&mut self, model: &mut Model);
}

/// Prior container transform of a node
#[derive(Debug, Clone, Copy, PartialEq)]
struct ContainerState {
    zoom: f64,
    offset: Vec2,
}

/// Edit of a node's boundary and/or container transform
#[derive(Debug, Clone)]
pub struct NodeEditCommand {
    node: Id,
    boundary: Option<Rect>,
    container: Option<(f64, Vec2)>,
    previous_boundary: Option<Rect>,
    /// Parent and its layout-customized flag before the move
    previous_customized: Option<(Id, bool)>,
    previous_container: Option<ContainerState>,
    timestamp: Instant,
}

impl NodeEditCommand {
    /// Move or resize a node
    pub fn set_boundary(node: Id, boundary: Rect) -> Self {
        Self::new(node, Some(boundary), None)
    }

    /// Pan or zoom inside a node
    pub fn set_container(node: Id, zoom: f64, offset: Vec2) -> Self {
        Self::new(node, None, Some((zoom, offset)))
    }

    fn new(node: Id, boundary: Option<Rect>, container: Option<(f64, Vec2)>) -> Self {
        Self {
            node,
            boundary,
            container,
            previous_boundary: None,
            previous_customized: None,
            previous_container: None,
            timestamp: Instant::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn node(&self) -> Id {
        self.node
    }
}

impl Command for NodeEditCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::NodeEdit
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn execute(&mut self, model: &mut Model) {
        if let Some(boundary) = self.boundary {
            if self.previous_boundary.is_none() {
                self.previous_boundary = model.node_boundary(self.node);
                self.previous_customized = parent_customized(model, self.node);
            }
            model.set_node_boundary(self.node, boundary);
        }
        if let Some((zoom, offset)) = self.container {
            if self.previous_container.is_none() {
                self.previous_container = model
                    .node_container(self.node)
                    .map(|(zoom, offset)| ContainerState { zoom, offset });
            }
            model.set_node_container(self.node, zoom, offset);
        }
    }

    fn unexecute(&mut self, model: &mut Model) {
        if let Some(previous) = self.previous_container {
            model.set_node_container(self.node, previous.zoom, previous.offset);
        }
        if let Some(previous) = self.previous_boundary {
            model.set_node_boundary(self.node, previous);
        }
        if let Some((parent, customized)) = self.previous_customized {
            if let Some(parent) = model.node_mut(parent) {
                parent.is_layout_customized = customized;
            }
        }
    }
}

fn parent_customized(model: &Model, node: Id) -> Option<(Id, bool)> {
    let parent = model.node(node)?.parent?;
    Some((parent, model.node(parent)?.is_layout_customized))
}

/// Replacement of a line's user-edited middle points
#[derive(Debug, Clone)]
pub struct LineEditCommand {
    line: Id,
    points: Vec<Point>,
    previous: Option<Vec<Point>>,
    timestamp: Instant,
}

impl LineEditCommand {
    pub fn new(line: Id, points: Vec<Point>) -> Self {
        Self {
            line,
            points,
            previous: None,
            timestamp: Instant::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl Command for LineEditCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::LineEdit
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn execute(&mut self, model: &mut Model) {
        if self.previous.is_none() {
            self.previous = model.line_points(self.line).map(<[Point]>::to_vec);
        }
        model.set_line_points(self.line, self.points.clone());
    }

    fn unexecute(&mut self, model: &mut Model) {
        if let Some(previous) = &self.previous {
            model.set_line_points(self.line, previous.clone());
        }
    }
}

/// Toggle of a node's user hidden flag
#[derive(Debug, Clone)]
pub struct NodeVisibilityCommand {
    node: Id,
    hidden: bool,
    previous: Option<bool>,
    timestamp: Instant,
}

impl NodeVisibilityCommand {
    pub fn new(node: Id, hidden: bool) -> Self {
        Self {
            node,
            hidden,
            previous: None,
            timestamp: Instant::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl Command for NodeVisibilityCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::NodeVisibility
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn execute(&mut self, model: &mut Model) {
        if self.previous.is_none() {
            self.previous = model.node(self.node).map(|n| n.is_user_set_hidden);
        }
        model.set_node_hidden(self.node, self.hidden);
    }

    fn unexecute(&mut self, model: &mut Model) {
        if let Some(previous) = self.previous {
            model.set_node_hidden(self.node, previous);
        }
    }
}

/// Same-kind commands issued within the coalescing window
///
/// Executed and unexecuted as a whole here; the engine steps through the
/// parts one at a time for undo and redo.
#[derive(Debug)]
pub struct CompositeCommand {
    kind: CommandKind,
    commands: Vec<Box<dyn Command>>,
}

impl CompositeCommand {
    pub fn new(first: Box<dyn Command>) -> Self {
        Self {
            kind: first.kind(),
            commands: vec![first],
        }
    }

    pub fn push(&mut self, command: Box<dyn Command>) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn part_mut(&mut self, index: usize) -> Option<&mut dyn Command> {
        self.commands.get_mut(index).map(|c| c.as_mut() as &mut dyn Command)
    }
}

impl Command for CompositeCommand {
    fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Timestamp of the most recent part
    fn timestamp(&self) -> Instant {
        self.commands
            .iter()
            .map(|c| c.timestamp())
            .max()
            .unwrap_or_else(Instant::now)
    }

    fn execute(&mut self, model: &mut Model) {
        for command in self.commands.iter_mut() {
            command.execute(model);
        }
    }

    fn unexecute(&mut self, model: &mut Model) {
        for command in self.commands.iter_mut().rev() {
            command.unexecute(model);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NodeType;
    use crate::model::{LinkDescriptor, NodeDescriptor};

    fn model() -> Model {
        let mut model = Model::new();
        let stamp = model.begin_update();
        model.add_or_update_node(
            &NodeDescriptor::new("a", NodeType::Group).with_boundary(Rect::new(0.0, 0.0, 100.0, 80.0)),
            stamp,
        );
        model.add_or_update_node(
            &NodeDescriptor::new("b", NodeType::Group).with_boundary(Rect::new(200.0, 0.0, 300.0, 80.0)),
            stamp,
        );
        model.add_or_update_link(&LinkDescriptor::new("a", "b"), stamp);
        model
    }

    #[test]
    fn test_node_edit_restores_exact_boundary() {
        let mut model = model();
        let a = Id::from_name("a");
        let mut command = NodeEditCommand::set_boundary(a, Rect::new(10.0, 10.0, 50.0, 50.0));
        command.execute(&mut model);
        assert_eq!(model.node_boundary(a), Some(Rect::new(10.0, 10.0, 50.0, 50.0)));
        command.unexecute(&mut model);
        assert_eq!(model.node_boundary(a), Some(Rect::new(0.0, 0.0, 100.0, 80.0)));
        command.execute(&mut model);
        assert_eq!(model.node_boundary(a), Some(Rect::new(10.0, 10.0, 50.0, 50.0)));
    }

    #[test]
    fn test_undoing_a_move_restores_automatic_layout() {
        let mut model = Model::new();
        let stamp = model.begin_update();
        model.add_or_update_node(
            &NodeDescriptor::new("p", NodeType::Group).with_boundary(Rect::new(0.0, 0.0, 400.0, 300.0)),
            stamp,
        );
        model.add_or_update_node(&NodeDescriptor::new("p.c", NodeType::Group), stamp);
        let p = Id::from_name("p");
        model.ensure_layout(p);
        assert!(!model.node(p).unwrap().is_layout_customized);

        let mut command =
            NodeEditCommand::set_boundary(Id::from_name("p.c"), Rect::new(50.0, 50.0, 210.0, 170.0));
        command.execute(&mut model);
        assert!(model.node(p).unwrap().is_layout_customized);
        command.unexecute(&mut model);
        assert!(!model.node(p).unwrap().is_layout_customized);

        model.add_or_update_node(&NodeDescriptor::new("p.d", NodeType::Group), stamp);
        let outcome = model.ensure_layout(p).unwrap();
        assert_ne!(outcome.mode, crate::layout::LayoutMode::Incremental);
    }

    #[test]
    fn test_container_edit_round_trip() {
        let mut model = model();
        let a = Id::from_name("a");
        let before = model.node_container(a).unwrap();
        let mut command = NodeEditCommand::set_container(a, 0.5, Vec2::new(3.0, 4.0));
        command.execute(&mut model);
        assert_eq!(model.node_container(a), Some((0.5, Vec2::new(3.0, 4.0))));
        command.unexecute(&mut model);
        assert_eq!(model.node_container(a), Some(before));
    }

    #[test]
    fn test_line_edit_round_trip() {
        let mut model = model();
        let line = model.line_between(Id::from_name("a"), Id::from_name("b")).unwrap().id;
        let mut command = LineEditCommand::new(line, vec![Point::new(150.0, 120.0)]);
        command.execute(&mut model);
        assert_eq!(model.line_points(line).unwrap(), &[Point::new(150.0, 120.0)]);
        command.unexecute(&mut model);
        assert!(model.line_points(line).unwrap().is_empty());
    }

    #[test]
    fn test_visibility_round_trip() {
        let mut model = model();
        let b = Id::from_name("b");
        let mut command = NodeVisibilityCommand::new(b, true);
        command.execute(&mut model);
        assert_eq!(model.is_node_hidden(b), Some(true));
        command.unexecute(&mut model);
        assert_eq!(model.is_node_hidden(b), Some(false));
    }

    #[test]
    fn test_composite_unexecutes_in_reverse() {
        let mut model = model();
        let a = Id::from_name("a");
        let mut composite = CompositeCommand::new(Box::new(NodeEditCommand::set_boundary(
            a,
            Rect::new(1.0, 1.0, 2.0, 2.0),
        )));
        composite.push(Box::new(NodeEditCommand::set_boundary(a, Rect::new(5.0, 5.0, 9.0, 9.0))));
        composite.execute(&mut model);
        assert_eq!(model.node_boundary(a), Some(Rect::new(5.0, 5.0, 9.0, 9.0)));
        composite.unexecute(&mut model);
        assert_eq!(model.node_boundary(a), Some(Rect::new(0.0, 0.0, 100.0, 80.0)));
    }

    #[test]
    fn test_unknown_target_is_noop() {
        let mut model = model();
        let mut command = NodeEditCommand::set_boundary(Id::from_name("ghost"), Rect::ZERO);
        command.execute(&mut model);
        command.unexecute(&mut model);
        assert_eq!(model.stats().nodes, 2);
    }
}
