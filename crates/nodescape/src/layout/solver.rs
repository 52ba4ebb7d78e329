//! Grid layout solver
//!
//! Full layout orders the children, picks a column count and places them
//! row-major, then fits the parent's container transform around the result.
//! Once the user has rearranged a parent by hand, only unplaced children are
//! slotted in, and the container is refit only if the content overflows.

use anyhow::Result;
use kurbo::{Point, Rect, Size, Vec2};
use tracing::{debug, span, trace, warn, Level};

use super::{
    order_children, Density, GridMetrics, LayoutAlgorithm, LayoutConfig, EMPTY_CELL_PENALTY_WEIGHT,
};
use crate::core::geometry::{aspect, bounding_box, contains_rect, is_placed, overlaps, safe_div};
use crate::core::{Id, ModelError};
use crate::model::Model;

/// Which path the solver took for a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// No children to place
    Empty,
    Grid,
    /// Type with members: public, private and other children in three lanes
    Lanes,
    Incremental,
}

/// Result of laying out one parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOutcome {
    pub mode: LayoutMode,
    /// Number of children assigned a new boundary
    pub placed: usize,
    pub zoom: f64,
    pub offset: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Lane {
    Public,
    Private,
    Other,
}

/// Score of a column count: aspect error plus weighted empty-cell ratio
pub fn column_score(
    count: usize,
    columns: usize,
    metrics: &GridMetrics,
    density: Density,
    target_aspect: f64,
) -> f64 {
    let rows = count.div_ceil(columns);
    let empty = rows * columns - count;
    let grid = grid_size(columns, rows, metrics, density);
    let aspect_error = (aspect(grid) / target_aspect.max(f64::MIN_POSITIVE)).ln().abs();
    aspect_error + EMPTY_CELL_PENALTY_WEIGHT * safe_div(empty as f64, count as f64)
}

/// Column count in `[1, count]` with the lowest score; ties go to fewer columns
pub fn choose_columns(
    count: usize,
    metrics: &GridMetrics,
    density: Density,
    target_aspect: f64,
) -> usize {
    let mut best = (1, f64::INFINITY);
    for columns in 1..=count.max(1) {
        let score = column_score(count.max(1), columns, metrics, density, target_aspect);
        trace!(columns, score, "Scored column count");
        if score < best.1 {
            best = (columns, score);
        }
    }
    best.0
}

/// Extent of a `columns` x `rows` grid including inner gaps
pub fn grid_size(columns: usize, rows: usize, metrics: &GridMetrics, density: Density) -> Size {
    let (gap_x, gap_y) = metrics.gaps(density);
    let columns = columns as f64;
    let rows = rows as f64;
    Size::new(
        columns * metrics.cell.width + (columns - 1.0).max(0.0) * gap_x,
        rows * metrics.cell.height + (rows - 1.0).max(0.0) * gap_y,
    )
}

/// Container zoom and offset that center `content` in `frame` at the
/// configured coverage
pub fn fit_container(content: Rect, frame: Size, config: &LayoutConfig) -> (f64, Vec2) {
    let fill = config.density.coverage().sqrt();
    let raw = fill
        * safe_div(frame.width, content.width()).min(safe_div(frame.height, content.height()));
    let zoom = config.clamp_zoom(raw);
    let offset = Vec2::new(
        (frame.width - content.width() * zoom) / 2.0 - content.x0 * zoom,
        (frame.height - content.height() * zoom) / 2.0 - content.y0 * zoom,
    );
    (zoom, offset)
}

/// The grid packing layout
#[derive(Debug, Clone, Default)]
pub struct GridLayout {
    config: LayoutConfig,
}

impl GridLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// `count` cells row-major from `origin`, columns chosen by score
    fn pack(&self, count: usize, metrics: &GridMetrics, target_aspect: f64, origin: Point) -> Vec<Rect> {
        let density = self.config.density;
        let columns = choose_columns(count, metrics, density, target_aspect * metrics.aspect_bias);
        let pitch = Vec2::new(metrics.pitch_x(density), metrics.pitch_y(density));
        (0..count)
            .map(|i| {
                let cell = Vec2::new((i % columns) as f64 * pitch.x, (i / columns) as f64 * pitch.y);
                Rect::from_origin_size(origin + cell, metrics.cell)
            })
            .collect()
    }

    fn layout_full(&self, model: &mut Model, parent: Id, children: &[Id]) -> (LayoutMode, usize) {
        let ordered = order_children(model, parent, children);
        let target = target_aspect(model, parent);
        let mut assigned: Vec<(Id, Rect)> = Vec::with_capacity(ordered.len());

        let mode = if uses_lanes(model, parent, children) {
            let (lane_gap, _) = self.config.regular.gaps(self.config.density);
            let mut x = 0.0;
            for lane in [Lane::Public, Lane::Private, Lane::Other] {
                let members: Vec<Id> = ordered
                    .iter()
                    .copied()
                    .filter(|c| lane_of(model, *c) == lane)
                    .collect();
                if members.is_empty() {
                    continue;
                }
                let metrics = self.config.metrics_for(lane != Lane::Other);
                let rects = self.pack(members.len(), metrics, target, Point::new(x, 0.0));
                if let Some(extent) = bounding_box(rects.iter().copied()) {
                    x = extent.x1 + lane_gap;
                }
                assigned.extend(members.into_iter().zip(rects));
            }
            LayoutMode::Lanes
        } else {
            let all_members = children.iter().all(|c| is_member(model, *c));
            let metrics = self.config.metrics_for(all_members);
            let rects = self.pack(ordered.len(), metrics, target, Point::ZERO);
            assigned.extend(ordered.into_iter().zip(rects));
            LayoutMode::Grid
        };

        let placed = assigned.len();
        for (child, rect) in assigned {
            assign_boundary(model, child, rect);
        }
        self.fit(model, parent);
        (mode, placed)
    }

    fn layout_incremental(&self, model: &mut Model, parent: Id, children: &[Id]) -> usize {
        let lanes = uses_lanes(model, parent, children);
        let group_of = |model: &Model, id: Id| if lanes { lane_of(model, id) } else { Lane::Other };

        let mut occupied: Vec<(Rect, Lane)> = children
            .iter()
            .filter_map(|c| model.node(*c))
            .filter(|n| is_placed(n.boundary))
            .map(|n| (n.boundary, group_of(model, n.id)))
            .collect();
        let pending: Vec<Id> = order_children(model, parent, children)
            .into_iter()
            .filter(|c| model.node(*c).is_some_and(|n| !is_placed(n.boundary)))
            .collect();

        for child in &pending {
            let lane = group_of(model, *child);
            let metrics = *self.config.metrics_for(is_member(model, *child));
            let (gap_x, _) = metrics.gaps(self.config.density);

            let group = bounding_box(occupied.iter().filter(|(_, l)| *l == lane).map(|(r, _)| *r));
            let all = bounding_box(occupied.iter().map(|(r, _)| *r));
            let start = match (group, all) {
                (Some(group), _) => group.origin(),
                (None, Some(all)) => Point::new(all.x1 + gap_x, all.y0),
                (None, None) => Point::ZERO,
            };

            let rect = self.scan_slot(start, &metrics, &occupied).unwrap_or_else(|| {
                let right = all.map_or(start.x, |r| r.x1 + gap_x);
                trace!(child = %child, "Slot scan exhausted, appending right");
                Rect::from_origin_size(Point::new(right, start.y), metrics.cell)
            });
            assign_boundary(model, *child, rect);
            occupied.push((rect, lane));
        }

        if !pending.is_empty() && parent != Id::ROOT {
            let content = bounding_box(occupied.iter().map(|(r, _)| *r));
            let visible = model.inner_rect(parent);
            if let (Some(content), Some(visible)) = (content, visible) {
                if !contains_rect(visible, content) {
                    debug!(parent = %parent, "Content overflows, refitting container");
                    self.fit(model, parent);
                }
            }
        }
        pending.len()
    }

    /// First candidate slot that keeps half a gap clear of every occupied rect
    fn scan_slot(&self, start: Point, metrics: &GridMetrics, occupied: &[(Rect, Lane)]) -> Option<Rect> {
        let density = self.config.density;
        let (gap_x, gap_y) = metrics.gaps(density);
        let columns = self.config.lane_columns.max(1);
        (0..self.config.scan_limit)
            .map(|i| {
                let cell = Vec2::new(
                    (i % columns) as f64 * metrics.pitch_x(density),
                    (i / columns) as f64 * metrics.pitch_y(density),
                );
                Rect::from_origin_size(start + cell, metrics.cell)
            })
            .find(|candidate| {
                let padded = candidate.inflate(gap_x / 2.0, gap_y / 2.0);
                !occupied.iter().any(|(rect, _)| overlaps(padded, *rect))
            })
    }

    /// Fit the parent's container around its children; the root stays at identity
    fn fit(&self, model: &mut Model, parent: Id) {
        let Some(node) = model.node(parent) else {
            return;
        };
        let (zoom, offset) = if node.is_root() {
            (1.0, Vec2::ZERO)
        } else {
            let content = bounding_box(
                node.children
                    .iter()
                    .filter_map(|c| model.node(*c))
                    .map(|n| n.boundary)
                    .filter(|r| is_placed(*r)),
            );
            match content {
                Some(content) if is_placed(node.boundary) => {
                    fit_container(content, node.boundary.size(), &self.config)
                }
                _ => (node.container_zoom, node.container_offset),
            }
        };
        if let Some(node) = model.node_mut(parent) {
            node.container_zoom = zoom;
            node.container_offset = offset;
        }
        trace!(parent = %parent, zoom, ?offset, "Fitted container");
    }
}

impl LayoutAlgorithm for GridLayout {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn layout(&self, model: &mut Model, parent: Id) -> Result<LayoutOutcome> {
        let node = model
            .node(parent)
            .ok_or_else(|| {
                ModelError::layout_error(format!("Cannot lay out unknown node {}", parent))
            })?;
        let children = node.children.clone();
        // Explicitly positioned children pin the arrangement like a manual edit
        let customized = node.is_layout_customized
            || children.iter().any(|c| {
                model
                    .node(*c)
                    .is_some_and(|n| n.has_explicit_boundary && is_placed(n.boundary))
            });

        let layout_span = span!(
            Level::DEBUG,
            "layout_children",
            parent = %parent,
            child_count = children.len(),
            customized
        );
        let _enter = layout_span.enter();

        let (mode, placed) = if children.is_empty() {
            (LayoutMode::Empty, 0)
        } else if customized {
            (LayoutMode::Incremental, self.layout_incremental(model, parent, &children))
        } else {
            self.layout_full(model, parent, &children)
        };

        let node = model
            .node_mut(parent)
            .ok_or_else(|| {
                ModelError::layout_error(format!("Node {} vanished during layout", parent))
            })?;
        node.is_layout_required = false;
        let outcome = LayoutOutcome {
            mode,
            placed,
            zoom: node.container_zoom,
            offset: node.container_offset,
        };
        debug!(?mode, placed, zoom = outcome.zoom, "Laid out children");
        Ok(outcome)
    }
}

fn is_member(model: &Model, id: Id) -> bool {
    model.node(id).is_some_and(|n| n.node_type.is_member())
}

fn lane_of(model: &Model, id: Id) -> Lane {
    match model.node(id).map(|n| n.node_type.info()) {
        Some(info) if info.is_member && info.is_private => Lane::Private,
        Some(info) if info.is_member => Lane::Public,
        _ => Lane::Other,
    }
}

fn uses_lanes(model: &Model, parent: Id, children: &[Id]) -> bool {
    model.node(parent).is_some_and(|n| n.node_type.is_type())
        && children.iter().any(|c| is_member(model, *c))
}

fn target_aspect(model: &Model, parent: Id) -> f64 {
    match model.node(parent) {
        Some(node) if !node.is_root() && is_placed(node.boundary) => aspect(node.boundary.size()),
        _ => 1.0,
    }
}

/// Set a child's boundary; a resized container gets its own refit scheduled
fn assign_boundary(model: &mut Model, child: Id, rect: Rect) {
    if let Some(node) = model.node_mut(child) {
        if node.boundary.size() != rect.size() && !node.children.is_empty() {
            node.is_layout_required = true;
        }
        node.boundary = rect;
    }
}

impl Model {
    /// Run the pending layout of one node, if it has one
    pub fn ensure_layout(&mut self, id: Id) -> Option<LayoutOutcome> {
        if !self.node(id)?.is_layout_required {
            return None;
        }
        let solver = GridLayout::new(self.layout_config.clone());
        match solver.layout(self, id) {
            Ok(outcome) => {
                if outcome.placed > 0 {
                    self.invalidate();
                }
                Some(outcome)
            }
            Err(error) => {
                warn!(node = %id, %error, "Layout failed");
                None
            }
        }
    }

    /// Lay out a container from scratch, discarding any manual arrangement
    /// and explicitly supplied child positions
    pub fn relayout(&mut self, id: Id) -> Option<LayoutOutcome> {
        let node = self.node_mut(id)?;
        node.is_layout_customized = false;
        node.is_layout_required = true;
        let children = node.children.clone();
        for child in children {
            if let Some(child) = self.node_mut(child) {
                child.has_explicit_boundary = false;
            }
        }
        self.ensure_layout(id)
    }

    /// Run every pending layout, parents before children
    pub fn layout_all(&mut self) -> usize {
        let mut order = vec![Id::ROOT];
        order.extend(self.descendants(Id::ROOT));
        order
            .into_iter()
            .filter_map(|id| self.ensure_layout(id))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NodeType;
    use crate::model::NodeDescriptor;

    fn square_parent_with(count: usize) -> Model {
        let mut model = Model::new();
        let stamp = model.begin_update();
        model.add_or_update_node(
            &NodeDescriptor::new("p", NodeType::Group).with_boundary(Rect::new(0.0, 0.0, 600.0, 600.0)),
            stamp,
        );
        for i in 0..count {
            model.add_or_update_node(&NodeDescriptor::new(format!("p.c{}", i), NodeType::Group), stamp);
        }
        model
    }

    #[test]
    fn test_unknown_parent_is_a_layout_error() {
        let mut model = Model::new();
        let error = GridLayout::default()
            .layout(&mut model, Id::from_name("ghost"))
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ModelError>(),
            Some(ModelError::LayoutError { .. })
        ));
        assert!(model.ensure_layout(Id::from_name("ghost")).is_none());
    }

    #[test]
    fn test_nine_children_use_three_columns() {
        let regular = GridMetrics::REGULAR;
        assert_eq!(choose_columns(9, &regular, Density::Balanced, 1.0), 3);
        let score = column_score(9, 3, &regular, Density::Balanced, 1.0);
        assert!((score - (560.0f64 / 440.0).ln()).abs() < 1e-9);
    }

    #[test]
    fn test_ten_children_pick_minimum_score() {
        let regular = GridMetrics::REGULAR;
        let scores: Vec<f64> = (1..=10)
            .map(|c| column_score(10, c, &regular, Density::Balanced, 1.0))
            .collect();
        let best = scores
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |acc, (i, s)| if *s < acc.1 { (i, *s) } else { acc });
        assert_eq!(best.0 + 1, 3);
        assert_eq!(choose_columns(10, &regular, Density::Balanced, 1.0), 3);
        assert!(scores[2] < scores[3]);
        assert!(scores[2] < scores[1]);
    }

    #[test]
    fn test_single_child_uses_one_column() {
        assert_eq!(choose_columns(1, &GridMetrics::REGULAR, Density::Compact, 4.0), 1);
    }

    #[test]
    fn test_zero_extent_content_fits_without_nan() {
        let config = LayoutConfig::default();
        let (zoom, offset) = fit_container(Rect::ZERO, Size::new(100.0, 100.0), &config);
        assert!(zoom.is_finite() && offset.x.is_finite() && offset.y.is_finite());
        assert_eq!(zoom, config.max_zoom);
    }

    #[test]
    fn test_fit_centers_content() {
        let config = LayoutConfig::default();
        let content = Rect::new(0.0, 0.0, 1000.0, 500.0);
        let (zoom, offset) = fit_container(content, Size::new(200.0, 200.0), &config);
        let expected = 0.75f64.sqrt() * 0.2;
        assert!((zoom - expected).abs() < 1e-12);
        let left = offset.x;
        let right = 200.0 - (content.width() * zoom + offset.x);
        assert!((left - right).abs() < 1e-9);
    }

    #[test]
    fn test_full_layout_places_children_in_grid() {
        let mut model = square_parent_with(9);
        let outcome = model.ensure_layout(Id::from_name("p")).unwrap();
        assert_eq!(outcome.mode, LayoutMode::Grid);
        assert_eq!(outcome.placed, 9);

        let p = model.node_by_name("p").unwrap();
        assert!(!p.is_layout_required);
        let rows: Vec<f64> = p
            .children
            .iter()
            .map(|c| model.node(*c).unwrap().boundary.y0)
            .collect();
        assert_eq!(rows, vec![0.0, 0.0, 0.0, 160.0, 160.0, 160.0, 320.0, 320.0, 320.0]);
    }

    #[test]
    fn test_fitted_content_lies_inside_parent() {
        let mut model = square_parent_with(7);
        let p = Id::from_name("p");
        model.ensure_layout(p);
        let frame = model.node_boundary(p).unwrap();
        for child in model.node(p).unwrap().children.clone() {
            let rect = model.global_rect(child).unwrap();
            assert!(contains_rect(frame, rect), "{:?} escapes {:?}", rect, frame);
        }
    }

    #[test]
    fn test_root_container_stays_identity() {
        let mut model = Model::new();
        let stamp = model.begin_update();
        for name in ["a", "b", "c"] {
            model.add_or_update_node(&NodeDescriptor::new(name, NodeType::Group), stamp);
        }
        model.layout_all();
        assert_eq!(model.root().container_zoom, 1.0);
        assert_eq!(model.root().container_offset, Vec2::ZERO);
        assert!(model.nodes().all(|n| n.is_root() || is_placed(n.boundary)));
    }

    #[test]
    fn test_type_with_members_uses_three_lanes() {
        let mut model = Model::new();
        let stamp = model.begin_update();
        model.add_or_update_node(
            &NodeDescriptor::new("T", NodeType::Type).with_boundary(Rect::new(0.0, 0.0, 400.0, 300.0)),
            stamp,
        );
        model.add_or_update_node(&NodeDescriptor::new("T.run", NodeType::Member), stamp);
        model.add_or_update_node(&NodeDescriptor::new("T.count", NodeType::PrivateMember), stamp);
        model.add_or_update_node(&NodeDescriptor::new("T.Inner", NodeType::Type), stamp);

        let outcome = model.ensure_layout(Id::from_name("T")).unwrap();
        assert_eq!(outcome.mode, LayoutMode::Lanes);

        let x = |name: &str| model.node_by_name(name).unwrap().boundary.x0;
        assert!(x("T.run") < x("T.count"));
        assert!(x("T.count") < x("T.Inner"));
        assert_eq!(
            model.node_by_name("T.run").unwrap().boundary.size(),
            GridMetrics::MEMBER.cell
        );
        assert_eq!(
            model.node_by_name("T.Inner").unwrap().boundary.size(),
            GridMetrics::REGULAR.cell
        );
    }

    #[test]
    fn test_incremental_layout_keeps_manual_positions() {
        let mut model = square_parent_with(2);
        let p = Id::from_name("p");
        model.ensure_layout(p);
        let moved = Rect::new(500.0, 500.0, 660.0, 620.0);
        assert!(model.set_node_boundary(Id::from_name("p.c0"), moved));

        let stamp = model.begin_update();
        model.add_or_update_node(&NodeDescriptor::new("p.new", NodeType::Group), stamp);
        let outcome = model.ensure_layout(p).unwrap();

        assert_eq!(outcome.mode, LayoutMode::Incremental);
        assert_eq!(outcome.placed, 1);
        assert_eq!(model.node_by_name("p.c0").unwrap().boundary, moved);
        let new_rect = model.node_by_name("p.new").unwrap().boundary;
        assert!(is_placed(new_rect));
        for sibling in ["p.c0", "p.c1"] {
            let rect = model.node_by_name(sibling).unwrap().boundary;
            assert!(!overlaps(new_rect, rect));
        }
    }

    #[test]
    fn test_relayout_discards_manual_arrangement() {
        let mut model = square_parent_with(3);
        let p = Id::from_name("p");
        model.ensure_layout(p);
        model.set_node_boundary(Id::from_name("p.c0"), Rect::new(900.0, 900.0, 1060.0, 1020.0));
        let outcome = model.relayout(p).unwrap();
        assert_ne!(outcome.mode, LayoutMode::Incremental);
        assert_eq!(model.node_by_name("p.c0").unwrap().boundary.origin(), Point::ZERO);
    }
}
