//! Nodescape - nested node maps rendered as tiled SVG
//!
//! A library for building a tree of nested nodes connected by directed links,
//! laying out each node's children automatically and rendering the result as
//! SVG tiles addressed by viewport position and zoom level.
//!
//! # Quick Start
//!
//! ```rust
//! use nodescape::prelude::*;
//!
//! let mut model = Model::new();
//! let stamp = model.begin_update();
//! model.apply_batch(
//!     &[
//!         NodeDescriptor::new("app.Service", NodeType::Type).into(),
//!         NodeDescriptor::new("app.Store", NodeType::Type).into(),
//!         LinkDescriptor::new("app.Service", "app.Store").into(),
//!     ],
//!     stamp,
//! );
//! model.remove_obsolete(stamp);
//!
//! let view = Rect::new(0.0, 0.0, 800.0, 600.0);
//! let tile = model.get_tile(view, 1.0, &SvgRenderer::default()).unwrap();
//! assert!(tile.svg.starts_with("<svg"));
//! ```
//!
//! # Shared Access
//!
//! [`Canvas`] wraps a model and its undo history behind one mutex, streams
//! structure updates from a background thread and steps through coalesced
//! undo entries on a [`Scheduler`](command::Scheduler).
//!
//! ```rust
//! use nodescape::prelude::*;
//!
//! let canvas = Canvas::default();
//! canvas.apply_batch(&[NodeDescriptor::new("a", NodeType::Group)
//!     .with_boundary(Rect::new(0.0, 0.0, 100.0, 80.0))
//!     .into()]);
//!
//! let a = Id::from_name("a");
//! canvas.execute(Box::new(NodeEditCommand::set_boundary(a, Rect::new(20.0, 0.0, 120.0, 80.0))));
//! assert_eq!(canvas.undo(), StepProgress::Complete);
//! assert_eq!(canvas.node_boundary(a), Some(Rect::new(0.0, 0.0, 100.0, 80.0)));
//! ```

pub mod canvas;
pub mod command;
pub mod core;
pub mod layout;
pub mod model;
pub mod render;

pub use canvas::*;
pub use core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::canvas::{Canvas, CanvasConfig, CanvasEvent, IngestReport};
    pub use crate::command::{
        Command, CommandEngine, HistoryConfig, LineEditCommand, NodeEditCommand,
        NodeVisibilityCommand, StepProgress,
    };
    pub use crate::core::{Id, ModelError, NodeType};
    pub use crate::layout::{Density, GridLayout, LayoutAlgorithm, LayoutConfig};
    pub use crate::model::{Descriptor, LinkDescriptor, Model, NodeDescriptor, Snapshot};
    pub use crate::render::{RenderConfig, SvgRenderer, Tile, TileKey, TileRenderer};
    pub use kurbo::{Point, Rect, Vec2};
}

/// Build a model from one descriptor batch, removing nothing
///
/// # Example
/// ```rust
/// use nodescape::{build, prelude::*};
///
/// let model = build(&[LinkDescriptor::new("a.x", "b.y").into()]);
/// assert_eq!(model.stats().nodes, 4);
/// assert_eq!(model.stats().lines, 3);
/// ```
pub fn build(batch: &[model::Descriptor]) -> model::Model {
    let mut model = model::Model::new();
    let stamp = model.begin_update();
    model.apply_batch(batch, stamp);
    model
}

/// Render one viewport of a snapshot to SVG
///
/// Restores the snapshot into a fresh model configured by `layout`, lays out
/// what is pending and renders the tile covering `view` at `zoom`.
pub fn render_snapshot(
    snapshot: &model::Snapshot,
    layout: layout::LayoutConfig,
    render: render::RenderConfig,
    view: kurbo::Rect,
    zoom: f64,
) -> anyhow::Result<String> {
    let mut model = model::Model::with_layout_config(layout);
    model.restore(snapshot)?;
    let renderer = render::SvgRenderer::new(render);
    let tile = model.get_tile(view, zoom, &renderer)?;
    Ok(tile.svg.clone())
}
