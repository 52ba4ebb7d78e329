//! Automatic child layout
//!
//! The solver places a parent's children on a grid and fits the parent's
//! container transform so the children's bounding box sits inside the
//! parent's boundary.

mod config;
mod ordering;
mod solver;

pub use config::*;
pub use ordering::*;
pub use solver::*;

use anyhow::Result;

use crate::core::Id;
use crate::model::Model;

/// Core trait for layout algorithms
///
/// A layout algorithm assigns boundaries to the children of one parent and
/// sets that parent's container zoom and offset.
pub trait LayoutAlgorithm {
    /// Lay out the children of `parent`
    fn layout(&self, model: &mut Model, parent: Id) -> Result<LayoutOutcome>;

    /// Get the name of this layout algorithm
    fn name(&self) -> &'static str;
}
