//! Core building blocks shared by the model, layout, render and command layers
//!
//! Identity, geometry, the node type table, errors and logging setup.

pub mod geometry;
mod error;
mod id;
pub mod logging;
mod types;

pub use error::*;
pub use id::*;
pub use logging::*;
pub use types::*;
