//! The node map model
//!
//! Entities, the registry that owns them, the structure builder fed by the
//! parsing layer, link routing and the persistence snapshot.

mod builder;
mod line;
mod link;
#[allow(clippy::module_inception)]
mod model;
mod node;
mod routing;
mod snapshot;

pub use builder::*;
pub use line::*;
pub use link::*;
pub use model::*;
pub use node::Node;
pub use snapshot::*;
