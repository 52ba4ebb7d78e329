//! Undoable edits, history and step-through scheduling

mod commands;
mod engine;
mod scheduler;

pub use commands::*;
pub use engine::*;
pub use scheduler::*;
