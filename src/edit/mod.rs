//! Reversible structural edits and their history.

mod engine;
mod observer;
mod operation;

pub use engine::EditEngine;
pub use observer::{GraphModified, GraphObserver, ModificationKind, ObserverId};
pub use operation::{EditKind, EditOperation, NodeUpdate, OperationId, OperationState};
