//! Change notifications for edits that reached the tree.

use super::operation::EditOperation;
use crate::tree::Tree;

/// How the tree was changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModificationKind {
    Execute,
    Undo,
    Redo,
}

/// Delivered synchronously after an operation has been applied or reverted.
#[derive(Debug, Clone, Copy)]
pub struct GraphModified<'a> {
    pub operation: &'a EditOperation,
    pub kind: ModificationKind,
    /// The tree in its post-modification state.
    pub tree: &'a Tree,
}

pub trait GraphObserver {
    fn graph_modified(&mut self, event: &GraphModified<'_>);
}

impl<F> GraphObserver for F
where
    F: FnMut(&GraphModified<'_>),
{
    fn graph_modified(&mut self, event: &GraphModified<'_>) {
        self(event)
    }
}

/// Handle returned by [`EditEngine::add_observer`](super::EditEngine::add_observer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u32);
