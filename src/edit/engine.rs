//! Undo/redo engine.

use super::observer::{GraphModified, GraphObserver, ModificationKind, ObserverId};
use super::operation::{EditOperation, NodeUpdate, OperationId};
use crate::error::{CoreError, Result};
use crate::tree::{NodeId, NodeRef, Tree};
use tracing::{debug, debug_span};

/// Executes operations against a tree and keeps the undo and redo stacks.
///
/// An operation is pushed onto the undo stack only if it succeeded. Executing
/// a new operation clears the redo stack.
#[derive(Default)]
pub struct EditEngine {
    undo_stack: Vec<EditOperation>,
    redo_stack: Vec<EditOperation>,
    observers: Vec<(ObserverId, Box<dyn GraphObserver>)>,
    next_observer: u32,
    max_history: Option<usize>,
}

impl std::fmt::Debug for EditEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditEngine")
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("observers", &self.observers.len())
            .field("max_history", &self.max_history)
            .finish()
    }
}

impl EditEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose undo stack keeps at most `max_history` operations; the
    /// oldest are dropped first. `None` keeps everything.
    pub fn with_max_history(max_history: Option<usize>) -> Self {
        EditEngine {
            max_history,
            ..Self::default()
        }
    }

    pub fn max_history(&self) -> Option<usize> {
        self.max_history
    }

    pub fn execute(&mut self, tree: &mut Tree, mut operation: EditOperation) -> Result<OperationId> {
        let span = debug_span!("execute", op = %operation.id(), kind = operation.kind().name());
        let _enter = span.enter();

        if let Err(err) = operation.execute(tree) {
            debug!(%err, "operation rejected");
            return Err(err);
        }
        self.redo_stack.clear();
        self.notify(tree, &operation, ModificationKind::Execute);
        let id = operation.id();
        self.undo_stack.push(operation);
        if let Some(max) = self.max_history {
            if self.undo_stack.len() > max {
                let excess = self.undo_stack.len() - max;
                self.undo_stack.drain(..excess);
            }
        }
        Ok(id)
    }

    /// Revert the most recent executed operation and move it to the redo stack.
    pub fn undo(&mut self, tree: &mut Tree) -> Result<OperationId> {
        let mut operation = self
            .undo_stack
            .pop()
            .ok_or_else(|| CoreError::invalid("nothing to undo"))?;
        let span = debug_span!("undo", op = %operation.id(), kind = operation.kind().name());
        let _enter = span.enter();

        if let Err(err) = operation.undo(tree) {
            debug!(%err, "undo failed");
            self.undo_stack.push(operation);
            return Err(err);
        }
        self.notify(tree, &operation, ModificationKind::Undo);
        let id = operation.id();
        self.redo_stack.push(operation);
        Ok(id)
    }

    /// Re-execute the most recently undone operation.
    pub fn redo(&mut self, tree: &mut Tree) -> Result<OperationId> {
        let mut operation = self
            .redo_stack
            .pop()
            .ok_or_else(|| CoreError::invalid("nothing to redo"))?;
        let span = debug_span!("redo", op = %operation.id(), kind = operation.kind().name());
        let _enter = span.enter();

        if let Err(err) = operation.execute(tree) {
            debug!(%err, "redo failed");
            self.redo_stack.push(operation);
            return Err(err);
        }
        self.notify(tree, &operation, ModificationKind::Redo);
        let id = operation.id();
        self.undo_stack.push(operation);
        Ok(id)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Executed operations, oldest first.
    pub fn history(&self) -> &[EditOperation] {
        &self.undo_stack
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    // =========================================================================
    // Observers
    // =========================================================================

    pub fn add_observer(&mut self, observer: impl GraphObserver + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(current, _)| *current != id);
        self.observers.len() != before
    }

    fn notify(&mut self, tree: &Tree, operation: &EditOperation, kind: ModificationKind) {
        let event = GraphModified {
            operation,
            kind,
            tree,
        };
        for (_, observer) in &mut self.observers {
            observer.graph_modified(&event);
        }
    }

    // =========================================================================
    // Convenience constructors
    // =========================================================================

    pub fn insert(
        &mut self,
        tree: &mut Tree,
        parent: NodeId,
        node: NodeRef,
        index: Option<usize>,
    ) -> Result<OperationId> {
        self.execute(tree, EditOperation::insert(parent, node, index))
    }

    pub fn remove(&mut self, tree: &mut Tree, node: NodeId) -> Result<OperationId> {
        self.execute(tree, EditOperation::remove(node))
    }

    pub fn replace(
        &mut self,
        tree: &mut Tree,
        node: NodeId,
        replacement: NodeRef,
        preserve_children: bool,
    ) -> Result<OperationId> {
        self.execute(tree, EditOperation::replace(node, replacement, preserve_children))
    }

    pub fn move_node(
        &mut self,
        tree: &mut Tree,
        node: NodeId,
        new_parent: NodeId,
        index: Option<usize>,
    ) -> Result<OperationId> {
        self.execute(tree, EditOperation::move_node(node, new_parent, index))
    }

    pub fn update(&mut self, tree: &mut Tree, node: NodeId, update: NodeUpdate) -> Result<OperationId> {
        self.execute(tree, EditOperation::update(node, update))
    }
}
