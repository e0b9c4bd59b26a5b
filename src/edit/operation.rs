//! Reversible structural edits.
//!
//! Each `EditOperation` carries its forward parameters plus the state it
//! captures on execution. Undo replays that captured state in reverse; redo
//! executes the forward parameters again against the restored tree.

use crate::error::{CoreError, Result};
use crate::tree::{Attributes, NodeFlags, NodeId, NodeRef, Tree};
use cograph_common::Atom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tracing::trace;

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier generated for every operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub u64);

impl OperationId {
    fn fresh() -> Self {
        OperationId(NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// Lifecycle of an operation: `Pending -> Executed -> (Undone <-> Executed)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    Executed,
    Undone,
}

/// New content for an update. `None` leaves a field unchanged; an empty
/// name or value clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub attributes: Option<Attributes>,
}

/// The forward parameters of an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKind {
    /// Attach a detached node under `parent`. `index: None` appends.
    Insert {
        parent: NodeId,
        node: NodeRef,
        index: Option<usize>,
    },
    /// Detach a node and its subtree.
    Remove { node: NodeId },
    /// Put a detached `replacement` where `node` is.
    Replace {
        node: NodeId,
        replacement: NodeRef,
        preserve_children: bool,
    },
    /// Re-parent a node. `index: None` appends.
    Move {
        node: NodeId,
        new_parent: NodeId,
        index: Option<usize>,
    },
    /// Rewrite name, value or attributes.
    Update { node: NodeId, update: NodeUpdate },
}

impl EditKind {
    pub fn name(&self) -> &'static str {
        match self {
            EditKind::Insert { .. } => "insert",
            EditKind::Remove { .. } => "remove",
            EditKind::Replace { .. } => "replace",
            EditKind::Move { .. } => "move",
            EditKind::Update { .. } => "update",
        }
    }
}

/// State captured at execution time, enough to reverse the edit exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Captured {
    Inserted {
        node: NodeRef,
    },
    Removed {
        parent: NodeRef,
        index: usize,
        node: NodeRef,
    },
    Replaced {
        parent: NodeRef,
        index: usize,
        original: NodeRef,
        replacement: NodeRef,
        prior_children: usize,
        moved_children: usize,
    },
    Moved {
        node: NodeRef,
        from: NodeRef,
        from_index: usize,
        to: NodeRef,
    },
    Updated {
        node: NodeRef,
        name: Atom,
        value: Atom,
        attributes: Atom,
        flags: NodeFlags,
    },
}

/// One reversible structural mutation.
#[derive(Debug, Clone)]
pub struct EditOperation {
    id: OperationId,
    timestamp: SystemTime,
    kind: EditKind,
    state: OperationState,
    captured: Option<Captured>,
}

impl EditOperation {
    pub fn new(kind: EditKind) -> Self {
        EditOperation {
            id: OperationId::fresh(),
            timestamp: SystemTime::now(),
            kind,
            state: OperationState::Pending,
            captured: None,
        }
    }

    pub fn insert(parent: NodeId, node: NodeRef, index: Option<usize>) -> Self {
        Self::new(EditKind::Insert {
            parent,
            node,
            index,
        })
    }

    pub fn remove(node: NodeId) -> Self {
        Self::new(EditKind::Remove { node })
    }

    pub fn replace(node: NodeId, replacement: NodeRef, preserve_children: bool) -> Self {
        Self::new(EditKind::Replace {
            node,
            replacement,
            preserve_children,
        })
    }

    pub fn move_node(node: NodeId, new_parent: NodeId, index: Option<usize>) -> Self {
        Self::new(EditKind::Move {
            node,
            new_parent,
            index,
        })
    }

    pub fn update(node: NodeId, update: NodeUpdate) -> Self {
        Self::new(EditKind::Update { node, update })
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn kind(&self) -> &EditKind {
        &self.kind
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Ids named by the forward parameters.
    pub fn target_ids(&self) -> SmallVec<[NodeId; 2]> {
        let mut ids = SmallVec::new();
        match &self.kind {
            EditKind::Insert { parent, .. } => ids.push(*parent),
            EditKind::Remove { node } | EditKind::Update { node, .. } => ids.push(*node),
            EditKind::Replace { node, .. } => ids.push(*node),
            EditKind::Move {
                node, new_parent, ..
            } => {
                ids.push(*node);
                ids.push(*new_parent);
            }
        }
        ids
    }

    /// The node that ends up in the tree (or left it) because of this edit.
    pub fn subject(&self) -> Option<NodeRef> {
        match self.captured? {
            Captured::Inserted { node }
            | Captured::Removed { node, .. }
            | Captured::Moved { node, .. }
            | Captured::Updated { node, .. } => Some(node),
            Captured::Replaced { replacement, .. } => Some(replacement),
        }
    }

    // =========================================================================
    // Execute
    // =========================================================================

    pub(crate) fn execute(&mut self, tree: &mut Tree) -> Result<()> {
        if self.state == OperationState::Executed {
            return Err(CoreError::invalid(format!("{} is already executed", self.id)));
        }
        let captured = match &self.kind {
            EditKind::Insert {
                parent,
                node,
                index,
            } => execute_insert(tree, *parent, *node, *index)?,
            EditKind::Remove { node } => execute_remove(tree, *node)?,
            EditKind::Replace {
                node,
                replacement,
                preserve_children,
            } => execute_replace(tree, *node, *replacement, *preserve_children)?,
            EditKind::Move {
                node,
                new_parent,
                index,
            } => execute_move(tree, *node, *new_parent, *index)?,
            EditKind::Update { node, update } => execute_update(tree, *node, update)?,
        };
        trace!(op = %self.id, kind = self.kind.name(), ?captured, "executed");
        self.captured = Some(captured);
        self.state = OperationState::Executed;
        Ok(())
    }

    // =========================================================================
    // Undo
    // =========================================================================

    pub(crate) fn undo(&mut self, tree: &mut Tree) -> Result<()> {
        let captured = match (self.state, self.captured) {
            (OperationState::Executed, Some(captured)) => captured,
            _ => {
                return Err(CoreError::invalid(format!(
                    "{} has not been executed",
                    self.id
                )));
            }
        };
        match captured {
            Captured::Inserted { node } => {
                tree.detach(node)?;
            }
            Captured::Removed {
                parent,
                index,
                node,
            } => {
                tree.attach(parent, node, Some(index))?;
            }
            Captured::Replaced {
                parent,
                index,
                original,
                replacement,
                prior_children,
                moved_children,
            } => {
                tree.detach(replacement)?;
                let moved: Vec<NodeRef> = tree
                    .store()
                    .children(replacement)
                    .skip(prior_children)
                    .take(moved_children)
                    .collect();
                transfer_children(tree, replacement, original, &moved)?;
                tree.attach(parent, original, Some(index))?;
            }
            Captured::Moved {
                node,
                from,
                from_index,
                to,
            } => {
                let store = tree.store_mut();
                store.remove_child(to, node)?;
                store.insert_child(from, from_index, node)?;
            }
            Captured::Updated {
                node,
                name,
                value,
                attributes,
                flags,
            } => {
                let store = tree.store_mut();
                store.set_name_atom(node, name)?;
                store.set_value_atom(node, value)?;
                store.set_attributes_atom(node, attributes)?;
                store.set_flags(node, flags)?;
            }
        }
        trace!(op = %self.id, kind = self.kind.name(), "undone");
        self.state = OperationState::Undone;
        Ok(())
    }
}

fn find(tree: &Tree, id: NodeId) -> Result<NodeRef> {
    tree.find(id).ok_or(CoreError::NotFound(id))
}

fn reject_root(tree: &Tree, node: NodeRef, action: &str) -> Result<()> {
    if Some(node) == tree.root() || tree.store().parent_id(node).is_none() {
        return Err(CoreError::invalid(format!(
            "cannot {action} the root node {}",
            tree.store().id(node)
        )));
    }
    Ok(())
}

/// A node may be added to the tree only if it is a live, identified header
/// that nothing else references yet.
fn require_detached(tree: &Tree, node: NodeRef) -> Result<()> {
    let store = tree.store();
    if !store.is_node(node) {
        return Err(CoreError::invalid(format!("{node:?} is not a live node header")));
    }
    let id = store.id(node);
    if id.is_none() {
        return Err(CoreError::invalid(format!("{node:?} has no id")));
    }
    if Some(node) == tree.root() || store.parent_id(node).is_some() || tree.registry().contains(id) {
        return Err(CoreError::invalid(format!(
            "node {id} is already part of the tree"
        )));
    }
    Ok(())
}

/// Move `children` (all currently under `from`) to the end of `to`, in order.
fn transfer_children(tree: &mut Tree, from: NodeRef, to: NodeRef, children: &[NodeRef]) -> Result<()> {
    let store = tree.store_mut();
    for &child in children {
        store.remove_child(from, child)?;
        store.append_child(to, child)?;
    }
    Ok(())
}

fn execute_insert(tree: &mut Tree, parent: NodeId, node: NodeRef, index: Option<usize>) -> Result<Captured> {
    let parent = find(tree, parent)?;
    require_detached(tree, node)?;
    tree.attach(parent, node, index)?;
    Ok(Captured::Inserted { node })
}

fn execute_remove(tree: &mut Tree, id: NodeId) -> Result<Captured> {
    let node = find(tree, id)?;
    reject_root(tree, node, "remove")?;
    let (parent, index) = tree.detach(node)?;
    Ok(Captured::Removed {
        parent,
        index,
        node,
    })
}

fn execute_replace(
    tree: &mut Tree,
    id: NodeId,
    replacement: NodeRef,
    preserve_children: bool,
) -> Result<Captured> {
    let original = find(tree, id)?;
    reject_root(tree, original, "replace")?;
    require_detached(tree, replacement)?;
    if replacement == original {
        return Err(CoreError::invalid(format!("node {id} cannot replace itself")));
    }
    let parent = tree
        .parent(original)
        .ok_or_else(|| CoreError::invalid(format!("node {id} has no registered parent")))?;
    let index = tree
        .store()
        .child_index(parent, original)
        .ok_or_else(|| CoreError::invalid(format!("node {id} is not listed under its parent")))?;

    let prior_children = tree.store().child_count(replacement);
    let moved: Vec<NodeRef> = if preserve_children {
        tree.store().children(original).collect()
    } else {
        Vec::new()
    };
    if let Err(err) = transfer_children(tree, original, replacement, &moved) {
        // Put back whatever already moved; `original` keeps its array
        // capacity, so appending back cannot allocate.
        let partial: Vec<NodeRef> = tree.store().children(replacement).skip(prior_children).collect();
        transfer_children(tree, replacement, original, &partial)?;
        return Err(err);
    }

    tree.detach(original)?;
    tree.attach(parent, replacement, Some(index))?;
    Ok(Captured::Replaced {
        parent,
        index,
        original,
        replacement,
        prior_children,
        moved_children: moved.len(),
    })
}

fn execute_move(tree: &mut Tree, id: NodeId, new_parent: NodeId, index: Option<usize>) -> Result<Captured> {
    let node = find(tree, id)?;
    let to = find(tree, new_parent)?;
    reject_root(tree, node, "move")?;
    if to == node || tree.is_ancestor(node, to) {
        return Err(CoreError::invalid(format!(
            "cannot move node {id} beneath itself"
        )));
    }
    let from = tree
        .parent(node)
        .ok_or_else(|| CoreError::invalid(format!("node {id} has no registered parent")))?;

    let store = tree.store_mut();
    let from_index = store.remove_child(from, node)?;
    if let Err(err) = store.insert_child(to, index.unwrap_or(usize::MAX), node) {
        store.insert_child(from, from_index, node)?;
        return Err(err);
    }
    Ok(Captured::Moved {
        node,
        from,
        from_index,
        to,
    })
}

fn execute_update(tree: &mut Tree, id: NodeId, update: &NodeUpdate) -> Result<Captured> {
    let node = find(tree, id)?;
    let store = tree.store_mut();
    let captured = Captured::Updated {
        node,
        name: store.name_atom(node),
        value: store.value_atom(node),
        attributes: store.attributes_atom(node),
        flags: store.flags(node),
    };
    if let Some(name) = &update.name {
        store.set_name(node, Some(name.as_str()))?;
    }
    if let Some(value) = &update.value {
        store.set_value(node, Some(value.as_str()))?;
    }
    if let Some(attributes) = &update.attributes {
        store.set_attributes(node, attributes)?;
    }
    store.insert_flags(node, NodeFlags::MODIFIED)?;
    Ok(captured)
}
