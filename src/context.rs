//! Context-aware editing.
//!
//! `EditSession` resolves an edit's target from a node id or a source
//! location, collects the nodes around it, runs the registered hooks, and
//! pushes the edit through the engine. Callers always get an [`EditResult`];
//! no error crosses [`EditSession::edit_with_context`].

use crate::config::SessionConfig;
use crate::edit::{EditEngine, NodeUpdate, OperationId};
use crate::error::{CoreError, Result};
use crate::tree::{NodeId, NodeKind, NodeRef, PlainNode, Span, Tree};
use cograph_common::{LocationTracker, Position};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use tracing::{debug, debug_span, trace};

/// How an edit names the node it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "camelCase")]
pub enum EditTarget {
    Node { id: NodeId },
    /// Deepest node whose span contains the byte offset.
    Offset { offset: u32 },
    /// Same as `Offset`, after converting a 0-based line and byte column.
    LineColumn { line: u32, column: u32 },
}

/// What to do at the target. For `Insert` the target is the new parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditAction {
    Insert {
        node: PlainNode,
        #[serde(default)]
        index: Option<usize>,
    },
    Update(NodeUpdate),
    Delete,
    #[serde(rename_all = "camelCase")]
    Move {
        new_parent: NodeId,
        #[serde(default)]
        index: Option<usize>,
    },
}

impl EditAction {
    pub fn name(&self) -> &'static str {
        match self {
            EditAction::Insert { .. } => "insert",
            EditAction::Update(_) => "update",
            EditAction::Delete => "delete",
            EditAction::Move { .. } => "move",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEdit {
    pub target: EditTarget,
    pub action: EditAction,
}

impl ContextEdit {
    pub fn new(target: EditTarget, action: EditAction) -> Self {
        ContextEdit { target, action }
    }

    pub fn at_node(id: NodeId, action: EditAction) -> Self {
        Self::new(EditTarget::Node { id }, action)
    }
}

/// What hooks see about an edit before and after it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditContext {
    pub action: &'static str,
    pub target: NodeId,
    pub target_kind: NodeKind,
    /// Source position of the target, when known.
    pub position: Option<Position>,
    /// The target's parent's other children, in order.
    pub siblings: SmallVec<[NodeId; 8]>,
    /// Nearest first, at most `context_radius` of them.
    pub ancestors: SmallVec<[NodeId; 4]>,
}

/// Outcome of a façade edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationId>,
    /// The inserted, updated, deleted or moved node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EditResult {
    pub fn succeeded(operation: OperationId, node: NodeId) -> Self {
        EditResult {
            success: true,
            operation: Some(operation),
            node: Some(node),
            error: None,
        }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        EditResult {
            success: false,
            operation: None,
            node: None,
            error: Some(error.to_string()),
        }
    }
}

/// Callbacks run around every façade edit. Return values are not consumed.
pub trait EditHook {
    fn before_edit(&mut self, _context: &EditContext) {}
    fn after_edit(&mut self, _context: &EditContext, _result: &EditResult) {}
}

/// A tree, its edit history, optional source text, and edit hooks.
pub struct EditSession {
    tree: Tree,
    engine: EditEngine,
    tracker: Option<LocationTracker>,
    hooks: IndexMap<String, Box<dyn EditHook>>,
    context_radius: usize,
}

impl fmt::Debug for EditSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSession")
            .field("tree", &self.tree)
            .field("engine", &self.engine)
            .field("has_source", &self.tracker.is_some())
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("context_radius", &self.context_radius)
            .finish()
    }
}

impl EditSession {
    pub fn new(tree: Tree, config: &SessionConfig) -> Self {
        EditSession {
            tree,
            engine: config.new_engine(),
            tracker: None,
            hooks: IndexMap::new(),
            context_radius: config.context_radius,
        }
    }

    /// Attach source text so line/column targets can be resolved.
    pub fn with_source(mut self, source: &str) -> Self {
        self.set_source(source);
        self
    }

    pub fn set_source(&mut self, source: &str) {
        self.tracker = Some(LocationTracker::new(source));
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn engine(&self) -> &EditEngine {
        &self.engine
    }

    /// For registering observers. Operations executed here bypass hooks.
    pub fn engine_mut(&mut self) -> &mut EditEngine {
        &mut self.engine
    }

    pub fn tracker(&self) -> Option<&LocationTracker> {
        self.tracker.as_ref()
    }

    pub fn context_radius(&self) -> usize {
        self.context_radius
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    // =========================================================================
    // Hooks
    // =========================================================================

    /// Register `hook` under `name`, replacing any hook already registered
    /// under it. Returns whether one was replaced.
    pub fn register_hook(&mut self, name: impl Into<String>, hook: impl EditHook + 'static) -> bool {
        self.hooks.insert(name.into(), Box::new(hook)).is_some()
    }

    pub fn unregister_hook(&mut self, name: &str) -> bool {
        self.hooks.shift_remove(name).is_some()
    }

    /// Registered hook names, in call order.
    pub fn hook_names(&self) -> impl Iterator<Item = &str> {
        self.hooks.keys().map(String::as_str)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Resolve, notify hooks, execute. Every failure becomes a failed result.
    pub fn edit_with_context(&mut self, edit: &ContextEdit) -> EditResult {
        let span = debug_span!("edit_with_context", action = edit.action.name());
        let _enter = span.enter();

        let context = match self.context_for(edit) {
            Ok(context) => context,
            Err(err) => {
                debug!(%err, "could not resolve edit target");
                return EditResult::failed(err);
            }
        };
        trace!(node = %context.target, siblings = context.siblings.len(), "resolved edit context");

        for hook in self.hooks.values_mut() {
            hook.before_edit(&context);
        }
        let result = match self.apply(&context, &edit.action) {
            Ok((operation, node)) => EditResult::succeeded(operation, node),
            Err(err) => {
                debug!(%err, "edit failed");
                EditResult::failed(err)
            }
        };
        for hook in self.hooks.values_mut() {
            hook.after_edit(&context, &result);
        }
        result
    }

    pub fn undo(&mut self) -> Result<OperationId> {
        self.engine.undo(&mut self.tree)
    }

    pub fn redo(&mut self) -> Result<OperationId> {
        self.engine.redo(&mut self.tree)
    }

    fn apply(&mut self, context: &EditContext, action: &EditAction) -> Result<(OperationId, NodeId)> {
        let target = context.target;
        match action {
            EditAction::Insert { node, index } => {
                let node = self.tree.store_mut().from_plain(node)?;
                let id = self.tree.store().id(node);
                let operation = self.engine.insert(&mut self.tree, target, node, *index)?;
                Ok((operation, id))
            }
            EditAction::Update(update) => {
                let operation = self.engine.update(&mut self.tree, target, update.clone())?;
                Ok((operation, target))
            }
            EditAction::Delete => {
                let operation = self.engine.remove(&mut self.tree, target)?;
                Ok((operation, target))
            }
            EditAction::Move { new_parent, index } => {
                let operation = self
                    .engine
                    .move_node(&mut self.tree, target, *new_parent, *index)?;
                Ok((operation, target))
            }
        }
    }

    // =========================================================================
    // Location
    // =========================================================================

    /// Resolve `target` to a reachable node and, when known, its position.
    pub fn locate(&self, target: &EditTarget) -> Result<(NodeRef, Option<Position>)> {
        match *target {
            EditTarget::Node { id } => {
                let node = self.tree.find(id).ok_or(CoreError::NotFound(id))?;
                let span = self.tree.store().span(node);
                Ok((node, (span != Span::default()).then_some(span.start)))
            }
            EditTarget::Offset { offset } => {
                let position = match &self.tracker {
                    Some(tracker) => Some(tracker.position_at(offset)?),
                    None => None,
                };
                Ok((self.node_at(offset)?, position))
            }
            EditTarget::LineColumn { line, column } => {
                let tracker = self.tracker.as_ref().ok_or_else(|| {
                    CoreError::invalid("line/column targets need source text")
                })?;
                let position = tracker.position_at_line_column(line, column)?;
                Ok((self.node_at(position.offset)?, Some(position)))
            }
        }
    }

    fn node_at(&self, offset: u32) -> Result<NodeRef> {
        self.tree
            .node_at_offset(offset)
            .ok_or_else(|| CoreError::invalid("the tree has no root"))
    }

    /// Build the context hooks would see for `edit`.
    pub fn context_for(&self, edit: &ContextEdit) -> Result<EditContext> {
        let (node, position) = self.locate(&edit.target)?;
        let store = self.tree.store();
        let siblings = match self.tree.parent(node) {
            Some(parent) => store
                .children(parent)
                .filter(|&child| child != node)
                .map(|child| store.id(child))
                .collect(),
            None => SmallVec::new(),
        };
        let ancestors = self
            .tree
            .ancestors(node)
            .take(self.context_radius)
            .map(|ancestor| store.id(ancestor))
            .collect();
        Ok(EditContext {
            action: edit.action.name(),
            target: store.id(node),
            target_kind: store.kind(node),
            position,
            siblings,
            ancestors,
        })
    }
}
