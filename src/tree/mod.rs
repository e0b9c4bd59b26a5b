//! The syntax tree: node storage plus the id registry of reachable nodes.
//!
//! `Tree` is the producer and consumer interface. Parsers build nodes with
//! [`Tree::create_root`] / [`Tree::create_node`] and link them with
//! [`Tree::append_child`]; plugins read through [`Tree::store`] and the
//! plain-object projection. Structural edits that need undo go through the
//! edit engine, which uses the crate-private attach/detach primitives here.

mod flags;
mod handle;
pub mod header;
mod kind;
mod plain;
mod store;
mod traverse;
mod verify;

pub use flags::NodeFlags;
pub use handle::{NodeId, NodeRef};
pub use header::{HEADER_SIZE, NodeHeader, Span};
pub use kind::NodeKind;
pub use plain::PlainNode;
pub use store::{Attributes, ChildGrowth, NodeDisplay, NodeStore};
pub use traverse::{Children, Traverse};
pub use verify::InvariantViolation;

use crate::error::{CoreError, Result};
use crate::registry::NodeRegistry;
use cograph_common::limits::MAX_LOCATE_DEPTH;
use std::sync::Arc;
use tracing::debug;

/// Summary numbers for a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub nodes: usize,
    pub max_depth: u32,
    pub max_children: usize,
    pub arena_used: usize,
    pub arena_capacity: usize,
    pub interned_strings: usize,
}

/// A rooted tree of arena-stored nodes with an id registry.
#[derive(Debug)]
pub struct Tree {
    store: NodeStore,
    registry: Arc<NodeRegistry>,
    root: Option<NodeRef>,
}

impl Tree {
    /// Create an empty tree over an arena of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self::from_store(NodeStore::new(capacity))
    }

    pub fn from_store(store: NodeStore) -> Self {
        Tree {
            store,
            registry: Arc::new(NodeRegistry::new()),
            root: None,
        }
    }

    /// Build a tree whose root is a copy of `plain`.
    pub fn from_plain(store: NodeStore, plain: &PlainNode) -> Result<Self> {
        let mut tree = Self::from_store(store);
        let root = tree.store.from_plain(plain)?;
        tree.set_root(root)?;
        Ok(tree)
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Mutable access to the raw store.
    ///
    /// Structural changes made here bypass the registry; call
    /// [`Tree::rebuild_registry`] afterwards.
    pub fn store_mut(&mut self) -> &mut NodeStore {
        &mut self.store
    }

    /// Shared handle to the registry, for concurrent readers.
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn root(&self) -> Option<NodeRef> {
        self.root
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root.map(|root| self.store.id(root))
    }

    // =========================================================================
    // Producer interface
    // =========================================================================

    /// Create a node with a fresh id and make it the root.
    pub fn create_root(&mut self, kind: NodeKind, name: Option<&str>) -> Result<NodeRef> {
        let root = self.create_node(kind, name, None, None)?;
        self.set_root(root)?;
        Ok(root)
    }

    /// Create a detached node with a fresh id.
    pub fn create_node(
        &mut self,
        kind: NodeKind,
        name: Option<&str>,
        value: Option<&str>,
        span: Option<Span>,
    ) -> Result<NodeRef> {
        let node = self.store.create(kind, name, value, span)?;
        self.store.assign_id(node)?;
        Ok(node)
    }

    /// Make a detached node the root and re-index the registry from it.
    pub fn set_root(&mut self, node: NodeRef) -> Result<()> {
        self.store.check(node)?;
        if self.store.parent_id(node).is_some() {
            return Err(CoreError::invalid(format!(
                "node {} has a parent and cannot become the root",
                self.store.id(node)
            )));
        }
        self.root = Some(node);
        self.rebuild_registry();
        Ok(())
    }

    /// Append `child` under `parent`, registering it if `parent` is reachable.
    pub fn append_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<usize> {
        self.attach(parent, child, None)
    }

    /// Shallow copy of `node` with a fresh id, detached.
    pub fn clone_node(&mut self, node: NodeRef) -> Result<NodeRef> {
        self.store.clone_node(node)
    }

    /// Disjoint copy of `node`'s subtree with fresh ids, detached.
    pub fn deep_clone(&mut self, node: NodeRef) -> Result<NodeRef> {
        self.store.deep_clone(node)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn find(&self, id: NodeId) -> Option<NodeRef> {
        self.registry.find(id)
    }

    /// Whether `node` is reachable from the root.
    pub fn contains(&self, node: NodeRef) -> bool {
        self.store.is_node(node) && self.registry.find(self.store.id(node)) == Some(node)
    }

    /// Parent of a reachable node.
    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        let parent = self.store.parent_id(node);
        if parent.is_none() {
            return None;
        }
        self.registry.find(parent)
    }

    /// Parent, grandparent, and so on up to the root.
    pub fn ancestors(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        std::iter::successors(self.parent(node), move |&current| self.parent(current))
    }

    /// Whether `ancestor` lies on the path from `node` to the root.
    pub fn is_ancestor(&self, ancestor: NodeRef, node: NodeRef) -> bool {
        self.ancestors(node).any(|current| current == ancestor)
    }

    /// Pre-order walk of the whole tree.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.root
            .into_iter()
            .flat_map(move |root| self.store.traverse(root))
    }

    /// Deepest node whose span contains `offset`.
    ///
    /// The root matches any offset; below it, the first child whose span
    /// contains the offset is followed. Nodes without a span never match.
    pub fn node_at_offset(&self, offset: u32) -> Option<NodeRef> {
        let mut current = self.root?;
        for _ in 0..MAX_LOCATE_DEPTH {
            let next = self.store.find_child(current, |child| {
                let span = self.store.span(child);
                span != Span::default() && span.contains_offset(offset)
            });
            match next {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
        debug!(
            offset,
            depth = MAX_LOCATE_DEPTH,
            node = %self.store.id(current),
            "offset lookup stopped at depth limit"
        );
        Some(current)
    }

    pub fn to_plain(&self) -> Option<PlainNode> {
        self.root.map(|root| self.store.to_plain(root))
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            arena_used: self.store.arena().used(),
            arena_capacity: self.store.arena().capacity(),
            interned_strings: self.store.interner().len(),
            ..TreeStats::default()
        };
        for node in self.nodes() {
            stats.nodes += 1;
            stats.max_depth = stats.max_depth.max(self.store.depth(node));
            stats.max_children = stats.max_children.max(self.store.child_count(node));
        }
        stats
    }

    // =========================================================================
    // Registry maintenance
    // =========================================================================

    /// Re-index every node reachable from the root.
    pub fn rebuild_registry(&self) -> usize {
        self.registry.rebuild(&self.store, self.root)
    }

    /// Insert `node` under `parent` and index its subtree when `parent` is
    /// reachable. Returns the index used.
    pub(crate) fn attach(&mut self, parent: NodeRef, node: NodeRef, index: Option<usize>) -> Result<usize> {
        if Some(node) == self.root {
            return Err(CoreError::invalid("the root cannot be attached under another node"));
        }
        let index = self
            .store
            .insert_child(parent, index.unwrap_or(usize::MAX), node)?;
        if self.contains(parent) {
            let added = self.registry.add_subtree(&self.store, node);
            debug!(node = %self.store.id(node), added, "indexed attached subtree");
        }
        Ok(index)
    }

    /// Detach a reachable non-root node and unindex its subtree. Returns the
    /// former parent and index.
    pub(crate) fn detach(&mut self, node: NodeRef) -> Result<(NodeRef, usize)> {
        let parent = self.parent(node).ok_or_else(|| {
            CoreError::invalid(format!(
                "node {} has no parent to detach from",
                self.store.id(node)
            ))
        })?;
        let index = self.store.remove_child(parent, node)?;
        let removed = self.registry.remove_subtree(&self.store, node);
        debug!(node = %self.store.id(node), removed, "unindexed detached subtree");
        Ok((parent, index))
    }
}
