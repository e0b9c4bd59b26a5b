//! Id-indexed lookup of the nodes reachable from a tree's root.
//!
//! The registry is the only structure in the core that readers may touch
//! while an edit is in flight, so it is backed by a `DashMap`. Writers are
//! still expected to be serialized by the owner of the tree; individual adds
//! and removes are atomic, nothing more.

use crate::tree::{NodeId, NodeRef, NodeStore};
use dashmap::DashMap;
use tracing::debug;

/// Thread-safe map from node id to arena handle.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: DashMap<NodeId, NodeRef>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        NodeRegistry {
            nodes: DashMap::new(),
        }
    }

    /// Register `node` under `id`, returning the handle previously stored.
    pub fn add(&self, id: NodeId, node: NodeRef) -> Option<NodeRef> {
        self.nodes.insert(id, node)
    }

    pub fn remove(&self, id: NodeId) -> Option<NodeRef> {
        self.nodes.remove(&id).map(|(_, node)| node)
    }

    pub fn find(&self, id: NodeId) -> Option<NodeRef> {
        self.nodes.get(&id).map(|entry| *entry)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&self) {
        self.nodes.clear();
    }

    /// All registered ids, sorted.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Register every node in `node`'s subtree. Returns how many were added.
    pub fn add_subtree(&self, store: &NodeStore, node: NodeRef) -> usize {
        let mut added = 0;
        for current in store.traverse(node) {
            self.nodes.insert(store.id(current), current);
            added += 1;
        }
        added
    }

    /// Unregister every node in `node`'s subtree. Returns how many were removed.
    pub fn remove_subtree(&self, store: &NodeStore, node: NodeRef) -> usize {
        store
            .traverse(node)
            .filter(|&current| self.nodes.remove(&store.id(current)).is_some())
            .count()
    }

    /// Clear and re-populate from a full traversal of `root`.
    pub fn rebuild(&self, store: &NodeStore, root: Option<NodeRef>) -> usize {
        self.nodes.clear();
        let count = root.map_or(0, |root| self.add_subtree(store, root));
        debug!(count, "rebuilt node registry");
        count
    }
}
