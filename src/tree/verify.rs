//! Structural invariant checks.
//!
//! Used by tests after every edit, and by observers that want to validate
//! the tree after each modification.

use super::handle::{NodeId, NodeRef};
use super::Tree;
use rustc_hash::FxHashSet;
use std::fmt;

/// One broken invariant found by [`Tree::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The root has a parent id or a non-zero depth.
    RootNotTopLevel { root: NodeId, parent: NodeId, depth: u32 },
    /// A child's parent id does not name the node that lists it.
    ParentMismatch { node: NodeId, listed_under: NodeId, parent: NodeId },
    /// `depth(child) != depth(parent) + 1`.
    DepthMismatch { node: NodeId, expected: u32, actual: u32 },
    /// Two reachable headers share an id.
    DuplicateId(NodeId),
    /// The same header is reachable twice.
    AliasedNode(NodeRef),
    /// A reachable node has no id.
    MissingId(NodeRef),
    /// A reachable node is missing from the registry or mapped elsewhere.
    NotRegistered(NodeId),
    /// The registry holds an id that is not reachable from the root.
    StaleRegistryEntry(NodeId),
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::RootNotTopLevel {
                root,
                parent,
                depth,
            } => write!(f, "root {root} has parent {parent} and depth {depth}"),
            InvariantViolation::ParentMismatch {
                node,
                listed_under,
                parent,
            } => write!(
                f,
                "node {node} is listed under {listed_under} but records parent {parent}"
            ),
            InvariantViolation::DepthMismatch {
                node,
                expected,
                actual,
            } => write!(f, "node {node} has depth {actual}, expected {expected}"),
            InvariantViolation::DuplicateId(id) => write!(f, "id {id} is used by two nodes"),
            InvariantViolation::AliasedNode(node) => write!(f, "{node:?} is reachable twice"),
            InvariantViolation::MissingId(node) => write!(f, "{node:?} has no id"),
            InvariantViolation::NotRegistered(id) => write!(f, "node {id} is not registered"),
            InvariantViolation::StaleRegistryEntry(id) => {
                write!(f, "registry holds unreachable node {id}")
            }
        }
    }
}

impl Tree {
    /// Check parent links, depths, id uniqueness, and registry agreement.
    /// Returns every violation found; an empty vector means the tree is sound.
    pub fn verify(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        let store = self.store();
        let Some(root) = self.root() else {
            violations.extend(self.registry().ids().into_iter().map(InvariantViolation::StaleRegistryEntry));
            return violations;
        };

        if store.parent_id(root).is_some() || store.depth(root) != 0 {
            violations.push(InvariantViolation::RootNotTopLevel {
                root: store.id(root),
                parent: store.parent_id(root),
                depth: store.depth(root),
            });
        }

        let mut seen_refs = FxHashSet::default();
        let mut seen_ids = FxHashSet::default();
        for node in store.traverse(root) {
            if !seen_refs.insert(node) {
                violations.push(InvariantViolation::AliasedNode(node));
                // Stop: an aliased node means the walk may not terminate.
                return violations;
            }
            let id = store.id(node);
            if id.is_none() {
                violations.push(InvariantViolation::MissingId(node));
            } else if !seen_ids.insert(id) {
                violations.push(InvariantViolation::DuplicateId(id));
            } else if self.registry().find(id) != Some(node) {
                violations.push(InvariantViolation::NotRegistered(id));
            }

            let expected = store.depth(node) + 1;
            for child in store.children(node) {
                let child_id = store.id(child);
                if store.parent_id(child) != id {
                    violations.push(InvariantViolation::ParentMismatch {
                        node: child_id,
                        listed_under: id,
                        parent: store.parent_id(child),
                    });
                }
                if store.depth(child) != expected {
                    violations.push(InvariantViolation::DepthMismatch {
                        node: child_id,
                        expected,
                        actual: store.depth(child),
                    });
                }
            }
        }

        for id in self.registry().ids() {
            if !seen_ids.contains(&id) {
                violations.push(InvariantViolation::StaleRegistryEntry(id));
            }
        }
        violations
    }
}
