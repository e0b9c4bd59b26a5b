//! Depth-first traversal over a node store.

use super::handle::NodeRef;
use super::store::NodeStore;
use smallvec::SmallVec;

/// Lazy pre-order iterator: a node, then each child's subtree in order.
///
/// The iterator holds only an explicit stack of handles; children are read
/// from the arena as each node is visited. Create a fresh iterator to walk
/// the same subtree again.
pub struct Traverse<'a> {
    store: &'a NodeStore,
    stack: SmallVec<[NodeRef; 32]>,
}

impl<'a> Traverse<'a> {
    pub(crate) fn new(store: &'a NodeStore, start: NodeRef) -> Self {
        let mut stack = SmallVec::new();
        if store.is_node(start) {
            stack.push(start);
        }
        Traverse { store, stack }
    }
}

impl Iterator for Traverse<'_> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let node = self.stack.pop()?;
        let count = self.store.child_count(node);
        // Push in reverse so the first child is visited next.
        for index in (0..count).rev() {
            if let Some(child) = self.store.child(node, index) {
                self.stack.push(child);
            }
        }
        Some(node)
    }
}

/// Iterator over the direct children of a node.
pub struct Children<'a> {
    store: &'a NodeStore,
    node: NodeRef,
    index: usize,
    count: usize,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a NodeStore, node: NodeRef) -> Self {
        Children {
            store,
            node,
            index: 0,
            count: store.child_count(node),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        while self.index < self.count {
            let index = self.index;
            self.index += 1;
            if let Some(child) = self.store.child(self.node, index) {
                return Some(child);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.count - self.index))
    }
}
