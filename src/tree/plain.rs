//! Owned projection of a subtree for serialization boundaries.
//!
//! Plugins that need to ship a tree across a process or language boundary get
//! a `PlainNode` instead of arena handles. Building one copies every string;
//! use the store accessors when zero-copy reads are enough.

use super::handle::{NodeId, NodeRef};
use super::header::Span;
use super::kind::NodeKind;
use super::store::{Attributes, NodeStore};
use super::flags::NodeFlags;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A node and its subtree as plain owned data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlainNode {
    /// Id of the source node. Ignored when building nodes from a plain value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub flags: u32,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlainNode>,
}

fn is_zero(flags: &u32) -> bool {
    *flags == 0
}

impl PlainNode {
    pub fn new(kind: NodeKind) -> Self {
        PlainNode {
            id: None,
            kind,
            name: None,
            value: None,
            flags: 0,
            attributes: Attributes::new(),
            span: None,
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_child(mut self, child: PlainNode) -> Self {
        self.children.push(child);
        self
    }

    /// Copy of this subtree with every id cleared, for comparisons that only
    /// care about structure and content.
    pub fn without_ids(&self) -> PlainNode {
        let mut copy = self.clone();
        copy.clear_ids();
        copy
    }

    fn clear_ids(&mut self) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.id = None;
            stack.extend(node.children.iter_mut());
        }
    }

    /// Every id in the subtree, pre-order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.extend(node.id);
            stack.extend(node.children.iter().rev());
        }
        ids
    }

    /// Number of nodes in the subtree.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

// Deep chains would otherwise drop one stack frame per level.
impl Drop for PlainNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

impl NodeStore {
    /// Project `node`'s subtree into owned data.
    pub fn to_plain(&self, node: NodeRef) -> PlainNode {
        // Each frame holds a partly built node and its unvisited children,
        // last child first.
        let mut stack = vec![self.plain_frame(node)];
        while let Some((_, pending)) = stack.last_mut() {
            if let Some(child) = pending.pop() {
                stack.push(self.plain_frame(child));
            } else if stack.len() == 1 {
                break;
            } else if let Some((done, _)) = stack.pop() {
                if let Some((parent, _)) = stack.last_mut() {
                    parent.children.push(done);
                }
            }
        }
        stack.swap_remove(0).0
    }

    fn plain_frame(&self, node: NodeRef) -> (PlainNode, Vec<NodeRef>) {
        let span = self.span(node);
        let plain = PlainNode {
            id: Some(self.id(node)).filter(|id| id.is_some()),
            kind: self.kind(node),
            name: self.name(node).map(str::to_string),
            value: self.value(node).map(str::to_string),
            flags: self.flags(node).bits(),
            attributes: self.attributes(node),
            span: (span != Span::default()).then_some(span),
            children: Vec::with_capacity(self.child_count(node)),
        };
        let mut pending: Vec<NodeRef> = self.children(node).collect();
        pending.reverse();
        (plain, pending)
    }

    /// Build a detached subtree from owned data. Every node gets a fresh id.
    ///
    /// Nodes are created in pre-order and linked to their parent while still
    /// leaves, so attaching never walks an already built subtree.
    pub fn from_plain(&mut self, plain: &PlainNode) -> Result<NodeRef> {
        let root = self.create_from_plain(plain)?;
        let mut stack: Vec<(NodeRef, &PlainNode)> =
            plain.children.iter().rev().map(|child| (root, child)).collect();
        while let Some((parent, plain)) = stack.pop() {
            let node = self.create_from_plain(plain)?;
            self.append_child(parent, node)?;
            stack.extend(plain.children.iter().rev().map(|child| (node, child)));
        }
        Ok(root)
    }

    fn create_from_plain(&mut self, plain: &PlainNode) -> Result<NodeRef> {
        let node = self.create(
            plain.kind,
            plain.name.as_deref(),
            plain.value.as_deref(),
            plain.span,
        )?;
        self.assign_id(node)?;
        if plain.flags != 0 {
            self.set_flags(node, NodeFlags::from_bits_retain(plain.flags))?;
        }
        if !plain.attributes.is_empty() {
            self.set_attributes(node, &plain.attributes)?;
        }
        Ok(node)
    }
}
