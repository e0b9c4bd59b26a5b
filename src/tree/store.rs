//! Zero-copy node storage.
//!
//! Node headers and child arrays live in a single [`Arena`]; strings live in
//! the store's [`Interner`]. Every accessor reads the field straight out of the
//! arena bytes, and every mutation writes it back in place, so nothing is
//! materialized unless a caller asks for an owned projection.

use super::flags::NodeFlags;
use super::handle::{NodeId, NodeRef};
use super::header::{CHILD_WIDTH, ChildList, HEADER_SIZE, NodeHeader, Span, field};
use super::kind::NodeKind;
use super::traverse::{Children, Traverse};
use crate::arena::{Arena, ArenaPtr};
use crate::error::{CoreError, Result};
use cograph_common::limits::{HEADER_ALIGN, MAX_CHILD_CAPACITY};
use cograph_common::{Atom, Interner};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// Attribute map of a node. Keys are kept sorted so equal maps encode to the
/// same blob and therefore intern to the same atom.
pub type Attributes = BTreeMap<String, String>;

/// How a full children array is grown on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildGrowth {
    /// Reallocate to exactly `count + 1` slots on every append.
    Exact,
    /// Double the capacity when full.
    #[default]
    Doubling,
}

impl ChildGrowth {
    fn next_capacity(self, current: u32) -> u32 {
        match self {
            ChildGrowth::Exact => current + 1,
            ChildGrowth::Doubling => (current * 2).max(1),
        }
    }
}

/// Arena-backed node storage with interned strings.
#[derive(Debug)]
pub struct NodeStore {
    arena: Arena,
    interner: Interner,
    growth: ChildGrowth,
}

impl NodeStore {
    /// Create a store over a fresh arena of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self::from_parts(Arena::new(capacity), Interner::new(), ChildGrowth::default())
    }

    pub fn from_parts(arena: Arena, interner: Interner, growth: ChildGrowth) -> Self {
        NodeStore {
            arena,
            interner,
            growth,
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Direct arena access, for checkpoints and rollbacks.
    ///
    /// Rolling back past a live header invalidates every handle to it.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    pub fn growth(&self) -> ChildGrowth {
        self.growth
    }

    pub fn set_growth(&mut self, growth: ChildGrowth) {
        self.growth = growth;
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Allocate a new node header.
    ///
    /// Relationship fields start zeroed: no id, no parent, depth 0, no
    /// children. The owning tree assigns the id.
    pub fn create(
        &mut self,
        kind: NodeKind,
        name: Option<&str>,
        value: Option<&str>,
        span: Option<Span>,
    ) -> Result<NodeRef> {
        let name = self.interner.intern_opt(name);
        let value = self.interner.intern_opt(value);
        self.create_raw(kind, name, value, span.unwrap_or_default())
    }

    fn create_raw(&mut self, kind: NodeKind, name: Atom, value: Atom, span: Span) -> Result<NodeRef> {
        let ptr = self.arena.allocate(HEADER_SIZE, HEADER_ALIGN)?;
        let node = NodeRef(ptr.offset());
        self.set_u32(node, field::KIND, kind.as_u32())?;
        self.set_u32(node, field::NAME, name.0)?;
        self.set_u32(node, field::VALUE, value.0)?;
        self.set_span(node, span)?;
        trace!(offset = ptr.offset(), %kind, "created node header");
        Ok(node)
    }

    /// Give `node` a fresh process-unique id.
    pub fn assign_id(&mut self, node: NodeRef) -> Result<NodeId> {
        self.check(node)?;
        let id = NodeId::fresh();
        self.set_u32(node, field::ID, id.0)?;
        Ok(id)
    }

    // =========================================================================
    // Header fields
    // =========================================================================

    /// Whether `node` points at a header inside the live arena region.
    #[inline]
    pub fn is_node(&self, node: NodeRef) -> bool {
        node.offset() % HEADER_ALIGN == 0 && node.offset() + HEADER_SIZE <= self.arena.used()
    }

    pub(crate) fn check(&self, node: NodeRef) -> Result<()> {
        if self.is_node(node) {
            Ok(())
        } else {
            Err(CoreError::invalid(format!("{node:?} is not a live node header")))
        }
    }

    #[inline]
    fn get_u32(&self, node: NodeRef, at: usize) -> u32 {
        self.arena.read_u32(node.offset() + at)
    }

    #[inline]
    fn set_u32(&mut self, node: NodeRef, at: usize, value: u32) -> Result<()> {
        self.arena.write_u32(node.offset() + at, value)
    }

    /// Decode a full copy of the header.
    pub fn header(&self, node: NodeRef) -> Option<NodeHeader> {
        let bytes = self
            .arena
            .bytes(ArenaPtr::new(node.0, HEADER_SIZE as u32))
            .ok()?;
        NodeHeader::from_bytes(bytes)
    }

    pub fn kind(&self, node: NodeRef) -> NodeKind {
        NodeKind::from_u32(self.get_u32(node, field::KIND))
    }

    pub fn id(&self, node: NodeRef) -> NodeId {
        NodeId(self.get_u32(node, field::ID))
    }

    pub fn parent_id(&self, node: NodeRef) -> NodeId {
        NodeId(self.get_u32(node, field::PARENT))
    }

    pub fn depth(&self, node: NodeRef) -> u32 {
        self.get_u32(node, field::DEPTH)
    }

    pub fn flags(&self, node: NodeRef) -> NodeFlags {
        NodeFlags::from_bits_retain(self.get_u32(node, field::FLAGS))
    }

    pub fn name_atom(&self, node: NodeRef) -> Atom {
        Atom(self.get_u32(node, field::NAME))
    }

    pub fn value_atom(&self, node: NodeRef) -> Atom {
        Atom(self.get_u32(node, field::VALUE))
    }

    pub fn attributes_atom(&self, node: NodeRef) -> Atom {
        Atom(self.arena.read_u64(node.offset() + field::ATTRIBUTES) as u32)
    }

    pub fn name(&self, node: NodeRef) -> Option<&str> {
        self.interner.resolve_opt(self.name_atom(node))
    }

    pub fn value(&self, node: NodeRef) -> Option<&str> {
        self.interner.resolve_opt(self.value_atom(node))
    }

    pub fn child_count(&self, node: NodeRef) -> usize {
        self.get_u32(node, field::CHILD_COUNT) as usize
    }

    pub fn span(&self, node: NodeRef) -> Span {
        let mut words = [0u32; 6];
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.get_u32(node, field::SPAN + i * 4);
        }
        Span::from_words(words)
    }

    pub(crate) fn set_parent_id(&mut self, node: NodeRef, parent: NodeId) -> Result<()> {
        self.set_u32(node, field::PARENT, parent.0)
    }

    pub(crate) fn set_depth(&mut self, node: NodeRef, depth: u32) -> Result<()> {
        self.set_u32(node, field::DEPTH, depth)
    }

    pub fn set_flags(&mut self, node: NodeRef, flags: NodeFlags) -> Result<()> {
        self.check(node)?;
        self.set_u32(node, field::FLAGS, flags.bits())
    }

    pub fn insert_flags(&mut self, node: NodeRef, flags: NodeFlags) -> Result<()> {
        let merged = self.flags(node) | flags;
        self.set_flags(node, merged)
    }

    pub fn set_span(&mut self, node: NodeRef, span: Span) -> Result<()> {
        self.check(node)?;
        for (i, word) in span.to_words().into_iter().enumerate() {
            self.set_u32(node, field::SPAN + i * 4, word)?;
        }
        Ok(())
    }

    pub fn set_name(&mut self, node: NodeRef, name: Option<&str>) -> Result<()> {
        let atom = self.interner.intern_opt(name);
        self.set_name_atom(node, atom)
    }

    pub fn set_value(&mut self, node: NodeRef, value: Option<&str>) -> Result<()> {
        let atom = self.interner.intern_opt(value);
        self.set_value_atom(node, atom)
    }

    pub(crate) fn set_name_atom(&mut self, node: NodeRef, atom: Atom) -> Result<()> {
        self.check(node)?;
        self.set_u32(node, field::NAME, atom.0)
    }

    pub(crate) fn set_value_atom(&mut self, node: NodeRef, atom: Atom) -> Result<()> {
        self.check(node)?;
        self.set_u32(node, field::VALUE, atom.0)
    }

    pub(crate) fn set_attributes_atom(&mut self, node: NodeRef, atom: Atom) -> Result<()> {
        self.check(node)?;
        self.arena
            .write_u64(node.offset() + field::ATTRIBUTES, atom.0 as u64)
    }

    // =========================================================================
    // Children
    // =========================================================================

    fn child_list(&self, node: NodeRef) -> ChildList {
        ChildList::decode(self.arena.read_u64(node.offset() + field::CHILDREN))
    }

    /// Child at `index`, or `None` when out of range.
    pub fn child(&self, node: NodeRef, index: usize) -> Option<NodeRef> {
        if index >= self.child_count(node) {
            return None;
        }
        let slot = self.child_list(node).slot(index);
        Some(NodeRef(self.arena.read_u32(slot)))
    }

    pub fn children(&self, node: NodeRef) -> Children<'_> {
        Children::new(self, node)
    }

    pub fn find_child(&self, node: NodeRef, mut pred: impl FnMut(NodeRef) -> bool) -> Option<NodeRef> {
        self.children(node).find(|&child| pred(child))
    }

    pub fn find_children(&self, node: NodeRef, mut pred: impl FnMut(NodeRef) -> bool) -> Vec<NodeRef> {
        self.children(node).filter(|&child| pred(child)).collect()
    }

    pub fn child_index(&self, parent: NodeRef, child: NodeRef) -> Option<usize> {
        self.children(parent).position(|c| c == child)
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<usize> {
        self.insert_child(parent, usize::MAX, child)
    }

    /// Insert `child` under `parent` at `index` (clamped to the end).
    ///
    /// `child` must be detached. Sets its parent id and re-derives depths for
    /// its whole subtree. Returns the index actually used.
    pub fn insert_child(&mut self, parent: NodeRef, index: usize, child: NodeRef) -> Result<usize> {
        self.check(parent)?;
        self.check(child)?;
        let parent_id = self.id(parent);
        if parent_id.is_none() {
            return Err(CoreError::invalid("parent node has no id"));
        }
        if self.parent_id(child).is_some() {
            return Err(CoreError::invalid(format!(
                "node {} already has parent {}",
                self.id(child),
                self.parent_id(child)
            )));
        }
        if self.traverse(child).any(|n| n == parent) {
            return Err(CoreError::invalid(format!(
                "cannot attach node {} beneath itself",
                self.id(child)
            )));
        }

        let count = self.child_count(parent);
        let index = index.min(count);
        let list = self.child_list(parent);
        let width = CHILD_WIDTH as usize;

        if count as u32 >= list.capacity {
            let capacity = self.growth.next_capacity(list.capacity);
            if capacity > MAX_CHILD_CAPACITY {
                return Err(CoreError::invalid(format!(
                    "node {parent_id} cannot hold more than {MAX_CHILD_CAPACITY} children"
                )));
            }
            let ptr = self.arena.allocate(capacity as usize * width, width)?;
            let grown = ChildList::new(ptr.offset(), capacity);
            if index > 0 {
                self.arena.copy_within(list.slot(0), index * width, grown.slot(0))?;
            }
            if count > index {
                self.arena
                    .copy_within(list.slot(index), (count - index) * width, grown.slot(index + 1))?;
            }
            self.arena.write_u32(grown.slot(index), child.0)?;
            self.arena
                .write_u64(parent.offset() + field::CHILDREN, grown.encode())?;
            trace!(parent = %parent_id, capacity, "grew children array");
        } else {
            if count > index {
                self.arena
                    .copy_within(list.slot(index), (count - index) * width, list.slot(index + 1))?;
            }
            self.arena.write_u32(list.slot(index), child.0)?;
        }

        self.set_u32(parent, field::CHILD_COUNT, count as u32 + 1)?;
        self.set_parent_id(child, parent_id)?;
        let depth = self.depth(parent) + 1;
        self.relevel(child, depth)?;
        Ok(index)
    }

    /// Detach `child` from `parent`, returning the index it occupied.
    ///
    /// The detached subtree keeps its children; its root gets depth 0.
    pub fn remove_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<usize> {
        self.check(parent)?;
        let index = self.child_index(parent, child).ok_or_else(|| {
            CoreError::invalid(format!(
                "node {} is not a child of node {}",
                self.id(child),
                self.id(parent)
            ))
        })?;
        let count = self.child_count(parent);
        let list = self.child_list(parent);
        let width = CHILD_WIDTH as usize;
        if index + 1 < count {
            self.arena
                .copy_within(list.slot(index + 1), (count - index - 1) * width, list.slot(index))?;
        }
        self.set_u32(parent, field::CHILD_COUNT, count as u32 - 1)?;
        self.set_parent_id(child, NodeId::NONE)?;
        self.relevel(child, 0)?;
        Ok(index)
    }

    /// Set `node`'s depth and propagate it down the subtree.
    fn relevel(&mut self, node: NodeRef, depth: u32) -> Result<()> {
        let mut stack: SmallVec<[(NodeRef, u32); 32]> = SmallVec::new();
        stack.push((node, depth));
        while let Some((current, depth)) = stack.pop() {
            self.set_depth(current, depth)?;
            for index in 0..self.child_count(current) {
                if let Some(child) = self.child(current, index) {
                    stack.push((child, depth + 1));
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Traversal and copies
    // =========================================================================

    /// Lazy pre-order walk of `node`'s subtree.
    pub fn traverse(&self, node: NodeRef) -> Traverse<'_> {
        Traverse::new(self, node)
    }

    pub fn subtree_size(&self, node: NodeRef) -> usize {
        self.traverse(node).count()
    }

    /// Shallow copy: same kind, name, value, span, flags and attributes, a
    /// fresh id, and no parent or children.
    pub fn clone_node(&mut self, node: NodeRef) -> Result<NodeRef> {
        self.check(node)?;
        let copy = self.create_raw(
            self.kind(node),
            self.name_atom(node),
            self.value_atom(node),
            self.span(node),
        )?;
        self.set_flags(copy, self.flags(node))?;
        self.set_attributes_atom(copy, self.attributes_atom(node))?;
        self.assign_id(copy)?;
        Ok(copy)
    }

    /// Copy the whole subtree into fresh headers with fresh ids.
    pub fn deep_clone(&mut self, node: NodeRef) -> Result<NodeRef> {
        let root = self.clone_node(node)?;
        let mut pending = vec![(node, root)];
        while let Some((source, target)) = pending.pop() {
            let children: SmallVec<[NodeRef; 8]> = self.children(source).collect();
            for child in children {
                let copy = self.clone_node(child)?;
                self.append_child(target, copy)?;
                pending.push((child, copy));
            }
        }
        debug!(source = %self.id(node), copy = %self.id(root), "deep cloned subtree");
        Ok(root)
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Decode the attribute map. A malformed blob reads as empty.
    pub fn attributes(&self, node: NodeRef) -> Attributes {
        let atom = self.attributes_atom(node);
        if atom.is_none() {
            return Attributes::new();
        }
        match serde_json::from_str(self.interner.resolve(atom)) {
            Ok(attributes) => attributes,
            Err(err) => {
                debug!(node = %self.id(node), %err, "malformed attribute blob, reading as empty");
                Attributes::new()
            }
        }
    }

    pub fn attribute(&self, node: NodeRef, key: &str) -> Option<String> {
        self.attributes(node).remove(key)
    }

    pub fn set_attribute(&mut self, node: NodeRef, key: &str, value: &str) -> Result<()> {
        let mut attributes = self.attributes(node);
        attributes.insert(key.to_string(), value.to_string());
        self.set_attributes(node, &attributes)
    }

    pub fn remove_attribute(&mut self, node: NodeRef, key: &str) -> Result<Option<String>> {
        let mut attributes = self.attributes(node);
        let removed = attributes.remove(key);
        if removed.is_some() {
            self.set_attributes(node, &attributes)?;
        }
        Ok(removed)
    }

    /// Replace the whole attribute map in one write.
    pub fn set_attributes(&mut self, node: NodeRef, attributes: &Attributes) -> Result<()> {
        let atom = if attributes.is_empty() {
            Atom::NONE
        } else {
            let blob = serde_json::to_string(attributes)
                .map_err(|err| CoreError::invalid(format!("cannot encode attributes: {err}")))?;
            self.interner.intern_owned(blob)
        };
        self.set_attributes_atom(node, atom)
    }

    // =========================================================================
    // Display
    // =========================================================================

    /// `Kind "name" = "value" (N children)`
    pub fn display(&self, node: NodeRef) -> NodeDisplay<'_> {
        NodeDisplay { store: self, node }
    }
}

/// Display adapter returned by [`NodeStore::display`].
pub struct NodeDisplay<'a> {
    store: &'a NodeStore,
    node: NodeRef,
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store;
        write!(
            f,
            "{} \"{}\" = \"{}\" ({} children)",
            store.kind(self.node),
            store.name(self.node).unwrap_or(""),
            store.value(self.node).unwrap_or(""),
            store.child_count(self.node)
        )
    }
}
