//! Binary layout of a node header.
//!
//! Every node is a fixed 72-byte, 8-aligned, little-endian record:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | kind |
//! | 4 | 4 | node id |
//! | 8 | 4 | parent id |
//! | 12 | 4 | depth |
//! | 16 | 4 | flags |
//! | 20 | 4 | name atom |
//! | 24 | 4 | value atom |
//! | 28 | 4 | child count |
//! | 32 | 8 | encoded children pointer |
//! | 40 | 8 | encoded attribute pointer |
//! | 48 | 24 | span: start (line, column, offset), end (line, column, offset) |

use super::flags::NodeFlags;
use super::handle::NodeId;
use super::kind::NodeKind;
use cograph_common::{Atom, Position};
use serde::{Deserialize, Serialize};

/// Fixed size of a node header in bytes.
pub const HEADER_SIZE: usize = 72;

/// Byte offsets of header fields relative to the header start.
pub mod field {
    pub const KIND: usize = 0;
    pub const ID: usize = 4;
    pub const PARENT: usize = 8;
    pub const DEPTH: usize = 12;
    pub const FLAGS: usize = 16;
    pub const NAME: usize = 20;
    pub const VALUE: usize = 24;
    pub const CHILD_COUNT: usize = 28;
    pub const CHILDREN: usize = 32;
    pub const ATTRIBUTES: usize = 40;
    pub const SPAN: usize = 48;
}

/// Width of one child entry (a u32 header offset).
pub const CHILD_WIDTH: u8 = 4;

/// Source range of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// Whether `offset` falls inside the span. Empty spans contain their
    /// start offset.
    pub fn contains_offset(&self, offset: u32) -> bool {
        if self.start.offset == self.end.offset {
            offset == self.start.offset
        } else {
            self.start.offset <= offset && offset < self.end.offset
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    pub(crate) fn to_words(self) -> [u32; 6] {
        [
            self.start.line,
            self.start.column,
            self.start.offset,
            self.end.line,
            self.end.column,
            self.end.offset,
        ]
    }

    pub(crate) fn from_words(w: [u32; 6]) -> Self {
        Span {
            start: Position::new(w[0], w[1], w[2]),
            end: Position::new(w[3], w[4], w[5]),
        }
    }
}

/// Decoded children pointer.
///
/// Packed into a u64 as `offset (32 bits) | width (8 bits) | capacity (24 bits)`.
/// A zero capacity means no array has been allocated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildList {
    pub offset: u32,
    pub width: u8,
    pub capacity: u32,
}

impl ChildList {
    pub const EMPTY: ChildList = ChildList {
        offset: 0,
        width: 0,
        capacity: 0,
    };

    pub fn new(offset: u32, capacity: u32) -> Self {
        ChildList {
            offset,
            width: CHILD_WIDTH,
            capacity,
        }
    }

    pub fn encode(self) -> u64 {
        (self.offset as u64) | ((self.width as u64) << 32) | (((self.capacity & 0xFF_FFFF) as u64) << 40)
    }

    pub fn decode(raw: u64) -> Self {
        ChildList {
            offset: raw as u32,
            width: (raw >> 32) as u8,
            capacity: ((raw >> 40) & 0xFF_FFFF) as u32,
        }
    }

    /// Byte offset of entry `index`.
    #[inline]
    pub fn slot(self, index: usize) -> usize {
        self.offset as usize + index * self.width as usize
    }
}

/// A decoded copy of one header, for inspection and layout checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    pub kind: NodeKind,
    pub id: NodeId,
    pub parent: NodeId,
    pub depth: u32,
    pub flags: NodeFlags,
    pub name: Atom,
    pub value: Atom,
    pub child_count: u32,
    pub children: ChildList,
    pub attributes: Atom,
    pub span: Span,
}

impl NodeHeader {
    /// Decode a header from the first `HEADER_SIZE` bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..HEADER_SIZE)?;
        let u32_at = |at: usize| -> u32 {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let u64_at = |at: usize| -> u64 { (u32_at(at) as u64) | ((u32_at(at + 4) as u64) << 32) };

        let mut span = [0u32; 6];
        for (i, word) in span.iter_mut().enumerate() {
            *word = u32_at(field::SPAN + i * 4);
        }

        Some(NodeHeader {
            kind: NodeKind::from_u32(u32_at(field::KIND)),
            id: NodeId(u32_at(field::ID)),
            parent: NodeId(u32_at(field::PARENT)),
            depth: u32_at(field::DEPTH),
            flags: NodeFlags::from_bits_retain(u32_at(field::FLAGS)),
            name: Atom(u32_at(field::NAME)),
            value: Atom(u32_at(field::VALUE)),
            child_count: u32_at(field::CHILD_COUNT),
            children: ChildList::decode(u64_at(field::CHILDREN)),
            attributes: Atom(u64_at(field::ATTRIBUTES) as u32),
            span: Span::from_words(span),
        })
    }

    /// Encode into a fresh `HEADER_SIZE` buffer.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut put = |at: usize, bytes: &[u8]| buf[at..at + bytes.len()].copy_from_slice(bytes);

        put(field::KIND, &self.kind.as_u32().to_le_bytes());
        put(field::ID, &self.id.0.to_le_bytes());
        put(field::PARENT, &self.parent.0.to_le_bytes());
        put(field::DEPTH, &self.depth.to_le_bytes());
        put(field::FLAGS, &self.flags.bits().to_le_bytes());
        put(field::NAME, &self.name.0.to_le_bytes());
        put(field::VALUE, &self.value.0.to_le_bytes());
        put(field::CHILD_COUNT, &self.child_count.to_le_bytes());
        put(field::CHILDREN, &self.children.encode().to_le_bytes());
        put(field::ATTRIBUTES, &(self.attributes.0 as u64).to_le_bytes());
        for (i, word) in self.span.to_words().iter().enumerate() {
            put(field::SPAN + i * 4, &word.to_le_bytes());
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_offsets_fill_header() {
        assert_eq!(field::SPAN + 6 * 4, HEADER_SIZE);
        assert_eq!(HEADER_SIZE % 8, 0);
    }

    #[test]
    fn test_child_list_packing() {
        let list = ChildList::new(0x1234_5678, 300);
        let raw = list.encode();
        assert_eq!(raw as u32, 0x1234_5678);
        assert_eq!((raw >> 32) as u8, CHILD_WIDTH);
        assert_eq!(ChildList::decode(raw), list);
        assert_eq!(ChildList::decode(0), ChildList::EMPTY);
    }

    #[test]
    fn test_header_layout_is_little_endian() {
        let header = NodeHeader {
            kind: NodeKind::Literal,
            id: NodeId(7),
            parent: NodeId(3),
            depth: 2,
            flags: NodeFlags::SYNTHETIC,
            name: Atom(11),
            value: Atom(12),
            child_count: 0,
            children: ChildList::EMPTY,
            attributes: Atom(5),
            span: Span::new(Position::new(1, 2, 3), Position::new(4, 5, 6)),
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[6, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[7, 0, 0, 0]);
        assert_eq!(&bytes[40..48], &[5, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[68..72], &[6, 0, 0, 0]);
        assert_eq!(NodeHeader::from_bytes(&bytes), Some(header));
    }

    #[test]
    fn test_span_contains_offset() {
        let span = Span::new(Position::new(0, 0, 4), Position::new(0, 3, 7));
        assert!(span.contains_offset(4));
        assert!(span.contains_offset(6));
        assert!(!span.contains_offset(7));

        let empty = Span::new(Position::new(0, 2, 2), Position::new(0, 2, 2));
        assert!(empty.contains_offset(2));
        assert!(empty.is_empty());
    }
}
