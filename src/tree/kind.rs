//! Node kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The syntactic category of a node.
///
/// Stored as a u32 in the header; the discriminants are part of the binary
/// layout and must not be reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum NodeKind {
    Program = 0,
    Module = 1,
    Statement = 2,
    Declaration = 3,
    Expression = 4,
    Identifier = 5,
    Literal = 6,
    BinaryOp = 7,
    UnaryOp = 8,
    Call = 9,
    Block = 10,
    Assignment = 11,
    Conditional = 12,
    Loop = 13,
    Function = 14,
    Parameter = 15,
    Type = 16,
    Comment = 17,
    Token = 18,
    Error = 19,
}

impl NodeKind {
    pub const ALL: [NodeKind; 20] = [
        NodeKind::Program,
        NodeKind::Module,
        NodeKind::Statement,
        NodeKind::Declaration,
        NodeKind::Expression,
        NodeKind::Identifier,
        NodeKind::Literal,
        NodeKind::BinaryOp,
        NodeKind::UnaryOp,
        NodeKind::Call,
        NodeKind::Block,
        NodeKind::Assignment,
        NodeKind::Conditional,
        NodeKind::Loop,
        NodeKind::Function,
        NodeKind::Parameter,
        NodeKind::Type,
        NodeKind::Comment,
        NodeKind::Token,
        NodeKind::Error,
    ];

    /// Decode a header tag. Unknown tags decode to `Error`.
    pub fn from_u32(tag: u32) -> NodeKind {
        Self::ALL
            .get(tag as usize)
            .copied()
            .unwrap_or(NodeKind::Error)
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Program => "Program",
            NodeKind::Module => "Module",
            NodeKind::Statement => "Statement",
            NodeKind::Declaration => "Declaration",
            NodeKind::Expression => "Expression",
            NodeKind::Identifier => "Identifier",
            NodeKind::Literal => "Literal",
            NodeKind::BinaryOp => "BinaryOp",
            NodeKind::UnaryOp => "UnaryOp",
            NodeKind::Call => "Call",
            NodeKind::Block => "Block",
            NodeKind::Assignment => "Assignment",
            NodeKind::Conditional => "Conditional",
            NodeKind::Loop => "Loop",
            NodeKind::Function => "Function",
            NodeKind::Parameter => "Parameter",
            NodeKind::Type => "Type",
            NodeKind::Comment => "Comment",
            NodeKind::Token => "Token",
            NodeKind::Error => "Error",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
