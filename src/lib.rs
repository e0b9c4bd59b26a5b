//! Zero-copy syntax tree core with reversible structural editing.
//!
//! Nodes are fixed-size binary headers in a bump arena, strings are interned,
//! and child lists are arena arrays addressed by an encoded pointer. On top of
//! that sit an id registry, a command-based edit engine with undo/redo, and a
//! context-aware façade that resolves edits from source locations and runs
//! extension hooks around them.

// Shared test fixtures
#[cfg(test)]
#[path = "tests/test_fixtures.rs"]
pub mod test_fixtures;

// Errors
pub mod error;
pub use error::{CoreError, Result};

// Bump arena with checkpoints
pub mod arena;
pub use arena::{Arena, ArenaPtr, Checkpoint};
#[cfg(test)]
#[path = "tests/arena_tests.rs"]
mod arena_tests;

// Node headers, store, and the tree producer/consumer interface
pub mod tree;
pub use tree::{
    Attributes, ChildGrowth, NodeFlags, NodeId, NodeKind, NodeRef, NodeStore, PlainNode, Span,
    Tree, TreeStats,
};
#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod store_tests;
#[cfg(test)]
#[path = "tests/tree_tests.rs"]
mod tree_tests;
#[cfg(test)]
#[path = "tests/plain_tests.rs"]
mod plain_tests;

// Id -> node index
pub mod registry;
pub use registry::NodeRegistry;

// Undo/redo edit engine
pub mod edit;
pub use edit::{
    EditEngine, EditKind, EditOperation, GraphModified, GraphObserver, ModificationKind,
    NodeUpdate, OperationId, OperationState,
};
#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod engine_tests;

// Context-aware edit façade
pub mod context;
pub use context::{
    ContextEdit, EditAction, EditContext, EditHook, EditResult, EditSession, EditTarget,
};
#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod context_tests;

// Session configuration
pub mod config;
pub use config::SessionConfig;
#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod config_tests;

// Tracing setup for the binary
pub mod tracing_config;

// Command-line driver
#[cfg(feature = "cli")]
pub mod cli;

pub use cograph_common::{Atom, Interner, LocationTracker, OutOfRange, Position};
