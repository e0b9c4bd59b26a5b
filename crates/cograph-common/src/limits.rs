//! Centralized limits and defaults for the tree core.
//!
//! Keeping these in one place avoids drift between the session defaults, the
//! CLI, and the tests that exercise boundary behavior.

// =============================================================================
// Arena
// =============================================================================

/// Default capacity of a node arena in bytes (16 MiB).
///
/// A node header is 72 bytes, so this holds roughly 200k nodes with room left
/// for their child arrays.
pub const DEFAULT_ARENA_CAPACITY: usize = 16 * 1024 * 1024;

/// Largest arena a single tree may reserve.
///
/// Arena pointers are 32-bit offsets, so nothing past `u32::MAX` is
/// addressable.
pub const MAX_ARENA_CAPACITY: usize = u32::MAX as usize;

/// Alignment requested for every node header allocation.
pub const HEADER_ALIGN: usize = 8;

// =============================================================================
// Children
// =============================================================================

/// Largest capacity encodable in a children pointer (24 bits).
pub const MAX_CHILD_CAPACITY: u32 = (1 << 24) - 1;

// =============================================================================
// Editing
// =============================================================================

/// Default number of ancestors gathered as edit context.
pub const DEFAULT_CONTEXT_RADIUS: usize = 3;

/// Maximum depth walked when looking up the deepest node at an offset.
///
/// Trees deeper than this are almost certainly corrupted; the lookup stops
/// instead of walking forever.
pub const MAX_LOCATE_DEPTH: usize = 10_000;
