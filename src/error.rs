//! Error types for the tree core.
//!
//! Structural errors (`NotFound`, `InvalidOperation`) are returned
//! synchronously by the edit engine. Arena and location errors propagate to
//! the caller untouched. Malformed attribute blobs are never surfaced; they
//! decode to an empty map.

use crate::tree::NodeId;
use cograph_common::OutOfRange;
use thiserror::Error;

/// The error type for arena, store and edit operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The arena cannot satisfy an allocation.
    #[error("arena exhausted: requested {requested} bytes, {available} bytes available")]
    OutOfMemory { requested: usize, available: usize },

    /// A referenced node or parent id is absent from the registry.
    #[error("node {0} not found")]
    NotFound(NodeId),

    /// A structurally illegal request.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A position or offset outside the tracked source.
    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),
}

impl CoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CoreError::InvalidOperation(message.into())
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
