//! Common types and utilities for the cograph syntax tree core.
//!
//! This crate provides foundational types shared by the tree store and the
//! edit engine:
//! - String interning (`Atom`, `Interner`)
//! - Line/column source locations (`LocationTracker`, `Position`)
//! - Centralized limits and defaults

// String interning for node names and values
pub mod interner;
pub use interner::{Atom, Interner};

// Position tracking for offset <-> line/column conversion
pub mod position;
pub use position::{LocationTracker, OutOfRange, Position};

// Centralized limits and defaults
pub mod limits;
