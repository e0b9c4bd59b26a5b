//! Session configuration loaded from camelCase JSON.

use crate::arena::Arena;
use crate::edit::EditEngine;
use crate::tree::{ChildGrowth, NodeStore};
use anyhow::{Context, Result};
use cograph_common::limits::{DEFAULT_ARENA_CAPACITY, DEFAULT_CONTEXT_RADIUS};
use cograph_common::Interner;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one edit session. Every field has a default, so `{}` is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Arena size in bytes.
    pub arena_capacity: usize,
    pub child_growth: ChildGrowth,
    /// How many ancestors the edit context collects.
    pub context_radius: usize,
    /// Bound on the undo stack; `None` keeps all history.
    pub max_history: Option<usize>,
    /// Pre-intern frequent node names when building a store.
    pub intern_common: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            child_growth: ChildGrowth::default(),
            context_radius: DEFAULT_CONTEXT_RADIUS,
            max_history: None,
            intern_common: true,
        }
    }
}

impl SessionConfig {
    /// Empty node store sized and tuned by this configuration.
    pub fn new_store(&self) -> NodeStore {
        let mut interner = Interner::new();
        if self.intern_common {
            interner.intern_common();
        }
        NodeStore::from_parts(Arena::new(self.arena_capacity), interner, self.child_growth)
    }

    pub fn new_engine(&self) -> EditEngine {
        EditEngine::with_max_history(self.max_history)
    }
}

pub fn parse_session_config(source: &str) -> Result<SessionConfig> {
    let config = serde_json::from_str(source).context("failed to parse session config JSON")?;
    Ok(config)
}

pub fn load_session_config(path: &Path) -> Result<SessionConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read session config: {}", path.display()))?;
    parse_session_config(&source)
        .with_context(|| format!("failed to parse session config: {}", path.display()))
}
