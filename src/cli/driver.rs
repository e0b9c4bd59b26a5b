use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::config::{SessionConfig, load_session_config};
use crate::context::{ContextEdit, EditResult, EditSession};
use crate::tree::{PlainNode, Tree, TreeStats};

/// One entry of an edit script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum ScriptStep {
    Edit(ContextEdit),
    Undo,
    Redo,
}

impl ScriptStep {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptStep::Edit(edit) => edit.action.name(),
            ScriptStep::Undo => "undo",
            ScriptStep::Redo => "redo",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub index: usize,
    pub step: &'static str,
    pub result: EditResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditReport {
    pub steps: Vec<StepOutcome>,
    pub tree: Option<PlainNode>,
    pub stats: TreeStats,
    /// Empty unless invariant checking was requested and found problems.
    pub violations: Vec<String>,
}

impl EditReport {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|step| !step.result.success).count()
    }
}

pub fn resolve_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => load_session_config(path),
        None => Ok(SessionConfig::default()),
    }
}

pub fn parse_tree(source: &str, config: &SessionConfig) -> Result<Tree> {
    let plain: PlainNode = serde_json::from_str(source).context("failed to parse tree JSON")?;
    let tree = Tree::from_plain(config.new_store(), &plain).context("failed to build tree")?;
    Ok(tree)
}

pub fn load_tree(path: &Path, config: &SessionConfig) -> Result<Tree> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tree: {}", path.display()))?;
    parse_tree(&source, config).with_context(|| format!("failed to load tree: {}", path.display()))
}

pub fn parse_script(source: &str) -> Result<Vec<ScriptStep>> {
    let steps = serde_json::from_str(source).context("failed to parse edit script JSON")?;
    Ok(steps)
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read edit script: {}", path.display()))?;
    parse_script(&source).with_context(|| format!("failed to load edit script: {}", path.display()))
}

/// Run every step, continuing past failures.
pub fn run_script(session: &mut EditSession, steps: &[ScriptStep]) -> Vec<StepOutcome> {
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let result = match step {
                ScriptStep::Edit(edit) => session.edit_with_context(edit),
                ScriptStep::Undo => history_result(session.undo()),
                ScriptStep::Redo => history_result(session.redo()),
            };
            StepOutcome {
                index,
                step: step.name(),
                result,
            }
        })
        .collect()
}

fn history_result(outcome: crate::error::Result<crate::edit::OperationId>) -> EditResult {
    match outcome {
        Ok(operation) => EditResult {
            success: true,
            operation: Some(operation),
            node: None,
            error: None,
        },
        Err(err) => EditResult::failed(err),
    }
}

pub struct EditRequest<'a> {
    pub tree: &'a Path,
    pub script: &'a Path,
    pub source: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub verify: bool,
}

pub fn run_edit(request: &EditRequest<'_>) -> Result<EditReport> {
    let config = resolve_config(request.config)?;
    let tree = load_tree(request.tree, &config)?;
    let steps = load_script(request.script)?;

    let mut session = EditSession::new(tree, &config);
    if let Some(path) = request.source {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read source: {}", path.display()))?;
        session.set_source(&source);
    }

    let outcomes = run_script(&mut session, &steps);
    let tree = session.into_tree();
    let violations = if request.verify {
        tree.verify().iter().map(ToString::to_string).collect()
    } else {
        Vec::new()
    };
    let report = EditReport {
        steps: outcomes,
        tree: tree.to_plain(),
        stats: tree.stats(),
        violations,
    };
    info!(
        steps = report.steps.len(),
        failed = report.failed_steps(),
        "edit script finished"
    );
    Ok(report)
}

pub fn write_tree(path: &Path, tree: Option<&PlainNode>) -> Result<()> {
    let json = serde_json::to_string_pretty(&tree).context("failed to serialize tree")?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("failed to write tree: {}", path.display()))
}
