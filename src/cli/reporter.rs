use colored::Colorize;

use crate::cli::driver::StepOutcome;
use crate::tree::{NodeRef, NodeStore, TreeStats};

pub struct Reporter {
    color: bool,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter { color }
    }

    /// Indented outline of `root`'s subtree, one node per line.
    pub fn render_tree(&self, store: &NodeStore, root: NodeRef) -> String {
        let base = store.depth(root);
        let mut out = String::new();
        for node in store.traverse(root) {
            let indent = (store.depth(node).saturating_sub(base)) as usize * 2;
            out.push_str(&" ".repeat(indent));
            out.push_str(&self.format_id(&store.id(node).to_string()));
            out.push(' ');
            out.push_str(&store.display(node).to_string());
            out.push('\n');
        }
        out
    }

    pub fn render_stats(&self, stats: &TreeStats) -> String {
        format!(
            "{} nodes, max depth {}, widest node {} children, arena {}/{} bytes, {} strings",
            stats.nodes,
            stats.max_depth,
            stats.max_children,
            stats.arena_used,
            stats.arena_capacity,
            stats.interned_strings
        )
    }

    pub fn render_step(&self, outcome: &StepOutcome) -> String {
        let status = self.format_status(outcome.result.success);
        let mut line = format!("[{}] {} {}", outcome.index, outcome.step, status);
        if let Some(operation) = outcome.result.operation {
            line.push_str(&format!(" {operation}"));
        }
        if let Some(node) = outcome.result.node {
            line.push_str(&format!(" node {node}"));
        }
        if let Some(error) = &outcome.result.error {
            line.push_str(": ");
            line.push_str(error);
        }
        line
    }

    pub fn render_violation(&self, violation: &str) -> String {
        let label = if self.color {
            "violation".red().bold().to_string()
        } else {
            "violation".to_string()
        };
        format!("{label}: {violation}")
    }

    fn format_status(&self, success: bool) -> String {
        let label = if success { "ok" } else { "failed" };
        if !self.color {
            return label.to_string();
        }
        if success {
            label.green().bold().to_string()
        } else {
            label.red().bold().to_string()
        }
    }

    fn format_id(&self, id: &str) -> String {
        if self.color {
            id.dimmed().to_string()
        } else {
            id.to_string()
        }
    }
}
