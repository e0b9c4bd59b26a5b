use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the cograph binary.
#[derive(Parser, Debug)]
#[command(
    name = "cograph",
    version,
    about = "Inspect and edit arena-backed syntax trees"
)]
pub struct CliArgs {
    /// Disable colored output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Session configuration (camelCase JSON).
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a tree and its statistics.
    Inspect {
        /// Tree as plain-node JSON.
        tree: PathBuf,

        /// Print the tree back as JSON instead of an outline.
        #[arg(long)]
        json: bool,
    },

    /// Run an edit script against a tree.
    Edit {
        /// Tree as plain-node JSON.
        tree: PathBuf,

        /// JSON array of edit, undo and redo steps.
        #[arg(short = 's', long)]
        script: PathBuf,

        /// Source text the tree was parsed from, for line/column targets.
        #[arg(long)]
        source: Option<PathBuf>,

        /// Write the final tree as JSON here.
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Check tree invariants after the script.
        #[arg(long)]
        verify: bool,
    },
}
