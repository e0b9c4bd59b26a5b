#![allow(clippy::print_stdout, clippy::print_stderr)]

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;

use cograph::cli::args::{CliArgs, Command};
use cograph::cli::driver::{self, EditRequest};
use cograph::cli::reporter::Reporter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_STEPS_FAILED: i32 = 1;

fn main() -> Result<()> {
    // Initialize tracing if COGRAPH_LOG or RUST_LOG is set.
    cograph::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let color = !args.no_color && std::io::stdout().is_terminal();
    let reporter = Reporter::new(color);

    let code = match &args.command {
        Command::Inspect { tree, json } => {
            let config = driver::resolve_config(args.config.as_deref())?;
            let tree = driver::load_tree(tree, &config)?;
            if *json {
                let plain = tree.to_plain();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&plain).context("failed to serialize tree")?
                );
            } else {
                if let Some(root) = tree.root() {
                    print!("{}", reporter.render_tree(tree.store(), root));
                }
                println!("{}", reporter.render_stats(&tree.stats()));
            }
            EXIT_SUCCESS
        }
        Command::Edit {
            tree,
            script,
            source,
            output,
            verify,
        } => {
            let report = driver::run_edit(&EditRequest {
                tree,
                script,
                source: source.as_deref(),
                config: args.config.as_deref(),
                verify: *verify,
            })?;
            for step in &report.steps {
                println!("{}", reporter.render_step(step));
            }
            for violation in &report.violations {
                eprintln!("{}", reporter.render_violation(violation));
            }
            match output {
                Some(path) => driver::write_tree(path, report.tree.as_ref())?,
                None => {
                    let final_tree =
                        serde_json::to_string_pretty(&report.tree).context("failed to serialize tree")?;
                    println!("{final_tree}");
                }
            }
            println!("{}", reporter.render_stats(&report.stats));
            if report.failed_steps() > 0 || !report.violations.is_empty() {
                EXIT_STEPS_FAILED
            } else {
                EXIT_SUCCESS
            }
        }
    };

    std::process::exit(code);
}
