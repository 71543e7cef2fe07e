//! CLI module for scopegraph.
//!
//! Subcommands:
//! - `check`: Validate a scope manifest
//! - `tree`: Print the scope hierarchy a manifest declares

mod check;
mod tree;

use clap::{Parser, Subcommand};

pub use check::CheckCommand;
pub use tree::{render_tree, TreeCommand};

/// scopegraph - inspect declared scope graphs
#[derive(Parser)]
#[command(name = "scopegraph")]
#[command(about = "Validate and inspect hierarchical dependency-injection scope graphs")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a manifest: missing providers, cycles, broken registry keys
    Check(CheckCommand),

    /// Print the scope hierarchy with inputs, providers and registry keys
    Tree(TreeCommand),
}

impl App {
    /// Run the CLI application.
    pub fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Check(cmd) => cmd.run(),
            Command::Tree(cmd) => cmd.run(),
        }
    }
}
