//! Check subcommand - static validation of a manifest.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;

use crate::config::Config;
use crate::graph::Manifest;

/// Validate a scope manifest.
#[derive(Parser)]
pub struct CheckCommand {
    /// Path to the TOML manifest.
    pub manifest: PathBuf,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    /// Run the check command. Fails when any issue is found.
    pub fn run(self) -> Result<()> {
        let config = Config::load()?;
        let manifest = Manifest::load(&self.manifest)?;
        tracing::debug!(
            "Loaded {} scope kind(s) from {}",
            manifest.scopes.len(),
            self.manifest.display()
        );

        let report = manifest.validate(&config.validation);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if report.is_ok() {
            println!(
                "{}: {} scope kind(s), no issues",
                self.manifest.display(),
                manifest.scopes.len()
            );
        } else {
            println!("{}:\n{}", self.manifest.display(), report);
        }

        if report.is_ok() {
            Ok(())
        } else {
            Err(color_eyre::eyre::eyre!(
                "{} issue(s) found in {}",
                report.len(),
                self.manifest.display()
            ))
        }
    }
}
