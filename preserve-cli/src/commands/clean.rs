//! `preserve clean`: delete preserved files and local archives.

use anyhow::Result;
use clap::{ArgGroup, Args};
use colored::Colorize;

use preserve_core::PreserveConfig;

use crate::settings::{Capabilities, SettingsArgs};

/// Arguments for `preserve clean`.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).multiple(true).args(["files", "archives"])))]
pub struct CleanArgs {
    /// Delete the files listed in the manifest.
    #[arg(long)]
    pub files: bool,

    /// Delete `*.tar.gz`, `*.tgz`, `*.tar.bz2` and `*.tar` in the current directory.
    #[arg(long)]
    pub archives: bool,
}

impl CleanArgs {
    pub fn run(self, config: &PreserveConfig, settings: &SettingsArgs) -> Result<()> {
        let caps = Capabilities::new(config, settings)?;
        let orchestrator = caps.orchestrator(config)?;
        let report = super::settle(orchestrator.clean(self.files, self.archives), "clean")?;

        for path in &report.removed {
            println!("  {} {path}", "deleted".green());
        }
        for path in &report.missing {
            println!("  {} {path}", "not found, skipping".dimmed());
        }
        for (path, reason) in &report.failed {
            eprintln!("  {} {path}: {reason}", "could not delete".red());
        }
        println!("{} removed {} file(s)", "✓".green().bold(), report.removed.len());
        Ok(())
    }
}
