//! `preserve pull`: download and restore.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use preserve_core::PreserveConfig;
use preserve_pipeline::DEFAULT_ARCHIVE_NAME;

use crate::settings::{Capabilities, SettingsArgs};

/// Arguments for `preserve pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Local name the archive is downloaded to.
    #[arg(default_value = DEFAULT_ARCHIVE_NAME)]
    pub archive: PathBuf,

    /// Keep the downloaded archive after extraction.
    #[arg(long)]
    pub keep_archive: bool,
}

impl PullArgs {
    pub fn run(self, config: &PreserveConfig, settings: &SettingsArgs) -> Result<()> {
        let caps = Capabilities::new(config, settings)?;
        let orchestrator = caps.orchestrator(config)?;
        let report = super::settle(orchestrator.pull(&self.archive, self.keep_archive), "pull")?;

        let Some(location) = &report.location else {
            println!("Nothing pulled.");
            return Ok(());
        };
        if report.restored.is_empty() {
            println!("Nothing restored from {location}.");
            return Ok(());
        }
        println!(
            "{} restored {} entr(ies) from {location}",
            "✓".green().bold(),
            report.restored.len()
        );
        if report.archive_kept {
            println!("  archive kept at {}", report.archive_path.display());
        }
        Ok(())
    }
}
