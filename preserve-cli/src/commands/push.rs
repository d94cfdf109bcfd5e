//! `preserve push`: collect, archive, upload.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use preserve_core::PreserveConfig;
use preserve_pipeline::DEFAULT_ARCHIVE_NAME;

use crate::settings::{Capabilities, SettingsArgs};

/// Arguments for `preserve push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Local archive name; the suffix selects compression.
    #[arg(default_value = DEFAULT_ARCHIVE_NAME)]
    pub archive: PathBuf,
}

impl PushArgs {
    pub fn run(self, config: &PreserveConfig, settings: &SettingsArgs) -> Result<()> {
        let caps = Capabilities::new(config, settings)?;
        let orchestrator = caps.orchestrator(config)?;
        let report = super::settle(orchestrator.push(&self.archive), "push")?;

        let tick = "✓".green().bold();
        let set = &report.collected;
        println!(
            "{tick} collected {} path(s): {} duplicate(s) removed, {} unique",
            set.total_collected,
            set.duplicates_removed,
            set.unique_files()
        );
        println!(
            "{tick} archived {} path(s) into {} ({} missing)",
            report.archive.existing_count,
            report.archive.archive_path.display(),
            report.archive.missing_count
        );
        println!("{tick} uploaded to {} ({} tag(s))", report.location, report.tags.pairs().len());
        println!("{tick} wrote {}", report.handoff_path.display());
        println!("  sha256 {}", report.sha256.dimmed());
        Ok(())
    }
}
