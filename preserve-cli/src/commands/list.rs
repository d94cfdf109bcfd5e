//! `preserve list`: entries of the stored archive, or stored archives.

use anyhow::Result;
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use preserve_core::PreserveConfig;
use preserve_remote::ObjectSummary;

use crate::settings::{Capabilities, SettingsArgs};

/// Arguments for `preserve list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// List archives stored beside the resolved location instead.
    #[arg(long)]
    pub remote: bool,
}

#[derive(Tabled)]
struct ArchiveRow {
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "size")]
    size: String,
    #[tabled(rename = "last modified")]
    last_modified: String,
}

impl From<&ObjectSummary> for ArchiveRow {
    fn from(o: &ObjectSummary) -> Self {
        Self {
            key: o.key.clone(),
            size: format!("{} B", o.size),
            last_modified: o
                .last_modified
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

impl ListArgs {
    pub fn run(self, config: &PreserveConfig, settings: &SettingsArgs) -> Result<()> {
        let caps = Capabilities::new(config, settings)?;
        let orchestrator = caps.orchestrator(config)?;

        if self.remote {
            let listing = super::settle(orchestrator.list_remote(), "list --remote")?;
            let Some(bucket) = listing.bucket else {
                return Ok(());
            };
            if listing.archives.is_empty() {
                println!("No preserved archives under s3://{bucket}/{}", listing.prefix);
                return Ok(());
            }
            println!("Preserved archives under s3://{bucket}/{}:", listing.prefix);
            let rows: Vec<ArchiveRow> = listing.archives.iter().map(ArchiveRow::from).collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
            return Ok(());
        }

        let report = super::settle(orchestrator.list(), "list")?;
        let Some(location) = &report.location else {
            return Ok(());
        };
        println!("Contents of {location}:");
        for entry in &report.entries {
            println!("  {entry}");
        }
        println!("{} entr(ies)", report.count);
        Ok(())
    }
}
