//! Preserve: carry generated files from one pipeline host to the next.
//!
//! # Usage
//!
//! ```text
//! preserve push [archive]                 collect, archive, upload, write preserve.env
//! preserve pull [archive] [--keep-archive] download and restore
//! preserve list [--remote]                entries of the stored archive / stored archives
//! preserve clean [--files] [--archives]   delete manifest files / local archives
//! ```
//!
//! Location and tagging settings come from `--config <yaml>`, environment
//! variables and flags, in increasing precedence. Exit status is 1 only for
//! fatal failures; degraded runs print warnings and exit 0.

mod commands;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{clean::CleanArgs, list::ListArgs, pull::PullArgs, push::PushArgs};
use settings::SettingsArgs;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "preserve",
    version,
    about = "Preserve generated files across ephemeral pipeline hosts",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect, archive and upload the preserved files.
    Push(PushArgs),

    /// Download the stored archive and restore its files.
    Pull(PullArgs),

    /// Show the entries of the stored archive.
    List(ListArgs),

    /// Delete manifest-listed files and/or local archives.
    Clean(CleanArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("PRESERVE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.settings.load()?;
    match cli.command {
        Commands::Push(args) => args.run(&config, &cli.settings),
        Commands::Pull(args) => args.run(&config, &cli.settings),
        Commands::List(args) => args.run(&config, &cli.settings),
        Commands::Clean(args) => args.run(&config, &cli.settings),
    }
}
