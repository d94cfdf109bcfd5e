pub mod clean;
pub mod list;
pub mod pull;
pub mod push;

use anyhow::{Context, Result};
use colored::Colorize;

use preserve_core::{Degradation, Outcome};

/// Prints degradation reasons to stderr and unwraps the value. A fatal
/// outcome becomes an error, which exits 1.
pub(crate) fn settle<T>(outcome: Outcome<T>, what: &str) -> Result<T> {
    let (value, reasons) = outcome
        .into_result()
        .with_context(|| format!("{what} failed"))?;
    report_degradations(&reasons);
    Ok(value)
}

fn report_degradations(reasons: &[Degradation]) {
    for reason in reasons {
        eprintln!("{} {reason}", "⚠".yellow().bold());
        if let Degradation::MissingFiles { paths } = reason {
            for path in paths {
                eprintln!("    - {path}");
            }
        }
    }
}
