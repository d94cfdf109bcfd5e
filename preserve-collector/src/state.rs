//! Infra-state query capability.
//!
//! The state source is injected behind [`StateQuery`] so tests can hand the
//! collector a canned export instead of spawning the infrastructure tool.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::error::CollectError;

/// Something that can export the current infra-state as a JSON document.
pub trait StateQuery {
    /// Tool name used in logs and error messages.
    fn name(&self) -> &str;

    /// Whether the underlying tooling can be run at all.
    fn is_available(&self) -> bool;

    /// Raw JSON export of the state.
    fn export(&self) -> Result<Vec<u8>, CollectError>;
}

/// Runs `<binary> show -json` (optionally inside `working_dir`).
#[derive(Debug, Clone)]
pub struct CommandStateQuery {
    binary: String,
    working_dir: Option<PathBuf>,
}

impl CommandStateQuery {
    pub fn new(binary: impl Into<String>, working_dir: Option<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            working_dir,
        }
    }
}

impl StateQuery for CommandStateQuery {
    fn name(&self) -> &str {
        &self.binary
    }

    fn is_available(&self) -> bool {
        probe(&self.binary, &["version"]).is_ok()
    }

    fn export(&self) -> Result<Vec<u8>, CollectError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["show", "-json"]);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        let out = cmd.output().map_err(|e| CollectError::StateQuery {
            tool: self.binary.clone(),
            message: format!("failed to run: {e}"),
        })?;
        if !out.status.success() {
            return Err(CollectError::StateQuery {
                tool: self.binary.clone(),
                message: command_summary(&out),
            });
        }
        debug!("{} show -json returned {} bytes", self.binary, out.stdout.len());
        Ok(out.stdout)
    }
}

/// Runs `<binary> <args>` and reports whether it could be executed and succeeded.
pub fn probe(binary: &str, args: &[&str]) -> Result<(), String> {
    match Command::new(binary).args(args).output() {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => Err(command_summary(&out)),
        Err(e) => Err(e.to_string()),
    }
}

pub(crate) fn command_summary(out: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if !stdout.is_empty() {
        return stdout;
    }
    format!("status {}", out.status)
}
