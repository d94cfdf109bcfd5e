//! The orchestrator: push, pull, list and clean.
//!
//! Every run walks the stage machine
//! `Idle → Collecting → Archiving → Syncing → {Done, Degraded}`; pull and
//! list go straight from `Idle` to `Syncing`. Component outcomes are folded
//! with [`Outcome::record`], so any degradation collected on the way ends the
//! run in `Degraded` while a fatal error ends it immediately.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use preserve_archive::compression::ARCHIVE_SUFFIXES;
use preserve_archive::{ArchiveBuilder, BuildSummary, ExtractOptions};
use preserve_collector::{FileCollector, JsonQuery, StateQuery};
use preserve_core::config::non_blank;
use preserve_core::{
    CollectedPathSet, Degradation, Outcome, PreserveConfig, PreserveError, RemoteLocation, TagSet,
};
use preserve_remote::{resolve_remote_location, ObjectStore, ObjectSummary, RemoteError, RemoteSync};

use crate::clean::{self, CleanReport};
use crate::digest::{digests_match, sha256_file};
use crate::error::io_err;
use crate::handoff::{self, Handoff};

/// Default archive name for push and pull.
pub const DEFAULT_ARCHIVE_NAME: &str = "preserved_files.tar.gz";

// ---------------------------------------------------------------------------
// Stage machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Collecting,
    Archiving,
    Syncing,
    Done,
    Degraded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Collecting => "collecting",
            Stage::Archiving => "archiving",
            Stage::Syncing => "syncing",
            Stage::Done => "done",
            Stage::Degraded => "degraded",
        };
        f.write_str(name)
    }
}

/// Ordered record of the stages a run passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrail(Vec<Stage>);

impl StageTrail {
    fn new() -> Self {
        Self(vec![Stage::Idle])
    }

    fn enter(&mut self, stage: Stage) {
        info!("stage: {} -> {stage}", self.current());
        self.0.push(stage);
    }

    fn finish(&mut self, reasons: &[Degradation]) {
        self.enter(if reasons.is_empty() {
            Stage::Done
        } else {
            Stage::Degraded
        });
    }

    pub fn current(&self) -> Stage {
        self.0.last().copied().unwrap_or(Stage::Idle)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PushReport {
    pub location: RemoteLocation,
    pub collected: CollectedPathSet,
    pub archive: BuildSummary,
    pub sha256: String,
    pub tags: TagSet,
    pub handoff_path: PathBuf,
    pub trail: StageTrail,
}

#[derive(Debug, Clone)]
pub struct PullReport {
    /// `None` when no location could be resolved and nothing was done.
    pub location: Option<RemoteLocation>,
    pub archive_path: PathBuf,
    pub restored: Vec<PathBuf>,
    pub archive_kept: bool,
    pub trail: StageTrail,
}

#[derive(Debug, Clone)]
pub struct ListReport {
    pub location: Option<RemoteLocation>,
    pub entries: Vec<String>,
    pub count: usize,
    pub trail: StageTrail,
}

#[derive(Debug, Clone)]
pub struct RemoteListing {
    pub bucket: Option<String>,
    pub prefix: String,
    pub archives: Vec<ObjectSummary>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Composes collector, archive builder and remote sync.
///
/// Relative paths in the config (manifest, handoff file, extraction root) and
/// archive names are resolved against `workdir`.
pub struct Orchestrator<'a> {
    config: &'a PreserveConfig,
    json: &'a dyn JsonQuery,
    state: Option<&'a dyn StateQuery>,
    store: &'a dyn ObjectStore,
    workdir: PathBuf,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a PreserveConfig,
        json: &'a dyn JsonQuery,
        state: Option<&'a dyn StateQuery>,
        store: &'a dyn ObjectStore,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            json,
            state,
            store,
            workdir: workdir.into(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    fn remote(&self) -> RemoteSync<'a> {
        RemoteSync::new(self.store)
    }

    fn location(&self) -> Result<RemoteLocation, preserve_core::ConfigError> {
        resolve_remote_location(
            self.config.explicit_location.as_deref(),
            self.config.plan_location.as_deref(),
        )
    }

    // -- push ---------------------------------------------------------------

    /// collect → build → digest → tags → upload → handoff file.
    ///
    /// Fatal when no location resolves, the JSON capability is missing, the
    /// archive cannot be written or both upload attempts fail.
    pub fn push(&self, archive_name: &Path) -> Outcome<PushReport> {
        let mut reasons = Vec::new();
        match self.try_push(archive_name, &mut reasons) {
            Ok(report) => Outcome::from_parts(report, reasons),
            Err(err) => Outcome::fatal(err),
        }
    }

    fn try_push(
        &self,
        archive_name: &Path,
        reasons: &mut Vec<Degradation>,
    ) -> Result<PushReport, PreserveError> {
        let mut trail = StageTrail::new();
        let location = self.location()?;
        info!("pushing to {location}");

        trail.enter(Stage::Collecting);
        let manifest = self.resolve(&self.config.manifest_path);
        let collected = FileCollector::new(self.json)
            .collect(Some(&manifest), self.state)
            .record(reasons)?;

        trail.enter(Stage::Archiving);
        let archive = ArchiveBuilder::new(&self.workdir)
            .build(collected.paths(), &self.resolve(archive_name))
            .record(reasons)?;
        let sha256 = sha256_file(&archive.archive_path)?;

        trail.enter(Stage::Syncing);
        let remote = self.remote();
        let tags = remote.resolve_tag_set(
            &location,
            &self.config.tagging,
            self.config.plan_location.as_deref(),
        );
        remote
            .upload(&archive.archive_path, &location, &tags)
            .record(reasons)?;

        let handoff_path = self.resolve(&self.config.handoff_path);
        handoff::write_at(
            &handoff_path,
            &Handoff {
                location: location.clone(),
                sha256: sha256.clone(),
            },
        )?;

        trail.finish(reasons);
        Ok(PushReport {
            location,
            collected,
            archive,
            sha256,
            tags,
            handoff_path,
            trail,
        })
    }

    // -- pull ---------------------------------------------------------------

    /// download → verify → extract → remove the local archive.
    ///
    /// Never fatal: a missing location, a missing object, a failed transfer,
    /// a digest mismatch or a failed extraction all degrade.
    pub fn pull(&self, archive_name: &Path, keep_archive: bool) -> Outcome<PullReport> {
        let mut reasons = Vec::new();
        let mut trail = StageTrail::new();
        let archive_path = self.resolve(archive_name);
        let mut report = PullReport {
            location: None,
            archive_path: archive_path.clone(),
            restored: Vec::new(),
            archive_kept: true,
            trail: trail.clone(),
        };

        let Some(location) = self.optional_location(&mut reasons) else {
            trail.finish(&reasons);
            report.trail = trail;
            return Outcome::from_parts(report, reasons);
        };
        report.location = Some(location.clone());

        trail.enter(Stage::Syncing);
        let remote = self.remote();
        if let Err(err) = remote.download(&location, &archive_path) {
            warn!("pull skipped: {err}");
            reasons.push(transfer_degradation(&location, err));
            trail.finish(&reasons);
            report.trail = trail;
            return Outcome::from_parts(report, reasons);
        }

        if let Some(expected) = non_blank(self.config.expected_digest.as_deref()) {
            match sha256_file(&archive_path) {
                Ok(actual) if digests_match(expected, &actual) => {
                    info!("archive digest verified");
                }
                Ok(actual) => {
                    warn!("digest mismatch for {location}; not extracting");
                    reasons.push(Degradation::DigestMismatch {
                        expected: expected.to_string(),
                        actual,
                    });
                    trail.finish(&reasons);
                    report.trail = trail;
                    return Outcome::from_parts(report, reasons);
                }
                Err(err) => {
                    reasons.push(Degradation::ExtractFailed {
                        reason: err.to_string(),
                    });
                    trail.finish(&reasons);
                    report.trail = trail;
                    return Outcome::from_parts(report, reasons);
                }
            }
        }

        let options = ExtractOptions::new(self.resolve(&self.config.extract_root))
            .with_absolute_prefixes(self.config.restore_absolute_prefixes.clone());
        let extracted = remote.extract(&archive_path, &options).recover(|err| {
            (
                Default::default(),
                Degradation::ExtractFailed {
                    reason: err.to_string(),
                },
            )
        });
        if let Ok(summary) = extracted.record(&mut reasons) {
            report.restored = summary.restored;
        }

        if !keep_archive {
            match fs::remove_file(&archive_path) {
                Ok(()) => report.archive_kept = false,
                Err(e) => warn!("could not remove {}: {e}", archive_path.display()),
            }
        }

        trail.finish(&reasons);
        report.trail = trail;
        Outcome::from_parts(report, reasons)
    }

    // -- list ---------------------------------------------------------------

    /// Enumerates the remote archive's entries through a scoped temp file.
    pub fn list(&self) -> Outcome<ListReport> {
        let mut reasons = Vec::new();
        let mut trail = StageTrail::new();
        let mut report = ListReport {
            location: None,
            entries: Vec::new(),
            count: 0,
            trail: trail.clone(),
        };

        let Some(location) = self.optional_location(&mut reasons) else {
            trail.finish(&reasons);
            report.trail = trail;
            return Outcome::from_parts(report, reasons);
        };
        report.location = Some(location.clone());
        trail.enter(Stage::Syncing);

        // Keep the key's suffix so the codec dispatch matches the object.
        let suffix = ARCHIVE_SUFFIXES
            .iter()
            .map(|(s, _)| *s)
            .find(|s| location.key.ends_with(*s))
            .unwrap_or(".tar.gz");
        let staging = match tempfile::Builder::new()
            .prefix("preserve-list-")
            .suffix(suffix)
            .tempfile()
        {
            Ok(file) => file,
            Err(e) => return Outcome::fatal(io_err(std::env::temp_dir(), e)),
        };

        match self.remote().download(&location, staging.path()) {
            Err(err) => {
                warn!("list skipped: {err}");
                reasons.push(transfer_degradation(&location, err));
            }
            Ok(()) => match preserve_archive::list(staging.path()) {
                Ok((entries, count)) => {
                    report.entries = entries;
                    report.count = count;
                }
                Err(err) => reasons.push(Degradation::ExtractFailed {
                    reason: err.to_string(),
                }),
            },
        }

        trail.finish(&reasons);
        report.trail = trail;
        Outcome::from_parts(report, reasons)
    }

    /// Archives stored beside the resolved location (same bucket and key
    /// prefix).
    pub fn list_remote(&self) -> Outcome<RemoteListing> {
        let mut reasons = Vec::new();
        let Some(location) = self.optional_location(&mut reasons) else {
            let listing = RemoteListing {
                bucket: None,
                prefix: String::new(),
                archives: Vec::new(),
            };
            return Outcome::from_parts(listing, reasons);
        };

        let prefix = location.key_prefix().to_string();
        let archives = match self.remote().list_archives(&location.bucket, &prefix) {
            Ok(archives) => archives,
            Err(err) => {
                warn!("remote listing failed: {err}");
                reasons.push(Degradation::TransferFailed {
                    reason: err.to_string(),
                });
                Vec::new()
            }
        };
        Outcome::from_parts(
            RemoteListing {
                bucket: Some(location.bucket),
                prefix,
                archives,
            },
            reasons,
        )
    }

    // -- clean --------------------------------------------------------------

    /// `files`: delete the manifest-listed files (sanitized paths only).
    /// `archives`: delete archives in the working directory.
    pub fn clean(&self, files: bool, archives: bool) -> Outcome<CleanReport> {
        let mut reasons = Vec::new();
        let mut report = CleanReport::default();

        if files {
            let manifest = self.resolve(&self.config.manifest_path);
            let collected = match FileCollector::new(self.json)
                .collect(Some(&manifest), None)
                .record(&mut reasons)
            {
                Ok(set) => set,
                Err(err) => return Outcome::fatal(err),
            };
            report.merge(clean::remove_files(&self.workdir, collected.paths()));
        }
        if archives {
            match clean::remove_archives(&self.workdir) {
                Ok(r) => report.merge(r),
                Err(err) => return Outcome::fatal(err),
            }
        }
        Outcome::from_parts(report, reasons)
    }

    /// Resolved location for pull/list; absence or an unparsable value is a
    /// warning, not an error.
    fn optional_location(&self, reasons: &mut Vec<Degradation>) -> Option<RemoteLocation> {
        if !self.config.has_location_source() {
            warn!("no remote location configured; nothing to do");
            reasons.push(Degradation::NoRemoteLocation);
            return None;
        }
        match self.location() {
            Ok(location) => Some(location),
            Err(err) => {
                warn!("{err}");
                reasons.push(Degradation::NoRemoteLocation);
                None
            }
        }
    }
}

fn transfer_degradation(location: &RemoteLocation, err: RemoteError) -> Degradation {
    match err {
        RemoteError::NotFound(_) => Degradation::RemoteObjectMissing {
            location: location.uri(),
        },
        other => Degradation::TransferFailed {
            reason: other.to_string(),
        },
    }
}
