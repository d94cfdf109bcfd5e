//! Listing and extraction.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use preserve_core::{Degradation, Outcome};

use crate::compression::Compression;
use crate::error::{io_err, ArchiveError};

/// Where extracted entries land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Every entry is restored under this directory...
    pub root: PathBuf,
    /// ...except entries starting with one of these prefixes (e.g. `home/`),
    /// which are restored at `/<entry>`.
    pub absolute_prefixes: Vec<String>,
}

impl ExtractOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            absolute_prefixes: Vec::new(),
        }
    }

    pub fn with_absolute_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.absolute_prefixes = prefixes;
        self
    }

    fn restores_absolute(&self, relative: &Path) -> bool {
        let stored = relative.to_string_lossy();
        self.absolute_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && stored.starts_with(prefix.as_str()))
    }

    fn target_for(&self, relative: &Path) -> PathBuf {
        if self.restores_absolute(relative) {
            Path::new("/").join(relative)
        } else {
            self.root.join(relative)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Destination of every restored entry, in archive order.
    pub restored: Vec<PathBuf>,
    pub skipped: usize,
}

fn open(archive: &Path) -> Result<tar::Archive<Box<dyn std::io::Read>>, ArchiveError> {
    if !archive.is_file() {
        return Err(ArchiveError::NotFound(archive.to_path_buf()));
    }
    let file = File::open(archive).map_err(|e| io_err(archive, e))?;
    let reader = Compression::for_archive(archive).decoder(BufReader::new(file));
    Ok(tar::Archive::new(reader))
}

/// Entry names in archive order, and their count.
pub fn list(archive: &Path) -> Result<(Vec<String>, usize), ArchiveError> {
    let mut tar = open(archive)?;
    let mut names = Vec::new();
    for entry in tar.entries().map_err(|e| io_err(archive, e))? {
        let entry = entry.map_err(|e| io_err(archive, e))?;
        let path = entry.path().map_err(|e| io_err(archive, e))?;
        names.push(path.to_string_lossy().into_owned());
    }
    let count = names.len();
    Ok((names, count))
}

/// Restores `archive` according to `options`.
///
/// Entries with a `..` component are refused and reported as
/// [`Degradation::EntrySkipped`]. A stored root is dropped, so an absolute
/// entry is restored relative to `options.root` unless it matches one of the
/// absolute prefixes. Symlinks may only point at relative targets without
/// `..`, hard links only at other entries of the archive, and no entry is
/// written through a directory that resolves outside the root. A corrupt
/// stream stops extraction and degrades; entries restored before that point
/// are kept.
pub fn extract(archive: &Path, options: &ExtractOptions) -> Outcome<ExtractSummary> {
    let mut tar = match open(archive) {
        Ok(tar) => tar,
        Err(err) => return Outcome::fatal(err),
    };
    if let Err(e) = fs::create_dir_all(&options.root) {
        return Outcome::fatal(io_err(&options.root, e));
    }
    let entries = match tar.entries() {
        Ok(entries) => entries,
        Err(e) => return Outcome::fatal(io_err(archive, e)),
    };

    let mut summary = ExtractSummary::default();
    let mut reasons = Vec::new();

    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("stopping extraction of {}: {e}", archive.display());
                reasons.push(Degradation::ExtractFailed {
                    reason: e.to_string(),
                });
                break;
            }
        };
        let stored = match entry.path() {
            Ok(p) => p.into_owned(),
            Err(e) => {
                reasons.push(Degradation::ExtractFailed {
                    reason: e.to_string(),
                });
                break;
            }
        };
        let entry_name = stored.to_string_lossy().into_owned();

        let Some(relative) = sanitize(&stored) else {
            warn!("refusing archive entry {entry_name}");
            summary.skipped += 1;
            reasons.push(Degradation::EntrySkipped {
                entry: entry_name,
                reason: "path escapes the extraction root".to_string(),
            });
            continue;
        };

        let target = options.target_for(&relative);
        let restored = if options.restores_absolute(&relative) {
            unpack_to(&mut entry, &target, None, options)
        } else {
            unpack_to(&mut entry, &target, Some(&options.root), options)
        };
        if let Err(e) = restored {
            warn!("could not restore {entry_name}: {e}");
            summary.skipped += 1;
            reasons.push(Degradation::EntrySkipped {
                entry: entry_name,
                reason: e.to_string(),
            });
            continue;
        }
        debug!("restored {entry_name} to {}", target.display());
        summary.restored.push(target);
    }

    info!(
        "restored {} entr(ies) from {} ({} skipped)",
        summary.restored.len(),
        archive.display(),
        summary.skipped
    );
    Outcome::from_parts(summary, reasons)
}

/// Drops root and `.` components. `None` if any component is `..` or nothing
/// remains.
fn sanitize(stored: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in stored.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

fn refused(reason: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.into())
}

/// Fails unless the deepest existing ancestor of `path` resolves inside `root`.
fn ensure_within(root: &Path, path: &Path) -> io::Result<()> {
    let root = root.canonicalize()?;
    let mut existing = path;
    while fs::symlink_metadata(existing).is_err() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => break,
        }
    }
    if existing.canonicalize()?.starts_with(&root) {
        Ok(())
    } else {
        Err(refused("path resolves outside the extraction root"))
    }
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
}

/// `confine` is the root the target must stay under; `None` for entries
/// routed to the filesystem root.
fn unpack_to<R: io::Read>(
    entry: &mut tar::Entry<'_, R>,
    target: &Path,
    confine: Option<&Path>,
    options: &ExtractOptions,
) -> io::Result<()> {
    if let Some(root) = confine {
        ensure_within(root, target)?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let kind = entry.header().entry_type();
    if kind.is_symlink() {
        let link = entry
            .link_name()?
            .ok_or_else(|| refused("symlink without a target"))?;
        if link.is_absolute() || link.components().any(|c| c == Component::ParentDir) {
            return Err(refused(format!(
                "symlink target {} leaves the extraction root",
                link.display()
            )));
        }
    } else if kind.is_hard_link() {
        let link = entry
            .link_name()?
            .ok_or_else(|| refused("hard link without a target"))?;
        if link.is_absolute() {
            return Err(refused(format!("hard link target {} is absolute", link.display())));
        }
        let source = sanitize(&link)
            .map(|relative| options.target_for(&relative))
            .ok_or_else(|| {
                refused(format!(
                    "hard link target {} leaves the extraction root",
                    link.display()
                ))
            })?;
        if let Some(root) = confine {
            ensure_within(root, &source)?;
        }
        if fs::symlink_metadata(target).is_ok() {
            fs::remove_file(target)?;
        }
        return fs::hard_link(&source, target);
    }
    if !kind.is_dir() && is_symlink(target) {
        fs::remove_file(target)?;
    }
    entry.unpack(target).map(|_| ())
}
