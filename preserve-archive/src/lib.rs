//! # preserve-archive
//!
//! Tar archives of preserved files, optionally gzip or bzip2 compressed.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use preserve_archive::{ArchiveBuilder, ExtractOptions};
//!
//! let paths = vec!["out/kubeconfig".to_string()];
//! let built = ArchiveBuilder::new(".").build(&paths, Path::new("preserved_files.tar.gz"));
//! if let Some(summary) = built.value() {
//!     let restored = preserve_archive::extract(&summary.archive_path, &ExtractOptions::new("restore"));
//!     assert!(!restored.is_fatal());
//! }
//! ```

pub mod builder;
pub mod compression;
pub mod error;
pub mod reader;

pub use builder::{ArchiveBuilder, BuildSummary};
pub use compression::Compression;
pub use error::ArchiveError;
pub use reader::{extract, list, ExtractOptions, ExtractSummary};
