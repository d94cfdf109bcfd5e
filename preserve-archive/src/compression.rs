//! Suffix-driven codec selection.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// Container compression, chosen from the archive file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Bzip2,
    None,
}

/// Suffixes recognised as archives, longest first.
pub const ARCHIVE_SUFFIXES: &[(&str, Compression)] = &[
    (".tar.gz", Compression::Gzip),
    (".tar.bz2", Compression::Bzip2),
    (".tgz", Compression::Gzip),
    (".tar", Compression::None),
];

impl Compression {
    /// The codec for a recognised suffix, `None` otherwise.
    pub fn from_suffix(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        ARCHIVE_SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, c)| *c)
    }

    /// Codec used to read an existing archive. Unknown suffixes read as gzip.
    pub fn for_archive(path: &Path) -> Self {
        Self::from_suffix(path).unwrap_or(Compression::Gzip)
    }

    /// Final destination and codec for a requested archive name. An
    /// unrecognised name gets `.tar.gz` appended.
    pub fn resolve_destination(requested: &Path) -> (PathBuf, Self) {
        match Self::from_suffix(requested) {
            Some(c) => (requested.to_path_buf(), c),
            None => {
                let mut name = OsString::from(requested.as_os_str());
                name.push(".tar.gz");
                (PathBuf::from(name), Compression::Gzip)
            }
        }
    }

    pub(crate) fn encoder<W: Write>(self, inner: W) -> Encoder<W> {
        match self {
            Compression::Gzip => Encoder::Gzip(GzEncoder::new(inner, flate2::Compression::default())),
            Compression::Bzip2 => Encoder::Bzip2(BzEncoder::new(inner, bzip2::Compression::default())),
            Compression::None => Encoder::Plain(inner),
        }
    }

    pub(crate) fn decoder<'a, R: Read + 'a>(self, inner: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::Gzip => Box::new(GzDecoder::new(inner)),
            Compression::Bzip2 => Box::new(BzDecoder::new(inner)),
            Compression::None => Box::new(inner),
        }
    }
}

/// Write side of a codec; [`Encoder::finish`] flushes the trailer.
pub(crate) enum Encoder<W: Write> {
    Gzip(GzEncoder<W>),
    Bzip2(BzEncoder<W>),
    Plain(W),
}

impl<W: Write> Encoder<W> {
    pub(crate) fn finish(self) -> io::Result<W> {
        match self {
            Encoder::Gzip(e) => e.finish(),
            Encoder::Bzip2(e) => e.finish(),
            Encoder::Plain(mut w) => {
                w.flush()?;
                Ok(w)
            }
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::Gzip(e) => e.write(buf),
            Encoder::Bzip2(e) => e.write(buf),
            Encoder::Plain(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Gzip(e) => e.flush(),
            Encoder::Bzip2(e) => e.flush(),
            Encoder::Plain(w) => w.flush(),
        }
    }
}
