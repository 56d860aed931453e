//! VFS error types.
//!
//! Only corrupt or unopenable resources are errors. A path that simply
//! isn't there is reported as `false` or `None` by every lookup.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// The archive file could not be opened or its central directory read.
    #[error("cannot open archive {path}: {source}")]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// An indexed entry is no longer present in its archive.
    #[error("archive entry not found: {0}")]
    ArchiveEntryNotFound(String),

    /// An archive entry could not be opened or fully decompressed.
    #[error("archive entry {entry} is corrupt: {reason}")]
    ArchiveEntryCorrupt { entry: String, reason: String },

    /// Path escapes root (security violation).
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Mount configuration could not be parsed or applied.
    #[error("invalid mount config: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create an ArchiveOpen error.
    pub fn archive_open(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::ArchiveOpen {
            path: path.into(),
            source,
        }
    }

    /// Create an ArchiveEntryNotFound error.
    pub fn entry_not_found(entry: impl Into<String>) -> Self {
        Self::ArchiveEntryNotFound(entry.into())
    }

    /// Create an ArchiveEntryCorrupt error.
    pub fn entry_corrupt(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArchiveEntryCorrupt {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::ArchiveOpen { path, source } => io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: {}", path.display(), source),
            ),
            VfsError::ArchiveEntryNotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::ArchiveEntryCorrupt { entry, reason } => {
                io::Error::new(io::ErrorKind::InvalidData, format!("{entry}: {reason}"))
            }
            VfsError::PathEscapesRoot(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            VfsError::InvalidConfig(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Io(e) => e,
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
