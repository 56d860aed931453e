//! Backend contract and the mountable backend sum type.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::archive::ZipFileSystem;
use crate::disk::DiskFileSystem;
use crate::error::VfsResult;
use crate::stream::ByteStream;

/// Which kind of backend serves a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Entry inside a zip archive.
    Zip,
    /// File under a directory on disk.
    Disk,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Zip => f.write_str("zip"),
            SourceKind::Disk => f.write_str("disk"),
        }
    }
}

/// Operations every backend provides.
///
/// Paths are backend-local and compared exactly. Absence is `false` or
/// `Ok(None)`; `Err` means the backing store itself is broken.
pub trait FileSource: Send + Sync + fmt::Debug {
    /// Backend kind.
    fn kind(&self) -> SourceKind;

    /// Returns true if `path` names a file `open` can return.
    fn exists(&self, path: &str) -> bool;

    /// Open `path` for reading.
    fn open(&self, path: &str) -> VfsResult<Option<Box<dyn ByteStream>>>;

    /// Every file this backend serves.
    fn all_files(&self) -> VfsResult<Vec<String>>;
}

impl FileSource for ZipFileSystem {
    fn kind(&self) -> SourceKind {
        SourceKind::Zip
    }

    fn exists(&self, path: &str) -> bool {
        ZipFileSystem::exists(self, path)
    }

    fn open(&self, path: &str) -> VfsResult<Option<Box<dyn ByteStream>>> {
        Ok(self
            .open_entry(path)?
            .map(|stream| Box::new(stream) as Box<dyn ByteStream>))
    }

    fn all_files(&self) -> VfsResult<Vec<String>> {
        Ok(ZipFileSystem::all_files(self))
    }
}

impl FileSource for DiskFileSystem {
    fn kind(&self) -> SourceKind {
        SourceKind::Disk
    }

    fn exists(&self, path: &str) -> bool {
        DiskFileSystem::exists(self, path)
    }

    fn open(&self, path: &str) -> VfsResult<Option<Box<dyn ByteStream>>> {
        Ok(self
            .open_file(path)?
            .map(|stream| Box::new(stream) as Box<dyn ByteStream>))
    }

    fn all_files(&self) -> VfsResult<Vec<String>> {
        DiskFileSystem::all_files(self)
    }
}

/// A mounted backend, shared with whoever else holds it.
#[derive(Debug, Clone)]
pub enum Backend {
    Zip(Arc<ZipFileSystem>),
    Disk(Arc<DiskFileSystem>),
}

impl Backend {
    /// The backend as its trait object.
    pub fn as_source(&self) -> &dyn FileSource {
        match self {
            Backend::Zip(zip) => &**zip,
            Backend::Disk(disk) => &**disk,
        }
    }

    /// Backend kind.
    pub fn kind(&self) -> SourceKind {
        self.as_source().kind()
    }

    /// Returns true if both values refer to the same backend object.
    pub fn same_backend(&self, other: &Backend) -> bool {
        match (self, other) {
            (Backend::Zip(a), Backend::Zip(b)) => Arc::ptr_eq(a, b),
            (Backend::Disk(a), Backend::Disk(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Arc<ZipFileSystem>> for Backend {
    fn from(zip: Arc<ZipFileSystem>) -> Self {
        Backend::Zip(zip)
    }
}

impl From<ZipFileSystem> for Backend {
    fn from(zip: ZipFileSystem) -> Self {
        Backend::Zip(Arc::new(zip))
    }
}

impl From<Arc<DiskFileSystem>> for Backend {
    fn from(disk: Arc<DiskFileSystem>) -> Self {
        Backend::Disk(disk)
    }
}

impl From<DiskFileSystem> for Backend {
    fn from(disk: DiskFileSystem) -> Self {
        Backend::Disk(Arc::new(disk))
    }
}
