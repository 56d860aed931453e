//! Zip archive backend.
//!
//! A [`ZipFileSystem`] reads the archive's central directory once, at
//! construction, into a map of normalized entry paths. Lookups are exact
//! (case-sensitive); the [`MountManager`](crate::MountManager) adds case
//! folding on top.
//!
//! Opening an entry decompresses all of it into memory before returning,
//! on the calling thread. See [`ZipDataStream`].

mod stream;

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use parking_lot::Mutex;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{VfsError, VfsResult};
use crate::path::normalize_separators;

pub use stream::ZipDataStream;

/// Anything a zip archive can be read from.
pub trait ArchiveSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> ArchiveSource for T {}

/// Upper bound on the buffer reserved up front for one entry. The declared
/// size comes from the archive and is not trusted for allocation.
const MAX_PREALLOC: usize = 64 * 1024 * 1024;

/// One indexed file entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntryRecord {
    /// Entry name exactly as stored in the archive.
    pub filename: String,
    /// Declared size after decompression.
    pub uncompressed_size: u64,
    /// Size of the stored payload.
    pub compressed_size: u64,
}

/// Controls which archive entries are indexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZipIndexOptions {
    /// Index regular files of size zero. Directory entries are never indexed.
    pub include_empty_files: bool,
}

impl ZipIndexOptions {
    /// Also index zero-size files.
    pub fn with_empty_files(mut self) -> Self {
        self.include_empty_files = true;
        self
    }
}

/// A zip archive presented as a map of paths to openable entries.
pub struct ZipFileSystem {
    name: String,
    archive: Mutex<ZipArchive<Box<dyn ArchiveSource>>>,
    index: HashMap<String, ZipEntryRecord>,
}

impl fmt::Debug for ZipFileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipFileSystem")
            .field("name", &self.name)
            .field("entries", &self.index.len())
            .finish()
    }
}

impl ZipFileSystem {
    /// Open the archive at `path` with default indexing.
    ///
    /// # Errors
    /// [`VfsError::ArchiveOpen`] if the file can't be opened or isn't a
    /// readable zip archive.
    pub fn open_archive(path: impl AsRef<Path>) -> VfsResult<Self> {
        Self::open_archive_with(path, ZipIndexOptions::default())
    }

    /// Open the archive at `path` with explicit indexing options.
    pub fn open_archive_with(
        path: impl AsRef<Path>,
        options: ZipIndexOptions,
    ) -> VfsResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| VfsError::archive_open(path, ZipError::Io(e)))?;
        let source: Box<dyn ArchiveSource> = Box::new(BufReader::new(file));
        Self::from_source(path.display().to_string(), source, options)
    }

    /// Use an archive already held in memory.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> VfsResult<Self> {
        Self::from_bytes_with(name, data, ZipIndexOptions::default())
    }

    /// Use an in-memory archive with explicit indexing options.
    pub fn from_bytes_with(
        name: impl Into<String>,
        data: Vec<u8>,
        options: ZipIndexOptions,
    ) -> VfsResult<Self> {
        let source: Box<dyn ArchiveSource> = Box::new(Cursor::new(data));
        Self::from_source(name.into(), source, options)
    }

    fn from_source(
        name: String,
        source: Box<dyn ArchiveSource>,
        options: ZipIndexOptions,
    ) -> VfsResult<Self> {
        let mut archive =
            ZipArchive::new(source).map_err(|e| VfsError::archive_open(&name, e))?;
        let index = Self::build_index(&name, &mut archive, options)?;
        tracing::debug!("indexed {} of {} entries in {}", index.len(), archive.len(), name);

        Ok(Self {
            name,
            archive: Mutex::new(archive),
            index,
        })
    }

    /// Walk the central directory once.
    ///
    /// Directory markers and nameless entries are skipped, as are empty
    /// files unless the options ask for them. When two entries normalize to
    /// the same path, the later one in archive order wins.
    fn build_index(
        name: &str,
        archive: &mut ZipArchive<Box<dyn ArchiveSource>>,
        options: ZipIndexOptions,
    ) -> VfsResult<HashMap<String, ZipEntryRecord>> {
        let mut index = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let entry = archive
                .by_index_raw(i)
                .map_err(|e| VfsError::archive_open(name, e))?;

            if entry.name().is_empty() || entry.is_dir() {
                continue;
            }
            if entry.size() == 0 && !options.include_empty_files {
                continue;
            }

            let record = ZipEntryRecord {
                filename: entry.name().to_string(),
                uncompressed_size: entry.size(),
                compressed_size: entry.compressed_size(),
            };
            let key = normalize_separators(&record.filename).into_owned();
            if let Some(previous) = index.insert(key, record) {
                tracing::debug!(
                    "{}: entry {} shadowed by a later entry with the same path",
                    name,
                    previous.filename
                );
            }
        }

        Ok(index)
    }

    /// Name of the archive (its path, or the name given to `from_bytes`).
    pub fn archive_name(&self) -> &str {
        &self.name
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if nothing was indexed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns true if `path` is indexed. Case-sensitive.
    pub fn exists(&self, path: &str) -> bool {
        self.index.contains_key(normalize_separators(path).as_ref())
    }

    /// Index record for `path`, if any.
    pub fn entry(&self, path: &str) -> Option<&ZipEntryRecord> {
        self.index.get(normalize_separators(path).as_ref())
    }

    /// Open `path`, decompressing the whole entry now.
    ///
    /// Returns `Ok(None)` if the path isn't indexed.
    ///
    /// # Errors
    /// Fails if the entry has vanished from the archive or can't be fully
    /// decompressed to its declared size.
    pub fn open_entry(&self, path: &str) -> VfsResult<Option<ZipDataStream>> {
        match self.entry(path) {
            Some(record) => ZipDataStream::new(self, record).map(Some),
            None => Ok(None),
        }
    }

    /// Every indexed path, in no particular order.
    pub fn all_files(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    /// Decompress the entry described by `record` into a buffer of exactly
    /// its declared size.
    pub(crate) fn decompress(&self, record: &ZipEntryRecord) -> VfsResult<Vec<u8>> {
        let mut archive = self.archive.lock();
        let entry = match archive.by_name(&record.filename) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(VfsError::entry_not_found(&record.filename));
            }
            Err(e) => return Err(VfsError::entry_corrupt(&record.filename, e.to_string())),
        };

        let expected = usize::try_from(record.uncompressed_size).map_err(|_| {
            VfsError::entry_corrupt(&record.filename, "declared size exceeds address space")
        })?;

        // One byte of slack so an over-long payload shows up as a mismatch,
        // and so the reader hits EOF and verifies the checksum.
        let mut data = Vec::with_capacity(expected.min(MAX_PREALLOC));
        entry
            .take(record.uncompressed_size.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| VfsError::entry_corrupt(&record.filename, e.to_string()))?;

        if data.len() != expected {
            return Err(VfsError::entry_corrupt(
                &record.filename,
                format!("expected {} bytes, decompressed {}", expected, data.len()),
            ));
        }
        Ok(data)
    }
}
