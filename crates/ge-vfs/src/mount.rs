//! Mount manager: one case-insensitive namespace over many backends.
//!
//! Every mounted backend contributes its files to a single flat index keyed
//! by the lower-cased virtual path. Mounting overwrites colliding keys, so
//! the backend mounted most recently serves a path. Backend kind plays no
//! part in this: a disk mounted after a zip overrides the zip, and the
//! other way round.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::archive::ZipFileSystem;
use crate::disk::DiskFileSystem;
use crate::error::VfsResult;
use crate::path::{lookup_key, normalize_separators};
use crate::source::{Backend, SourceKind};
use crate::stream::ByteStream;

/// Index entry for one virtual path.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Virtual path with its original casing.
    pub virtual_path: String,
    /// Path inside the owning backend. For zip entries this is the entry
    /// name in the archive, not a filesystem path.
    pub internal_path: String,
    /// Backend serving this path.
    pub backend: Backend,
    /// Position of that backend in the mount order, counting from 0.
    pub mount_order: usize,
}

impl FileEntry {
    /// Kind of the owning backend.
    pub fn kind(&self) -> SourceKind {
        self.backend.kind()
    }
}

#[derive(Default)]
struct MountState {
    /// Distinct mounted backends, in mount order.
    mounts: Vec<Backend>,
    /// Lower-cased virtual path -> entry. Last mount wins.
    index: HashMap<String, FileEntry>,
}

impl MountState {
    /// Position of `backend` in the mount order, if it is mounted.
    fn position(&self, backend: &Backend) -> Option<usize> {
        self.mounts.iter().position(|m| m.same_backend(backend))
    }

    fn count(&self, kind: SourceKind) -> usize {
        self.mounts.iter().filter(|m| m.kind() == kind).count()
    }
}

/// Resolves virtual paths across mounted disk and zip backends.
///
/// All methods take `&self`; the index sits behind a read-write lock, so
/// lookups may run concurrently with each other and with mounts. Streams
/// are opened outside the lock.
///
/// The manager never reports absence as an error: `exists` is `false`,
/// `open` is `Ok(None)` and `real_path` is `None` for unknown paths.
pub struct MountManager {
    state: RwLock<MountState>,
}

impl std::fmt::Debug for MountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state.try_read() {
            Some(state) => f
                .debug_struct("MountManager")
                .field("zips", &state.count(SourceKind::Zip))
                .field("disks", &state.count(SourceKind::Disk))
                .field("files", &state.index.len())
                .finish(),
            None => f
                .debug_struct("MountManager")
                .field("state", &"<locked>")
                .finish(),
        }
    }
}

impl Default for MountManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MountManager {
    /// Create a manager with nothing mounted.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MountState::default()),
        }
    }

    /// Mount a backend, indexing every file it lists.
    ///
    /// Paths already indexed under the same case-folded key are taken over
    /// by this backend. Returns the number of files listed.
    ///
    /// Mounting a backend that is already mounted (the same `Arc`) keeps
    /// its original place in the mount order: it re-lists its files and
    /// indexes them as if mounted at that place, so it still overrides
    /// backends mounted before it and never those mounted after it.
    ///
    /// # Errors
    /// Fails if the backend can't list its files (for example, a disk
    /// root that doesn't exist). Nothing is registered in that case.
    #[tracing::instrument(skip(self, backend), name = "vfs.mount")]
    pub fn mount(&self, backend: impl Into<Backend>) -> VfsResult<usize> {
        let backend = backend.into();
        let files = backend.as_source().all_files()?;

        let mut state = self.state.write();
        let existing = state.position(&backend);
        let remount = existing.is_some();
        let order = match existing {
            Some(order) => order,
            None => {
                state.mounts.push(backend.clone());
                state.mounts.len() - 1
            }
        };

        let count = files.len();
        let mut overridden = 0;
        for internal_path in files {
            let virtual_path = normalize_separators(&internal_path).into_owned();
            let key = virtual_path.to_lowercase();
            if state
                .index
                .get(&key)
                .is_some_and(|current| current.mount_order > order)
            {
                continue;
            }
            let entry = FileEntry {
                virtual_path,
                internal_path,
                backend: backend.clone(),
                mount_order: order,
            };
            if let Some(previous) = state.index.insert(key, entry) {
                if !previous.backend.same_backend(&backend) {
                    overridden += 1;
                }
            }
        }

        if remount {
            tracing::debug!("refreshed {} backend: {} files", backend.kind(), count);
        } else {
            tracing::debug!(
                "mounted {} backend: {} files ({} overriding earlier mounts)",
                backend.kind(),
                count,
                overridden
            );
        }
        Ok(count)
    }

    /// Open the archive at `path` and mount it.
    pub fn mount_zip(&self, path: impl AsRef<std::path::Path>) -> VfsResult<Arc<ZipFileSystem>> {
        let zip = Arc::new(ZipFileSystem::open_archive(path)?);
        self.mount(Arc::clone(&zip))?;
        Ok(zip)
    }

    /// Mount the directory at `root`.
    pub fn mount_disk(&self, root: impl Into<PathBuf>) -> VfsResult<Arc<DiskFileSystem>> {
        let disk = Arc::new(DiskFileSystem::new(root));
        self.mount(Arc::clone(&disk))?;
        Ok(disk)
    }

    /// Returns true if `path` is indexed, in any casing.
    pub fn exists(&self, path: &str) -> bool {
        self.state.read().index.contains_key(&lookup_key(path))
    }

    /// Index entry for `path`, if any.
    pub fn entry(&self, path: &str) -> Option<FileEntry> {
        self.state.read().index.get(&lookup_key(path)).cloned()
    }

    /// Open `path` through the backend that currently serves it.
    ///
    /// Returns `Ok(None)` if the path isn't indexed, or if the backend no
    /// longer has it.
    ///
    /// # Errors
    /// Propagates backend failures, such as a corrupt archive entry.
    pub fn open(&self, path: &str) -> VfsResult<Option<Box<dyn ByteStream>>> {
        let Some(entry) = self.entry(path) else {
            return Ok(None);
        };
        entry.backend.as_source().open(&entry.internal_path)
    }

    /// Read the whole of `path`.
    pub fn read(&self, path: &str) -> VfsResult<Option<Vec<u8>>> {
        match self.open(path)? {
            Some(mut stream) => stream.read_all().map(Some),
            None => Ok(None),
        }
    }

    /// Backend-local path recorded for `path`.
    ///
    /// For zip-backed files this is the entry name inside the archive and
    /// can't be opened with filesystem calls.
    pub fn real_path(&self, path: &str) -> Option<PathBuf> {
        self.entry(path)
            .map(|entry| PathBuf::from(entry.internal_path))
    }

    /// Kind of backend serving `path`.
    pub fn source_kind(&self, path: &str) -> Option<SourceKind> {
        self.entry(path).map(|entry| entry.kind())
    }

    /// Every indexed virtual path, sorted, with its original casing.
    pub fn all_files(&self) -> Vec<String> {
        let state = self.state.read();
        let mut files: Vec<String> = state
            .index
            .values()
            .map(|entry| entry.virtual_path.clone())
            .collect();
        files.sort();
        files
    }

    /// Number of indexed paths.
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.state.read().index.is_empty()
    }

    /// Number of distinct archives mounted since the last clear.
    pub fn zip_mount_count(&self) -> usize {
        self.state.read().count(SourceKind::Zip)
    }

    /// Number of distinct directories mounted since the last clear.
    pub fn disk_mount_count(&self) -> usize {
        self.state.read().count(SourceKind::Disk)
    }

    /// Forget every mount and every indexed path.
    ///
    /// Backends and streams held elsewhere stay valid.
    pub fn clear(&self) {
        let old = std::mem::take(&mut *self.state.write());
        tracing::debug!(
            "cleared {} zip mounts, {} disk mounts, {} files",
            old.count(SourceKind::Zip),
            old.count(SourceKind::Disk),
            old.index.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::build_zip;
    use tempfile::TempDir;

    fn zip(entries: &[(&str, &[u8])]) -> ZipFileSystem {
        ZipFileSystem::from_bytes("test.zip", build_zip(entries)).unwrap()
    }

    #[test]
    fn test_basic_mount() {
        let manager = MountManager::new();
        let count = manager.mount(zip(&[("a.txt", b"hello")])).unwrap();
        assert_eq!(count, 1);

        assert!(manager.exists("a.txt"));
        assert_eq!(manager.read("a.txt").unwrap().unwrap(), b"hello");
        assert_eq!(manager.zip_mount_count(), 1);
        assert_eq!(manager.disk_mount_count(), 0);
    }

    #[test]
    fn test_case_insensitive_lookup_keeps_casing() {
        let manager = MountManager::new();
        manager.mount(zip(&[("Data/Config.INI", b"x=1")])).unwrap();

        assert!(manager.exists("data/config.ini"));
        assert!(manager.exists("DATA\\CONFIG.INI"));
        assert_eq!(manager.all_files(), vec!["Data/Config.INI".to_string()]);
        assert_eq!(
            manager.real_path("data/config.ini"),
            Some(PathBuf::from("Data/Config.INI"))
        );
    }

    #[test]
    fn test_later_mount_overrides() {
        let manager = MountManager::new();
        manager.mount(zip(&[("same.txt", b"one"), ("only1.txt", b"1")])).unwrap();
        manager.mount(zip(&[("SAME.txt", b"two")])).unwrap();

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.read("same.txt").unwrap().unwrap(), b"two");
        assert_eq!(manager.read("only1.txt").unwrap().unwrap(), b"1");
        assert_eq!(manager.entry("same.txt").unwrap().virtual_path, "SAME.txt");
    }

    #[test]
    fn test_remount_same_backend() {
        let manager = MountManager::new();
        let shared = Arc::new(zip(&[("a.txt", b"a")]));
        manager.mount(Arc::clone(&shared)).unwrap();
        manager.mount(Arc::clone(&shared)).unwrap();

        assert_eq!(manager.zip_mount_count(), 1);
        assert_eq!(manager.len(), 1);
        assert!(manager.entry("a.txt").unwrap().backend.same_backend(&Backend::from(shared)));
    }

    #[test]
    fn test_remount_keeps_original_position() {
        let manager = MountManager::new();
        let first = Arc::new(zip(&[("same.txt", b"first"), ("a.txt", b"a")]));
        manager.mount(Arc::clone(&first)).unwrap();
        manager.mount(zip(&[("same.txt", b"second")])).unwrap();

        manager.mount(Arc::clone(&first)).unwrap();
        assert_eq!(manager.read("same.txt").unwrap().unwrap(), b"second");
        assert_eq!(manager.read("a.txt").unwrap().unwrap(), b"a");
        assert_eq!(manager.zip_mount_count(), 2);

        assert_eq!(manager.entry("a.txt").unwrap().mount_order, 0);
        assert_eq!(manager.entry("same.txt").unwrap().mount_order, 1);

        // A different backend over the same bytes is a new mount.
        manager.mount(zip(&[("same.txt", b"first")])).unwrap();
        assert_eq!(manager.read("same.txt").unwrap().unwrap(), b"first");
    }

    #[test]
    fn test_remount_overrides_earlier_mounts() {
        let dir = TempDir::new().unwrap();
        let manager = MountManager::new();
        manager.mount(zip(&[("same.txt", b"zip")])).unwrap();
        let disk = manager.mount_disk(dir.path()).unwrap();

        std::fs::write(dir.path().join("same.txt"), "disk").unwrap();
        manager.mount(Arc::clone(&disk)).unwrap();

        assert_eq!(manager.read("same.txt").unwrap().unwrap(), b"disk");
        assert_eq!(manager.source_kind("same.txt"), Some(SourceKind::Disk));
        assert_eq!(manager.entry("same.txt").unwrap().mount_order, 1);
    }

    #[test]
    fn test_failed_listing_registers_nothing() {
        let dir = TempDir::new().unwrap();
        let manager = MountManager::new();
        let result = manager.mount(DiskFileSystem::new(dir.path().join("missing")));

        assert!(result.is_err());
        assert_eq!(manager.disk_mount_count(), 0);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_empty_and_unknown_paths() {
        let manager = MountManager::new();
        manager.mount(zip(&[("a.txt", b"a")])).unwrap();

        for path in ["", "b.txt", "a.txt/"] {
            assert!(!manager.exists(path));
            assert!(manager.open(path).unwrap().is_none());
            assert!(manager.real_path(path).is_none());
            assert!(manager.source_kind(path).is_none());
            assert!(manager.read(path).unwrap().is_none());
        }
    }

    #[test]
    fn test_clear() {
        let manager = MountManager::new();
        manager.mount(zip(&[("a.txt", b"a")])).unwrap();
        manager.clear();

        assert!(manager.is_empty());
        assert_eq!(manager.zip_mount_count(), 0);
        assert!(!manager.exists("a.txt"));
    }

    #[test]
    fn test_debug_shows_counts() {
        let manager = MountManager::new();
        manager.mount(zip(&[("a.txt", b"a")])).unwrap();
        let debug = format!("{:?}", manager);
        assert!(debug.contains("zips: 1"));
        assert!(debug.contains("files: 1"));
    }
}
