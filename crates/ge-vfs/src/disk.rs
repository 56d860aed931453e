//! Directory backend.
//!
//! Serves files under a root directory. Paths are relative to the root;
//! `..` components that would leave the root are refused.

use std::io;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{VfsError, VfsResult};
use crate::path::{normalize_separators, to_virtual};
use crate::stream::FileStream;

/// A directory subtree addressed by relative virtual paths.
///
/// For example, if `root` is `/games/demo/data`, then `open("maps/a.map")`
/// reads `/games/demo/data/maps/a.map`.
///
/// The root is not checked at construction; a missing root shows up as
/// absent files and as an error from [`all_files`](Self::all_files).
#[derive(Debug, Clone)]
pub struct DiskFileSystem {
    root: PathBuf,
}

impl DiskFileSystem {
    /// Create a filesystem rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `path` onto the root.
    ///
    /// Separators are normalized first and a leading `/` is ignored.
    ///
    /// # Errors
    /// [`VfsError::PathEscapesRoot`] if `..` components climb above the root.
    pub fn resolve(&self, path: &str) -> VfsResult<PathBuf> {
        let normalized = normalize_separators(path);
        let relative = Path::new(normalized.trim_start_matches('/'));

        let mut depth = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::ParentDir => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| VfsError::path_escapes_root(path))?;
                }
                Component::CurDir => {}
                Component::RootDir | Component::Prefix(_) => {
                    return Err(VfsError::path_escapes_root(path));
                }
            }
        }

        Ok(self.root.join(relative))
    }

    /// Returns true if `root/path` is a file. Directories don't count.
    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path)
            .map(|full| full != self.root && full.is_file())
            .unwrap_or(false)
    }

    /// Open `root/path` read-only.
    ///
    /// Returns `Ok(None)` if there is no such file. Directories are not
    /// files and also give `None`.
    pub fn open_file(&self, path: &str) -> VfsResult<Option<FileStream>> {
        let full = self.resolve(path)?;
        if full == self.root || !full.is_file() {
            return Ok(None);
        }
        FileStream::open(path, full).map(Some)
    }

    /// Every file under the root, as a virtual path relative to the root.
    ///
    /// Directories are walked but not listed. Order follows the directory
    /// walk and is not sorted.
    ///
    /// # Errors
    /// Fails if the root (or a subdirectory) can't be read, or if the root
    /// is not a directory.
    pub fn all_files(&self) -> VfsResult<Vec<String>> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(VfsError::Io(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("disk root {} is not a directory", self.root.display()),
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(|e| VfsError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let path = to_virtual(relative);
                if !path.is_empty() {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }

    /// Canonical absolute path of `root/path`, if it exists.
    pub fn real_path(&self, path: &str) -> Option<PathBuf> {
        let full = self.resolve(path).ok()?;
        dunce::canonicalize(full).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ByteStream;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn setup() -> (DiskFileSystem, TempDir) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "A").unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), "B").unwrap();
        std::fs::write(dir.path().join("sub/deeper/c.txt"), "C").unwrap();
        let fs = DiskFileSystem::new(dir.path());
        (fs, dir)
    }

    #[test]
    fn test_exists_is_relative_to_root() {
        let (fs, _dir) = setup();
        assert!(fs.exists("a.txt"));
        assert!(fs.exists("sub/b.txt"));
        assert!(fs.exists("sub\\deeper\\c.txt"));
        assert!(!fs.exists("missing.txt"));
    }

    #[test]
    fn test_exists_does_not_consult_working_directory() {
        let (fs, _dir) = setup();
        // Cargo.toml exists in the crate directory tests run from, not under the root.
        assert!(Path::new("Cargo.toml").exists());
        assert!(!fs.exists("Cargo.toml"));
    }

    #[test]
    fn test_exists_agrees_with_open_for_directories() {
        let (fs, _dir) = setup();
        assert!(!fs.exists("sub"));
        assert!(fs.open_file("sub").unwrap().is_none());
    }

    #[test]
    fn test_file_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.pak");
        std::fs::write(&file, "not a directory").unwrap();

        let fs = DiskFileSystem::new(&file);
        match fs.all_files() {
            Err(VfsError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotADirectory),
            other => panic!("expected NotADirectory, got {:?}", other),
        }
        assert!(!fs.exists(""));
        assert!(fs.open_file("").unwrap().is_none());
    }

    #[test]
    fn test_open_reads_contents() {
        let (fs, _dir) = setup();
        let mut stream = fs.open_file("sub/deeper/c.txt").unwrap().unwrap();
        assert_eq!(stream.read_all().unwrap(), b"C");
        assert_eq!(stream.name(), "sub/deeper/c.txt");
    }

    #[test]
    fn test_open_missing_or_directory_is_none() {
        let (fs, _dir) = setup();
        assert!(fs.open_file("nope.txt").unwrap().is_none());
        assert!(fs.open_file("sub").unwrap().is_none());
    }

    #[test]
    fn test_all_files_recursive_relative() {
        let (fs, _dir) = setup();
        let files: HashSet<_> = fs.all_files().unwrap().into_iter().collect();
        let expected: HashSet<_> = ["a.txt", "sub/b.txt", "sub/deeper/c.txt"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(files, expected);
    }

    #[test]
    fn test_missing_root_is_deferred() {
        let dir = TempDir::new().unwrap();
        let fs = DiskFileSystem::new(dir.path().join("not-there"));
        assert!(!fs.exists("a.txt"));
        assert!(fs.open_file("a.txt").unwrap().is_none());
        assert!(fs.all_files().is_err());
    }

    #[test]
    fn test_path_escape_blocked() {
        let (fs, _dir) = setup();
        assert!(matches!(
            fs.resolve("../../../etc/passwd"),
            Err(VfsError::PathEscapesRoot(_))
        ));
        assert!(fs.open_file("sub/../../x").is_err());
        assert!(!fs.exists("../a.txt"));
        assert!(fs.resolve("sub/../a.txt").is_ok());
    }

    #[test]
    fn test_leading_slash_ignored() {
        let (fs, _dir) = setup();
        assert!(fs.exists("/a.txt"));
    }

    #[test]
    fn test_real_path() {
        let (fs, _dir) = setup();
        let real = fs.real_path("sub/b.txt").unwrap();
        assert!(real.is_absolute());
        assert!(real.ends_with("sub/b.txt"));
        assert!(fs.real_path("nonexistent.txt").is_none());
    }
}
