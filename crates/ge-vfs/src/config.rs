//! Mount configuration.
//!
//! A mount config is an ordered list of sources. Order matters: sources
//! are mounted top to bottom, so a later source overrides an earlier one
//! wherever they share a path.
//!
//! ```toml
//! [[mount]]
//! kind = "disk"
//! path = "data"
//!
//! [[mount]]
//! kind = "zip"
//! path = "patches/patch1.zip"
//! optional = true
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::archive::ZipFileSystem;
use crate::disk::DiskFileSystem;
use crate::error::{VfsError, VfsResult};
use crate::mount::MountManager;
use crate::source::SourceKind;

/// One source to mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Backend kind.
    pub kind: SourceKind,
    /// Archive file or directory root.
    pub path: PathBuf,
    /// Skip this source, with a warning, if it doesn't exist.
    #[serde(default)]
    pub optional: bool,
}

/// Ordered list of sources to mount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Sources in mount order; later entries override earlier ones.
    #[serde(default, rename = "mount")]
    pub mounts: Vec<MountSpec>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// What [`MountConfig::apply`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountReport {
    /// Sources mounted, as resolved paths, in order.
    pub mounted: Vec<PathBuf>,
    /// Optional sources skipped because they were missing.
    pub skipped: Vec<PathBuf>,
    /// Files indexed across all mounts, counting overridden ones.
    pub files_indexed: usize,
}

impl MountConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text. Relative paths stay relative to the
    /// working directory unless a base is set with [`with_base_dir`](Self::with_base_dir).
    pub fn from_toml_str(text: &str) -> VfsResult<Self> {
        let config: MountConfig =
            toml::from_str(text).map_err(|e| VfsError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> VfsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        Ok(match path.parent() {
            Some(parent) => config.with_base_dir(parent),
            None => config,
        })
    }

    /// Resolve relative source paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Append a source.
    pub fn push(&mut self, kind: SourceKind, path: impl Into<PathBuf>) -> &mut Self {
        self.mounts.push(MountSpec {
            kind,
            path: path.into(),
            optional: false,
        });
        self
    }

    fn validate(&self) -> VfsResult<()> {
        for (i, spec) in self.mounts.iter().enumerate() {
            if spec.path.as_os_str().is_empty() {
                return Err(VfsError::invalid_config(format!("mount #{} has an empty path", i + 1)));
            }
        }
        Ok(())
    }

    /// Where `spec` points, after base-dir resolution.
    pub fn resolve(&self, spec: &MountSpec) -> PathBuf {
        match &self.base_dir {
            Some(base) if spec.path.is_relative() => base.join(&spec.path),
            _ => spec.path.clone(),
        }
    }

    /// Mount every source, in order.
    ///
    /// # Errors
    /// Stops at the first source that fails to open or list, other than a
    /// missing optional one. Sources before it stay mounted.
    #[tracing::instrument(skip_all, name = "vfs.apply_config")]
    pub fn apply(&self, manager: &MountManager) -> VfsResult<MountReport> {
        self.validate()?;
        let mut report = MountReport::default();

        for spec in &self.mounts {
            let path = self.resolve(spec);
            if spec.optional && !path.exists() {
                tracing::warn!("optional {} mount {} not found, skipping", spec.kind, path.display());
                report.skipped.push(path);
                continue;
            }

            let count = match spec.kind {
                SourceKind::Zip => manager.mount(ZipFileSystem::open_archive(&path)?)?,
                SourceKind::Disk => manager.mount(DiskFileSystem::new(&path))?,
            };
            report.files_indexed += count;
            report.mounted.push(path);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::build_zip;
    use tempfile::TempDir;

    #[test]
    fn test_parse() {
        let config = MountConfig::from_toml_str(
            r#"
            [[mount]]
            kind = "disk"
            path = "data"

            [[mount]]
            kind = "zip"
            path = "patch.zip"
            optional = true
            "#,
        )
        .unwrap();

        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[0].kind, SourceKind::Disk);
        assert!(!config.mounts[0].optional);
        assert_eq!(config.mounts[1].kind, SourceKind::Zip);
        assert!(config.mounts[1].optional);
    }

    #[test]
    fn test_empty_config() {
        let config = MountConfig::from_toml_str("").unwrap();
        assert!(config.mounts.is_empty());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = MountConfig::from_toml_str(
            r#"
            [[mount]]
            kind = "ftp"
            path = "x"
            "#,
        );
        assert!(matches!(result, Err(VfsError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_path_rejected() {
        let result = MountConfig::from_toml_str(
            r#"
            [[mount]]
            kind = "disk"
            path = ""
            "#,
        );
        assert!(matches!(result, Err(VfsError::InvalidConfig(_))));
    }

    #[test]
    fn test_resolve_against_base() {
        let config = MountConfig::from_toml_str(
            r#"
            [[mount]]
            kind = "disk"
            path = "data"
            "#,
        )
        .unwrap()
        .with_base_dir("/games/demo");
        assert_eq!(config.resolve(&config.mounts[0]), PathBuf::from("/games/demo/data"));
    }

    #[test]
    fn test_load_and_apply_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/same.txt"), "DISK").unwrap();
        std::fs::write(dir.path().join("data/disk_only.txt"), "D").unwrap();
        std::fs::write(dir.path().join("patch.zip"), build_zip(&[("same.txt", b"ZIP")])).unwrap();
        std::fs::write(
            dir.path().join("mounts.toml"),
            r#"
            [[mount]]
            kind = "disk"
            path = "data"

            [[mount]]
            kind = "zip"
            path = "patch.zip"

            [[mount]]
            kind = "zip"
            path = "dlc.zip"
            optional = true
            "#,
        )
        .unwrap();

        let config = MountConfig::load(dir.path().join("mounts.toml")).unwrap();
        let manager = MountManager::new();
        let report = config.apply(&manager).unwrap();

        assert_eq!(report.mounted.len(), 2);
        assert_eq!(report.skipped, vec![dir.path().join("dlc.zip")]);
        assert_eq!(report.files_indexed, 3);
        assert_eq!(manager.read("same.txt").unwrap().unwrap(), b"ZIP");
        assert_eq!(manager.read("disk_only.txt").unwrap().unwrap(), b"D");
    }

    #[test]
    fn test_missing_required_source_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = MountConfig::new().with_base_dir(dir.path());
        config.push(SourceKind::Zip, "missing.zip");

        let manager = MountManager::new();
        let result = config.apply(&manager);
        assert!(matches!(result, Err(VfsError::ArchiveOpen { .. })));
    }
}
