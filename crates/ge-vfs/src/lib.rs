//! # ge-vfs
//!
//! Virtual file system for geEngineSDK.
//!
//! Engine code reads files by virtual path; the VFS decides which mounted
//! source serves each path. Key components:
//!
//! - [`MountManager`] - flat case-insensitive index over every mount
//! - [`ZipFileSystem`] - zip archive indexed once, entries decompressed on open
//! - [`DiskFileSystem`] - directory tree under a root
//! - [`ByteStream`] - what `open` hands back
//! - [`MountConfig`] - ordered mount list loaded from TOML
//!
//! ## Design Decisions
//!
//! - **Last mount wins**: a path present in several mounts is served by
//!   the one mounted most recently, whatever its kind. Mounting an
//!   already-mounted backend again does not move it up.
//! - **Absence is not an error**: lookups return `false`/`None`; `Err` is
//!   kept for corrupt or unreadable sources.
//! - **Eager decompression**: opening a zip entry inflates all of it on the
//!   calling thread.
//! - **No globals**: a `MountManager` is an ordinary value; share it with
//!   `Arc` if several owners need it.
//!
//! ```no_run
//! use ge_vfs::{ByteStream, MountManager};
//!
//! # fn main() -> ge_vfs::VfsResult<()> {
//! let vfs = MountManager::new();
//! vfs.mount_disk("data")?;
//! vfs.mount_zip("patch.zip")?;
//!
//! if let Some(mut stream) = vfs.open("Textures/Wall.png")? {
//!     let bytes = stream.read_all()?;
//!     println!("{} bytes", bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod disk;
mod error;
pub mod mount;
pub mod path;
pub mod source;
pub mod stream;

pub use archive::{ZipDataStream, ZipEntryRecord, ZipFileSystem, ZipIndexOptions};
pub use config::{MountConfig, MountReport, MountSpec};
pub use disk::DiskFileSystem;
pub use error::{VfsError, VfsResult};
pub use mount::{FileEntry, MountManager};
pub use source::{Backend, FileSource, SourceKind};
pub use stream::{AccessMode, ByteStream, FileStream, MemoryStream};
