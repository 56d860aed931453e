//! Read-only stream over a file on disk.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::VfsResult;
use crate::stream::{AccessMode, ByteStream, MemoryStream};

/// Read-only file-backed stream.
///
/// The size is taken once at open time.
#[derive(Debug)]
pub struct FileStream {
    name: String,
    path: PathBuf,
    file: Option<File>,
    size: u64,
    pos: u64,
}

impl FileStream {
    /// Open `path` for reading. `name` is the path the caller asked for.
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> VfsResult<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            name: name.into(),
            path,
            file: Some(file),
            size,
            pos: 0,
        })
    }

    /// Filesystem path this stream reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteStream for FileStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> AccessMode {
        AccessMode::read()
    }

    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };
        let remaining = self.size.saturating_sub(self.pos);
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = file.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> VfsResult<usize> {
        tracing::warn!("write to read-only file stream {}", self.name);
        Ok(0)
    }

    fn seek(&mut self, pos: u64) -> VfsResult<()> {
        let pos = pos.min(self.size);
        if let Some(file) = self.file.as_mut() {
            file.seek(SeekFrom::Start(pos))?;
        }
        self.pos = pos;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn clone_stream(&self, copy_data: bool) -> VfsResult<Box<dyn ByteStream>> {
        if self.file.is_none() {
            return Ok(Box::new(MemoryStream::new(self.name.clone(), Vec::new())));
        }

        if copy_data {
            let data = std::fs::read(&self.path)?;
            let mut copy = MemoryStream::new(self.name.clone(), data);
            copy.seek(self.pos)?;
            Ok(Box::new(copy))
        } else {
            let mut reopened = FileStream::open(self.name.clone(), self.path.clone())?;
            reopened.seek(self.pos)?;
            Ok(Box::new(reopened))
        }
    }

    fn close(&mut self) {
        self.file = None;
        self.size = 0;
        self.pos = 0;
    }
}
