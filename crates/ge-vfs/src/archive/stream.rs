//! Fully materialized stream over one archive entry.

use crate::archive::{ZipEntryRecord, ZipFileSystem};
use crate::error::VfsResult;
use crate::stream::{AccessMode, ByteStream, MemoryStream};

/// Read-only stream over the decompressed bytes of one archive entry.
///
/// Construction decompresses the whole entry; after that the stream never
/// touches the archive again and holds no reference to it. The payload is
/// reference-counted, so [`share`](Self::share) and `clone_stream(false)`
/// are cheap and keep the bytes alive on their own.
#[derive(Debug)]
pub struct ZipDataStream {
    archive_name: String,
    inner: MemoryStream,
}

impl ZipDataStream {
    /// Decompress `record` out of `archive`.
    ///
    /// # Errors
    /// [`VfsError::ArchiveEntryNotFound`](crate::VfsError::ArchiveEntryNotFound)
    /// if the archive has no such entry,
    /// [`VfsError::ArchiveEntryCorrupt`](crate::VfsError::ArchiveEntryCorrupt)
    /// if it can't be opened or doesn't decompress to exactly
    /// `record.uncompressed_size` bytes.
    pub fn new(archive: &ZipFileSystem, record: &ZipEntryRecord) -> VfsResult<Self> {
        let data = archive.decompress(record)?;
        Ok(Self {
            archive_name: archive.archive_name().to_string(),
            inner: MemoryStream::new(record.filename.clone(), data),
        })
    }

    /// Name of the archive this entry came from.
    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    /// The decompressed entry, independent of the read position.
    pub fn as_slice(&self) -> &[u8] {
        self.inner.as_slice()
    }

    /// A second stream over the same payload, at the same position.
    pub fn share(&self) -> ZipDataStream {
        Self {
            archive_name: self.archive_name.clone(),
            inner: self.inner.share(),
        }
    }

    /// Returns true if `other` reads from the same payload.
    pub fn shares_buffer_with(&self, other: &ZipDataStream) -> bool {
        self.inner.shares_buffer_with(&other.inner)
    }
}

impl ByteStream for ZipDataStream {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn access(&self) -> AccessMode {
        AccessMode::read()
    }

    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        self.inner.read(buf)
    }

    /// Always `Ok(0)`: archive entries are never writable.
    fn write(&mut self, _buf: &[u8]) -> VfsResult<usize> {
        tracing::warn!(
            "write to read-only archive entry {} in {}",
            self.inner.name(),
            self.archive_name
        );
        Ok(0)
    }

    fn seek(&mut self, pos: u64) -> VfsResult<()> {
        self.inner.seek(pos)
    }

    fn tell(&self) -> u64 {
        self.inner.tell()
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn clone_stream(&self, copy_data: bool) -> VfsResult<Box<dyn ByteStream>> {
        if copy_data {
            self.inner.clone_stream(true)
        } else {
            Ok(Box::new(self.share()))
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }
}
