//! In-memory byte stream.

use std::fmt;
use std::sync::Arc;

use crate::error::VfsResult;
use crate::stream::{AccessMode, ByteStream};

/// Stream over a shared, reference-counted buffer.
///
/// Clones made with `clone_stream(false)` share the buffer. Writes copy the
/// buffer first if it is shared, so no stream ever observes another
/// stream's writes. Writes never grow the buffer.
pub struct MemoryStream {
    name: String,
    data: Arc<Vec<u8>>,
    pos: usize,
    access: AccessMode,
}

impl fmt::Debug for MemoryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStream")
            .field("name", &self.name)
            .field("size", &self.data.len())
            .field("pos", &self.pos)
            .field("access", &self.access)
            .finish()
    }
}

impl MemoryStream {
    /// Create a read-only stream owning `data`.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::from_shared(name, Arc::new(data), AccessMode::read())
    }

    /// Create a read/write stream owning `data`.
    pub fn writable(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::from_shared(name, Arc::new(data), AccessMode::read_write())
    }

    /// Create a stream over an already shared buffer.
    pub fn from_shared(name: impl Into<String>, data: Arc<Vec<u8>>, access: AccessMode) -> Self {
        Self {
            name: name.into(),
            data,
            pos: 0,
            access,
        }
    }

    /// The whole buffer, independent of the read position.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// A second stream over the same buffer, at the same position.
    pub fn share(&self) -> MemoryStream {
        Self {
            name: self.name.clone(),
            data: Arc::clone(&self.data),
            pos: self.pos,
            access: self.access,
        }
    }

    /// Returns true if `other` reads from the same buffer.
    pub fn shares_buffer_with(&self, other: &MemoryStream) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl ByteStream for MemoryStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&self) -> AccessMode {
        self.access
    }

    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        let remaining = self.data.len().saturating_sub(self.pos);
        let n = buf.len().min(remaining);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> VfsResult<usize> {
        if !self.access.is_writable() {
            tracing::warn!("write to read-only memory stream {}", self.name);
            return Ok(0);
        }
        let remaining = self.data.len().saturating_sub(self.pos);
        let n = buf.len().min(remaining);
        if n > 0 {
            let data = Arc::make_mut(&mut self.data);
            data[self.pos..self.pos + n].copy_from_slice(&buf[..n]);
            self.pos += n;
        }
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> VfsResult<()> {
        self.pos = usize::try_from(pos)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn clone_stream(&self, copy_data: bool) -> VfsResult<Box<dyn ByteStream>> {
        let mut copy = self.share();
        if copy_data {
            copy.data = Arc::new(self.data.as_ref().clone());
        }
        Ok(Box::new(copy))
    }

    fn close(&mut self) {
        self.data = Arc::new(Vec::new());
        self.pos = 0;
    }
}
