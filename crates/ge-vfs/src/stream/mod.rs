//! Byte streams handed out by backends.
//!
//! [`ByteStream`] is the one interface the VFS requires from the rest of
//! the engine. Every stream is seekable and sized; positions are clamped
//! to `[0, size]` rather than rejected.

mod file;
mod memory;

use std::fmt;
use std::io::{self, SeekFrom};

use crate::error::{VfsError, VfsResult};

pub use file::FileStream;
pub use memory::MemoryStream;

/// Requested access for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessMode {
    /// Read access requested.
    pub read: bool,
    /// Write access requested.
    pub write: bool,
}

impl Default for AccessMode {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
        }
    }
}

impl AccessMode {
    /// Read-only access.
    pub fn read() -> Self {
        Self::default()
    }

    /// Read and write access.
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
        }
    }

    /// Returns true if reads are allowed.
    pub fn is_readable(&self) -> bool {
        self.read
    }

    /// Returns true if writes are allowed.
    pub fn is_writable(&self) -> bool {
        self.write
    }
}

/// A seekable, sized byte stream.
///
/// Reads return the number of bytes copied, `0` at end of stream. Writes on
/// a read-only stream return `Ok(0)` and leave the data untouched.
pub trait ByteStream: Send + fmt::Debug {
    /// Name the stream was opened under (path or archive entry).
    fn name(&self) -> &str;

    /// Access granted to this stream.
    fn access(&self) -> AccessMode;

    /// Read up to `buf.len()` bytes at the current position.
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize>;

    /// Write `buf` at the current position.
    fn write(&mut self, buf: &[u8]) -> VfsResult<usize>;

    /// Move to absolute position `pos`, clamped to the stream size.
    fn seek(&mut self, pos: u64) -> VfsResult<()>;

    /// Current position.
    fn tell(&self) -> u64;

    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Independent copy of this stream at the same position.
    ///
    /// With `copy_data` the copy owns its own bytes; otherwise it shares
    /// the underlying data where the stream kind allows it.
    fn clone_stream(&self, copy_data: bool) -> VfsResult<Box<dyn ByteStream>>;

    /// Release the stream's data. Afterwards it behaves as an empty stream.
    fn close(&mut self);

    /// Move relative to the current position, clamped to `[0, size]`.
    fn skip(&mut self, count: i64) -> VfsResult<()> {
        let target = if count < 0 {
            self.tell().saturating_sub(count.unsigned_abs())
        } else {
            self.tell().saturating_add(count as u64)
        };
        self.seek(target)
    }

    /// Returns true once the position has reached the end.
    fn is_eof(&self) -> bool {
        self.tell() >= self.size()
    }

    /// Read everything from the current position to the end.
    fn read_all(&mut self) -> VfsResult<Vec<u8>> {
        let remaining = self.size().saturating_sub(self.tell());
        let mut out = vec![0u8; remaining as usize];
        let mut filled = 0;
        while filled < out.len() {
            let n = self.read(&mut out[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        out.truncate(filled);
        Ok(out)
    }

    /// Read the rest of the stream as UTF-8 text.
    fn read_to_string(&mut self) -> VfsResult<String> {
        let bytes = self.read_all()?;
        String::from_utf8(bytes)
            .map_err(|e| VfsError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Read one `\n`-terminated line, without the terminator.
    ///
    /// A trailing `\r` is dropped. Returns `None` at end of stream.
    fn read_line(&mut self) -> VfsResult<Option<String>> {
        if self.is_eof() {
            return Ok(None);
        }

        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        while self.read(&mut byte)? == 1 {
            if byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

impl io::Read for dyn ByteStream + '_ {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        ByteStream::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Seek for dyn ByteStream + '_ {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::End(delta) => i128::from(self.size()) + i128::from(delta),
            SeekFrom::Current(delta) => i128::from(self.tell()) + i128::from(delta),
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }
        let target = u64::try_from(target).unwrap_or(u64::MAX);
        ByteStream::seek(self, target).map_err(io::Error::from)?;
        Ok(self.tell())
    }
}
