//! Sequential byte cursor with offset tracking.
//!
//! [`ByteStreamCursor`] is the only thing the scanners use to touch the
//! input. It reads one byte at a time through a `BufReader`, keeps the
//! logical offset in step with every read and seek, and refuses to rewind
//! past the start of the stream.

use crate::error::{Error, Result};
use std::io::{BufReader, ErrorKind, Read, Seek};

/// Buffered single-byte reader over a seekable stream
#[derive(Debug)]
pub struct ByteStreamCursor<R> {
    reader: BufReader<R>,
    offset: u64,
}

impl<R: Read + Seek> ByteStreamCursor<R> {
    /// Wraps a reader positioned at the start of the stream
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            offset: 0,
        }
    }

    /// Offset of the next byte to be read
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next byte, or `None` at end of stream
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Moves the read position by `delta` bytes.
    ///
    /// Negative deltas rewind. Seeking before offset 0 fails with
    /// [`Error::InvalidSeek`] and leaves the cursor untouched. Seeking
    /// forward past the end is allowed; the next read reports end of stream.
    pub fn seek_relative(&mut self, delta: i64) -> Result<()> {
        let target = self
            .offset
            .checked_add_signed(delta)
            .ok_or(Error::InvalidSeek {
                offset: self.offset,
                delta,
            })?;
        self.reader.seek_relative(delta)?;
        self.offset = target;
        Ok(())
    }

    /// Moves the read position to an absolute offset
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        let delta = offset as i64 - self.offset as i64;
        self.seek_relative(delta)
    }

    /// Reads up to `n` bytes.
    ///
    /// The returned buffer is shorter than `n` only when the stream ended
    /// first; it is never padded.
    pub fn read_up_to(&mut self, n: u64) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(n.min(1 << 20) as usize);
        let read = (&mut self.reader).take(n).read_to_end(&mut buf)?;
        self.offset += read as u64;
        Ok(buf)
    }

    /// Consumes the cursor, returning the underlying reader
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}
