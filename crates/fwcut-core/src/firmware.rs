//! Carved CX image checks.
//!
//! A CX encoder image is exactly `0x40000` bytes. The capture tool sends it
//! to the device in `0x8000`-byte bulk transfers with every 32-bit word in
//! big-endian order, while the driver stores the words little-endian.
//! [`CxFirmware`] validates a carved image and produces that wire layout.
//! The USB transfer itself is out of scope.

use crate::error::{Error, Result};
use crate::scanner::{CX_PATTERN, CX_REGION_LEN};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Size of one firmware download transfer
pub const CX_DOWNLOAD_CHUNK: usize = 0x8000;

/// Offset of the signature inside a carved image
const SIGNATURE_OFFSET: usize = 2;

/// A validated CX firmware image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CxFirmware {
    data: Vec<u8>,
}

impl CxFirmware {
    /// Validates an image held in memory.
    ///
    /// Fails with [`Error::InvalidFirmware`] unless the image is exactly
    /// [`CX_REGION_LEN`] bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() as u64 != CX_REGION_LEN {
            return Err(Error::InvalidFirmware {
                expected: CX_REGION_LEN,
                actual: data.len() as u64,
            });
        }
        Ok(Self { data })
    }

    /// Reads and validates a carved `cx*.bin` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::file_not_found(path));
        }
        let data = fs::read(path).map_err(|e| Error::file_read(path, e))?;
        debug!("Loaded {} ({} bytes)", path.display(), data.len());
        Self::from_bytes(data)
    }

    /// Raw image bytes as carved
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// True when the image carries the CX signature right after its
    /// two-byte header
    pub fn has_signature(&self) -> bool {
        self.data
            .get(SIGNATURE_OFFSET..SIGNATURE_OFFSET + CX_PATTERN.len())
            .map_or(false, |bytes| bytes == CX_PATTERN)
    }

    /// Number of bulk transfers needed for the download
    pub fn chunk_count(&self) -> usize {
        self.data.len().div_ceil(CX_DOWNLOAD_CHUNK)
    }

    /// Download transfers in order, each word converted to big-endian
    pub fn download_chunks(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.data.chunks(CX_DOWNLOAD_CHUNK).map(to_big_endian_words)
    }

    /// The whole download stream as it goes over the wire
    pub fn download_image(&self) -> Vec<u8> {
        to_big_endian_words(&self.data)
    }
}

/// Reinterprets little-endian 32-bit words as big-endian.
///
/// A trailing partial word is copied unchanged.
pub fn to_big_endian_words(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut words = data.chunks_exact(4);
    for word in &mut words {
        let value = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        out.extend_from_slice(&value.to_be_bytes());
    }
    out.extend_from_slice(words.remainder());
    out
}
