//! Carve regions and their output naming.

use crate::error::{Error, Result};
use std::ops::Range;

/// Output file-name prefix for CX firmware images
pub const CX_PREFIX: &str = "cx";

/// Output file-name prefix for EZ-USB firmware images
pub const EZ_PREFIX: &str = "ez";

/// A contiguous byte range selected for export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtractionRegion {
    /// Absolute offset of the first byte
    pub start: u64,
    /// Requested number of bytes
    pub length: u64,
}

impl ExtractionRegion {
    /// Creates a region from an already validated start
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// Creates a region from a signed start computed relative to a match.
    ///
    /// Fails with [`Error::InvalidOffset`] when `start` is negative.
    pub fn from_signed(match_offset: u64, start: i64, length: u64) -> Result<Self> {
        u64::try_from(start)
            .map(|start| Self::new(start, length))
            .map_err(|_| Error::InvalidOffset {
                match_offset,
                start,
            })
    }

    /// Offset one past the last requested byte
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    /// Requested byte range
    pub fn range(&self) -> Range<u64> {
        self.start..self.end()
    }

    /// Output file name: `<prefix><lowercase hex start>.bin`
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{}{:x}.bin", prefix, self.start)
    }

    /// Shell command that performs the same carve with `dd`
    pub fn dd_command(&self, input: &str, prefix: &str) -> String {
        format!(
            "dd if={} of={} skip=0x{:x} bs=1 count=0x{:x}",
            input,
            self.file_name(prefix),
            self.start,
            self.length
        )
    }
}

/// A carved region and how many of its bytes were available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarvedRegion {
    /// The requested region
    pub region: ExtractionRegion,
    /// Bytes actually carved
    pub carved: u64,
}

impl CarvedRegion {
    /// True when the stream ended before the full region could be read
    pub fn is_truncated(&self) -> bool {
        self.carved < self.region.length
    }
}

/// A carved region together with the bytes read for it
#[derive(Debug, Clone, Copy)]
pub struct Extraction<'a> {
    /// The region that was requested
    pub region: ExtractionRegion,
    /// Bytes actually available; shorter than `region.length` when truncated
    pub data: &'a [u8],
}

impl<'a> Extraction<'a> {
    /// Pairs a region with its carved bytes
    pub fn new(region: ExtractionRegion, data: &'a [u8]) -> Self {
        Self { region, data }
    }

    /// Region and carved length, without the bytes
    pub fn carved(&self) -> CarvedRegion {
        CarvedRegion {
            region: self.region,
            carved: self.data.len() as u64,
        }
    }

    /// True when the stream ended before the full region could be read
    pub fn is_truncated(&self) -> bool {
        self.carved().is_truncated()
    }
}
