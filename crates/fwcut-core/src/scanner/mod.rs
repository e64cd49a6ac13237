//! Byte-stream scanners that locate embedded firmware images.
//!
//! Two single-pass algorithms share the [`ByteStreamCursor`]:
//!
//! - [`SignatureScanner`]: finds a fixed byte signature and carves a
//!   fixed-size region just before it (CX firmware).
//! - [`PaddingScanner`]: finds long runs of a padding byte and carves a
//!   fixed-size region a fixed distance before the end of each run
//!   (EZ-USB firmware).
//!
//! Both hand their carves to an [`ExtractionSink`], so the same scan can
//! write image files or print `dd` commands.
//!
//! ## Extensibility
//!
//! The [`ScanStrategy`] trait allows custom scanning algorithms:
//!
//! ```no_run
//! use fwcut_core::scanner::{ScanReport, ScanStrategy};
//! use fwcut_core::{ByteStreamCursor, ExtractionSink, Result};
//! use std::io::{Read, Seek};
//!
//! struct NothingScanner;
//!
//! impl ScanStrategy for NothingScanner {
//!     fn scan<R, S>(&self, cursor: &mut ByteStreamCursor<R>, sink: &mut S) -> Result<ScanReport>
//!     where
//!         R: Read + Seek,
//!         S: ExtractionSink + ?Sized,
//!     {
//!         Ok(ScanReport::default())
//!     }
//! }
//! ```

mod padding;
mod signature;

use crate::cursor::ByteStreamCursor;
use crate::error::{Error, Result};
use crate::region::{CarvedRegion, Extraction, ExtractionRegion};
use crate::sink::ExtractionSink;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, warn};

pub use padding::{
    PaddingConfig, PaddingRun, PaddingScanner, EZ_REGION_LEN, PADDING_BYTE, PADDING_THRESHOLD,
    PADDING_WINDOW,
};
pub use signature::{
    parse_pattern, MatchState, SignatureConfig, SignatureScanner, CX_PATTERN, CX_REGION_LEN,
};

/// Why a detection did not produce a carve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The computed start lies before the start of the stream
    InvalidOffset,
    /// The computed start lies before the end of the previous detection
    Overlap {
        /// End offset of the previous detection
        last_end: u64,
    },
}

/// A detection that was reported but not carved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedRegion {
    /// Offset of the byte that completed the detection
    pub match_offset: u64,
    /// Computed region start
    pub start: i64,
    /// Reason for skipping
    pub reason: SkipReason,
}

/// Outcome of one scan pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Regions handed to the sink, in stream order
    pub extracted: Vec<CarvedRegion>,
    /// Detections that were skipped
    pub skipped: Vec<SkippedRegion>,
    /// Bytes fed through the detector (carved bytes re-read for output excluded)
    pub bytes_examined: u64,
}

impl ScanReport {
    /// Regions handed to the sink
    pub fn regions(&self) -> Vec<ExtractionRegion> {
        self.extracted.iter().map(|c| c.region).collect()
    }

    /// Number of truncated carves
    pub fn truncated_count(&self) -> usize {
        self.extracted.iter().filter(|c| c.is_truncated()).count()
    }

    fn skip(&mut self, match_offset: u64, start: i64, reason: SkipReason) {
        self.skipped.push(SkippedRegion {
            match_offset,
            start,
            reason,
        });
    }
}

/// Trait for scanning algorithms over a [`ByteStreamCursor`]
pub trait ScanStrategy {
    /// Scan the stream from the cursor's position to the end, emitting
    /// every carve to `sink`
    fn scan<R, S>(&self, cursor: &mut ByteStreamCursor<R>, sink: &mut S) -> Result<ScanReport>
    where
        R: Read + Seek,
        S: ExtractionSink + ?Sized;
}

/// Reads `region` from the cursor and hands it to the sink.
///
/// Leaves the cursor at the end of the carved bytes.
fn carve<R, S>(
    cursor: &mut ByteStreamCursor<R>,
    region: ExtractionRegion,
    sink: &mut S,
    report: &mut ScanReport,
) -> Result<()>
where
    R: Read + Seek,
    S: ExtractionSink + ?Sized,
{
    cursor.seek_to(region.start)?;
    let data = cursor.read_up_to(region.length)?;
    let extraction = Extraction::new(region, &data);

    if extraction.is_truncated() {
        warn!(
            "Region at {:#x} truncated: {} of {} bytes available",
            region.start,
            data.len(),
            region.length
        );
    }
    debug!(
        "Carved {:#x}..{:#x} ({} bytes)",
        region.start,
        region.start + data.len() as u64,
        data.len()
    );

    sink.emit(&extraction)?;
    report.extracted.push(extraction.carved());
    Ok(())
}

/// Scan a file with the given strategy
///
/// Fails with [`Error::FileNotFound`] unless `path` is a regular file.
pub fn scan_file<T, S>(path: impl AsRef<Path>, strategy: &T, sink: &mut S) -> Result<ScanReport>
where
    T: ScanStrategy,
    S: ExtractionSink + ?Sized,
{
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::file_not_found(path));
    }

    let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
    let mut cursor = ByteStreamCursor::new(file);
    debug!("Scanning {}", path.display());
    strategy.scan(&mut cursor, sink)
}
