//! Padding-run scanning (EZ-USB firmware).
//!
//! EZ-USB images sit in a fixed-size slot filled out with `0xAA`. When a
//! long enough run of padding ends, the slot is assumed to have started
//! exactly one window (`0x10000` bytes) before the byte that ended the
//! run, whatever the measured run length was. The first `0x2000` bytes of
//! that slot are carved.
//!
//! A run still open at end of stream is never flushed.

use super::{carve, ScanReport, ScanStrategy, SkipReason};
use crate::cursor::ByteStreamCursor;
use crate::error::{Error, Result};
use crate::region::ExtractionRegion;
use crate::sink::ExtractionSink;
use std::io::{Read, Seek};
use tracing::{debug, trace, warn};

/// Fill byte after EZ-USB images
pub const PADDING_BYTE: u8 = 0xAA;

/// A run must be strictly longer than this to count
pub const PADDING_THRESHOLD: u64 = 16;

/// Distance from the carve start to the byte that ends the run
pub const PADDING_WINDOW: u64 = 0x10000;

/// Size of a carved EZ-USB image
pub const EZ_REGION_LEN: u64 = 0x2000;

/// Length of the current run of padding bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaddingRun {
    /// Consecutive padding bytes seen
    pub len: u64,
    /// Offset of the byte that ended the run
    pub end: u64,
}

impl PaddingRun {
    /// Creates an empty run
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the byte at `offset`. Returns the finished run when a
    /// non-padding byte ends one, and starts over.
    pub fn observe(&mut self, byte: u8, padding: u8, offset: u64) -> Option<PaddingRun> {
        if byte == padding {
            self.len += 1;
            return None;
        }

        let finished = PaddingRun {
            len: self.len,
            end: offset,
        };
        *self = PaddingRun::new();
        (finished.len > 0).then_some(finished)
    }
}

/// Configuration for the padding scanner
#[derive(Debug, Clone)]
pub struct PaddingConfig {
    /// Byte value that forms the padding
    pub padding_byte: u8,
    /// Runs must be longer than this
    pub threshold: u64,
    /// Distance from the carve start to the byte that ends the run
    pub window: u64,
    /// Size of each carved region
    pub region_len: u64,
    /// Maximum number of regions to carve (0 = unlimited)
    pub max_results: usize,
}

impl Default for PaddingConfig {
    fn default() -> Self {
        Self {
            padding_byte: PADDING_BYTE,
            threshold: PADDING_THRESHOLD,
            window: PADDING_WINDOW,
            region_len: EZ_REGION_LEN,
            max_results: 0,
        }
    }
}

impl PaddingConfig {
    /// Creates a new config for EZ-USB firmware
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the padding byte
    pub fn padding_byte(mut self, byte: u8) -> Self {
        self.padding_byte = byte;
        self
    }

    /// Sets the minimum run length (exclusive)
    pub fn threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the look-back window
    pub fn window(mut self, window: u64) -> Self {
        self.window = window;
        self
    }

    /// Sets the carved region size
    pub fn region_len(mut self, len: u64) -> Self {
        self.region_len = len;
        self
    }

    /// Sets the maximum number of results to return
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Checks the config for values the scanner cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.region_len == 0 {
            return Err(Error::invalid_config("region length must be non-zero"));
        }
        if self.region_len > self.window {
            return Err(Error::invalid_config(format!(
                "region length {:#x} exceeds window {:#x}",
                self.region_len, self.window
            )));
        }
        Ok(())
    }
}

/// Scanner that carves a region a fixed window before each padding run end
#[derive(Debug, Clone, Default)]
pub struct PaddingScanner {
    config: PaddingConfig,
}

impl PaddingScanner {
    /// Creates a scanner for EZ-USB padding
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scanner with custom configuration
    pub fn with_config(config: PaddingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the active configuration
    pub fn config(&self) -> &PaddingConfig {
        &self.config
    }
}

impl ScanStrategy for PaddingScanner {
    fn scan<R, S>(&self, cursor: &mut ByteStreamCursor<R>, sink: &mut S) -> Result<ScanReport>
    where
        R: Read + Seek,
        S: ExtractionSink + ?Sized,
    {
        let config = &self.config;
        let mut report = ScanReport::default();
        let mut run = PaddingRun::new();
        let mut last_end = 0u64;

        debug!(
            "Starting padding scan for runs of {:#04x} longer than {}",
            config.padding_byte, config.threshold
        );

        while let Some(byte) = cursor.read_byte()? {
            let offset = cursor.offset() - 1;
            report.bytes_examined += 1;

            let Some(finished) = run.observe(byte, config.padding_byte, offset) else {
                continue;
            };
            if finished.len <= config.threshold {
                continue;
            }

            let start = offset as i64 - config.window as i64;
            trace!(
                "Padding run of {} bytes ended at {:#x}",
                finished.len,
                finished.end
            );

            match ExtractionRegion::from_signed(offset, start, config.region_len) {
                Ok(region) if last_end <= region.start => {
                    carve(cursor, region, sink, &mut report)?;
                    cursor.seek_to(offset + 1)?;
                }
                Ok(_) => {
                    debug!(
                        "Region at {:#x} overlaps previous detection ending at {:#x}",
                        start, last_end
                    );
                    report.skip(offset, start, SkipReason::Overlap { last_end });
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping region: {}", e);
                    report.skip(offset, start, SkipReason::InvalidOffset);
                }
                Err(e) => return Err(e),
            }
            last_end = offset;

            if config.max_results > 0 && report.extracted.len() >= config.max_results {
                break;
            }
        }

        if run.len > config.threshold {
            debug!("Dropping unterminated padding run of {} bytes", run.len);
        }

        debug!(
            "Padding scan complete: {} carved, {} skipped",
            report.extracted.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::SkippedRegion;
    use crate::sink::RegionCollector;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn scan(scanner: &PaddingScanner, data: &[u8]) -> (ScanReport, RegionCollector) {
        let mut cursor = ByteStreamCursor::new(Cursor::new(data.to_vec()));
        let mut sink = RegionCollector::new();
        let report = scanner.scan(&mut cursor, &mut sink).unwrap();
        (report, sink)
    }

    /// Small window so tests stay readable
    fn small() -> PaddingScanner {
        PaddingScanner::with_config(PaddingConfig::new().window(0x40).region_len(0x10)).unwrap()
    }

    /// Counting bytes (never 0xAA) followed by a padding run and a terminator
    fn slot(body: usize, pad: usize) -> Vec<u8> {
        let mut data: Vec<u8> = (0..body).map(|i| (i % 0x80) as u8).collect();
        data.extend(std::iter::repeat(PADDING_BYTE).take(pad));
        data.push(0x00);
        data
    }

    #[test]
    fn test_padding_run_observe() {
        let mut run = PaddingRun::new();
        assert_eq!(run.observe(0x01, 0xAA, 0), None);
        assert_eq!(run.observe(0xAA, 0xAA, 1), None);
        assert_eq!(run.observe(0xAA, 0xAA, 2), None);
        assert_eq!(run.len, 2);
        assert_eq!(
            run.observe(0x00, 0xAA, 3),
            Some(PaddingRun { len: 2, end: 3 })
        );
        assert_eq!(run, PaddingRun::new());
    }

    #[test]
    fn test_short_stream_reports_negative_start() {
        // 17 padding bytes then a terminator at offset 17
        let data = slot(0, 17);
        let (report, sink) = scan(&PaddingScanner::new(), &data);

        assert!(sink.regions.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].match_offset, 17);
        assert_eq!(report.skipped[0].start, 17 - 0x10000);
        assert_eq!(report.skipped[0].reason, SkipReason::InvalidOffset);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut data = slot(0x80, 16);
        data.extend(vec![0x01; 0x10]);
        let (report, _) = scan(&small(), &data);
        assert!(report.extracted.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_region_before_run_end() {
        let data = slot(0x60, 0x20);
        let (report, sink) = scan(&small(), &data);

        // Terminator at 0x80, region starts one window earlier
        assert_eq!(report.regions(), vec![ExtractionRegion::new(0x40, 0x10)]);
        assert_eq!(sink.regions[0].1, data[0x40..0x50].to_vec());
        // Every byte examined exactly once
        assert_eq!(report.bytes_examined, data.len() as u64);
    }

    #[test]
    fn test_default_geometry() {
        let data = slot(0x10000, 0x100);
        let (report, sink) = scan(&PaddingScanner::new(), &data);

        let end = 0x10000 + 0x100;
        assert_eq!(
            report.regions(),
            vec![ExtractionRegion::new(end - 0x10000, EZ_REGION_LEN)]
        );
        assert_eq!(sink.regions[0].1.len() as u64, EZ_REGION_LEN);
        assert_eq!(report.truncated_count(), 0);
        assert_eq!(report.bytes_examined, data.len() as u64);
    }

    #[test]
    fn test_overlapping_detection_is_skipped() {
        let mut data = slot(0x60, 0x20);
        // Second run ends 0x20 bytes later, so its start precedes the first end
        data.extend(slot(0x0e, 0x11));
        let (report, sink) = scan(&small(), &data);

        assert_eq!(report.extracted.len(), 1);
        assert_eq!(sink.regions.len(), 1);
        assert_eq!(
            report.skipped,
            vec![SkippedRegion {
                match_offset: 0xa0,
                start: 0x60,
                reason: SkipReason::Overlap { last_end: 0x80 },
            }]
        );
    }

    #[test]
    fn test_detections_after_gap_are_carved() {
        let mut data = slot(0x60, 0x20);
        data.extend(slot(0x30, 0x20));
        let (report, _) = scan(&small(), &data);

        // Second terminator at 0x81 + 0x50 = 0xd1, start 0x91 >= 0x80
        assert_eq!(
            report.regions(),
            vec![
                ExtractionRegion::new(0x40, 0x10),
                ExtractionRegion::new(0x91, 0x10),
            ]
        );
        assert_eq!(report.bytes_examined, data.len() as u64);
    }

    #[test]
    fn test_skipped_detection_still_moves_last_end() {
        let mut data = slot(0x60, 0x20);
        // Overlapping detection at 0xa0 moves last_end there
        data.extend(slot(0x0e, 0x11));
        // Next terminator at 0xd1, start 0x91 < 0xa0 so it is skipped too
        data.extend(slot(0x10, 0x20));
        let (report, _) = scan(&small(), &data);

        assert_eq!(report.extracted.len(), 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(
            report.skipped[1].reason,
            SkipReason::Overlap { last_end: 0xa0 }
        );
    }

    #[test]
    fn test_trailing_run_is_dropped() {
        let mut data: Vec<u8> = (0..0x60).map(|i| i as u8).collect();
        data.extend(vec![PADDING_BYTE; 0x40]);
        let (report, sink) = scan(&small(), &data);

        assert!(report.extracted.is_empty());
        assert!(report.skipped.is_empty());
        assert!(sink.regions.is_empty());
    }

    #[test]
    fn test_max_results() {
        let mut data = slot(0x60, 0x20);
        data.extend(slot(0x30, 0x20));
        let scanner = PaddingScanner::with_config(
            PaddingConfig::new().window(0x40).region_len(0x10).max_results(1),
        )
        .unwrap();

        let (report, _) = scan(&scanner, &data);
        assert_eq!(report.extracted.len(), 1);
    }

    #[test]
    fn test_scan_is_repeatable() {
        let mut data = slot(0x60, 0x20);
        data.extend(slot(0x30, 0x20));
        let (first, first_sink) = scan(&small(), &data);
        let (second, second_sink) = scan(&small(), &data);
        assert_eq!(first, second);
        assert_eq!(first_sink.regions, second_sink.regions);
    }

    #[test]
    fn test_config_validation() {
        assert!(PaddingScanner::with_config(PaddingConfig::new().region_len(0)).is_err());
        assert!(
            PaddingScanner::with_config(PaddingConfig::new().window(0x10).region_len(0x20))
                .is_err()
        );
    }
}
