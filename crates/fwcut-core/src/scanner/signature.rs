//! Fixed-signature scanning (CX firmware).
//!
//! CX images carry an 8-byte header `a7 0d 00 00 66 bb 55 aa`. The scanner
//! looks for the last six bytes and carves from two bytes before them, so
//! the region starts `pattern.len() + 1` bytes before the final matched byte.

use super::{carve, ScanReport, ScanStrategy, SkipReason};
use crate::cursor::ByteStreamCursor;
use crate::error::{Error, Result};
use crate::region::ExtractionRegion;
use crate::sink::ExtractionSink;
use std::io::{Read, Seek};
use tracing::{debug, trace, warn};

/// Signature preceding every CX firmware image
pub const CX_PATTERN: [u8; 6] = [0x00, 0x00, 0x66, 0xBB, 0x55, 0xAA];

/// Size of a carved CX image
pub const CX_REGION_LEN: u64 = 0x40000;

/// Number of consecutive pattern bytes matched so far.
///
/// A mismatching byte resets the count to zero without being retried as
/// the first byte of a new match, so overlapping partial matches such as
/// `00 00 00 66 ..` are missed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchState {
    matched: usize,
}

impl MatchState {
    /// Creates an empty match state
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes matched so far
    pub fn matched(&self) -> usize {
        self.matched
    }

    /// Feeds one byte. Returns true when the pattern completes, after
    /// which the state is reset.
    pub fn advance(&mut self, byte: u8, pattern: &[u8]) -> bool {
        if pattern.get(self.matched) == Some(&byte) {
            self.matched += 1;
        } else {
            self.matched = 0;
        }

        if self.matched == pattern.len() {
            self.matched = 0;
            return true;
        }
        false
    }

    /// Clears any partial match
    pub fn reset(&mut self) {
        self.matched = 0;
    }
}

/// Configuration for the signature scanner
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// Byte sequence to search for
    pub pattern: Vec<u8>,
    /// Distance from the carve start to the final matched byte
    pub lead: u64,
    /// Size of each carved region
    pub region_len: u64,
    /// Maximum number of regions to carve (0 = unlimited)
    pub max_results: usize,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            pattern: CX_PATTERN.to_vec(),
            lead: CX_PATTERN.len() as u64 + 1,
            region_len: CX_REGION_LEN,
            max_results: 0,
        }
    }
}

impl SignatureConfig {
    /// Creates a new config for CX firmware
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signature; the lead follows the new pattern length
    pub fn pattern(mut self, pattern: impl Into<Vec<u8>>) -> Self {
        self.pattern = pattern.into();
        self.lead = self.pattern.len() as u64 + 1;
        self
    }

    /// Sets the distance from the carve start to the final matched byte
    pub fn lead(mut self, lead: u64) -> Self {
        self.lead = lead;
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
        if self.pattern.is_empty() {
            return Err(Error::invalid_pattern("pattern is empty"));
        }
        if self.region_len == 0 {
            return Err(Error::invalid_config("region length must be non-zero"));
        }
        Ok(())
    }
}

/// Parses a hex signature such as `000066bb55aa` or `00 00 66 BB 55 AA`.
///
/// Spaces, commas, colons and dashes between bytes are ignored.
pub fn parse_pattern(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | ',' | ':' | '-'))
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits.as_str());

    if digits.is_empty() {
        return Err(Error::invalid_pattern("pattern is empty"));
    }
    if digits.len() % 2 != 0 {
        return Err(Error::invalid_pattern(format!(
            "'{}' has an odd number of hex digits",
            text
        )));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| Error::invalid_pattern(format!("'{}' is not valid hex", text)))
        })
        .collect()
}

/// Scanner that carves a fixed-size region before every signature match
#[derive(Debug, Clone, Default)]
pub struct SignatureScanner {
    config: SignatureConfig,
}

impl SignatureScanner {
    /// Creates a scanner for the CX signature
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scanner with custom configuration
    pub fn with_config(config: SignatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the active configuration
    pub fn config(&self) -> &SignatureConfig {
        &self.config
    }
}

impl ScanStrategy for SignatureScanner {
    fn scan<R, S>(&self, cursor: &mut ByteStreamCursor<R>, sink: &mut S) -> Result<ScanReport>
    where
        R: Read + Seek,
        S: ExtractionSink + ?Sized,
    {
        let pattern = self.config.pattern.as_slice();
        let mut report = ScanReport::default();
        let mut state = MatchState::new();

        debug!("Starting signature scan for {:02x?}", pattern);

        while let Some(byte) = cursor.read_byte()? {
            let offset = cursor.offset() - 1;
            report.bytes_examined += 1;

            if !state.advance(byte, pattern) {
                continue;
            }

            let start = offset as i64 - self.config.lead as i64;
            trace!("Signature completed at {:#x}", offset);

            let region =
                match ExtractionRegion::from_signed(offset, start, self.config.region_len) {
                    Ok(region) => region,
                    Err(e) if e.is_recoverable() => {
                        warn!("Skipping region: {}", e);
                        report.skip(offset, start, SkipReason::InvalidOffset);
                        continue;
                    }
                    Err(e) => return Err(e),
                };

            carve(cursor, region, sink, &mut report)?;
            state.reset();

            // Resume after the carved image; never before the match itself
            cursor.seek_to(region.end().max(offset + 1))?;

            if self.config.max_results > 0 && report.extracted.len() >= self.config.max_results {
                break;
            }
        }

        debug!(
            "Signature scan complete: {} carved, {} skipped",
            report.extracted.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{CommandSink, RegionCollector};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn scan(scanner: &SignatureScanner, data: &[u8]) -> (ScanReport, RegionCollector) {
        let mut cursor = ByteStreamCursor::new(Cursor::new(data.to_vec()));
        let mut sink = RegionCollector::new();
        let report = scanner.scan(&mut cursor, &mut sink).unwrap();
        (report, sink)
    }

    /// `prefix` filler bytes, the pattern, then `suffix` filler bytes
    fn image(prefix: usize, suffix: usize) -> Vec<u8> {
        let mut data = vec![0x11; prefix];
        data.extend_from_slice(&CX_PATTERN);
        data.extend(std::iter::repeat(0x22).take(suffix));
        data
    }

    #[test]
    fn test_match_state_completes_and_resets() {
        let mut state = MatchState::new();
        for &b in &CX_PATTERN[..5] {
            assert!(!state.advance(b, &CX_PATTERN));
        }
        assert_eq!(state.matched(), 5);
        assert!(state.advance(0xAA, &CX_PATTERN));
        assert_eq!(state.matched(), 0);
    }

    #[test]
    fn test_match_state_does_not_retry_mismatched_byte() {
        let mut state = MatchState::new();
        let data = [0x00, 0x00, 0x00, 0x66, 0xBB, 0x55, 0xAA];
        let hits = data
            .iter()
            .filter(|&&b| state.advance(b, &CX_PATTERN))
            .count();
        assert_eq!(hits, 0);
    }

    #[test]
    fn test_single_match_region() {
        let data = image(0x100, 0x10);
        let (report, sink) = scan(&SignatureScanner::new(), &data);

        // Final pattern byte at 0x105
        let region = ExtractionRegion::new(0x105 - 7, CX_REGION_LEN);
        assert_eq!(report.regions(), vec![region]);
        assert_eq!(sink.regions[0].1, data[0xfe..].to_vec());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_five_byte_prefix_does_not_match() {
        let data = [0x00, 0x00, 0x66, 0xBB, 0x55, 0x00, 0x11, 0x11];
        let (report, sink) = scan(&SignatureScanner::new(), &data);
        assert!(report.extracted.is_empty());
        assert!(sink.regions.is_empty());
        assert_eq!(report.bytes_examined, data.len() as u64);
    }

    #[test]
    fn test_match_at_stream_start_is_reported() {
        let data = image(0, 4);
        let (report, sink) = scan(&SignatureScanner::new(), &data);

        assert!(sink.regions.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].match_offset, 5);
        assert_eq!(report.skipped[0].start, -2);
        assert_eq!(report.skipped[0].reason, SkipReason::InvalidOffset);
        // Scan continued to the end
        assert_eq!(report.bytes_examined, data.len() as u64);
    }

    #[test]
    fn test_match_inside_carved_region_is_skipped() {
        let config = SignatureConfig::new().region_len(0x40);
        let scanner = SignatureScanner::with_config(config).unwrap();

        let mut data = image(0x10, 0x10);
        // Second signature falls within the first carve
        data.extend_from_slice(&CX_PATTERN);
        // Third one lies beyond it
        data.extend(std::iter::repeat(0x33).take(0x40));
        data.extend_from_slice(&CX_PATTERN);
        data.extend(std::iter::repeat(0x44).take(0x08));

        let (report, _) = scan(&scanner, &data);
        let third_end = 0x10 + 6 + 0x10 + 6 + 0x40 + 5;
        assert_eq!(
            report.regions(),
            vec![
                ExtractionRegion::new(0x15 - 7, 0x40),
                ExtractionRegion::new(third_end - 7, 0x40),
            ]
        );
        assert_eq!(report.truncated_count(), 1);
    }

    #[test]
    fn test_short_region_does_not_rematch() {
        let config = SignatureConfig::new().region_len(2);
        let scanner = SignatureScanner::with_config(config).unwrap();
        let data = image(0x10, 0x10);

        let (report, sink) = scan(&scanner, &data);
        assert_eq!(report.regions(), vec![ExtractionRegion::new(0x0e, 2)]);
        assert_eq!(sink.regions[0].1, vec![0x11, 0x11]);
    }

    #[test]
    fn test_max_results() {
        let config = SignatureConfig::new().region_len(8).max_results(1);
        let scanner = SignatureScanner::with_config(config).unwrap();
        let mut data = image(0x10, 0x10);
        data.extend(image(0x10, 0x10));

        let (report, _) = scan(&scanner, &data);
        assert_eq!(report.extracted.len(), 1);
    }

    #[test]
    fn test_custom_pattern() {
        let config = SignatureConfig::new()
            .pattern(parse_pattern("de ad be ef").unwrap())
            .region_len(4);
        assert_eq!(config.lead, 5);
        let scanner = SignatureScanner::with_config(config).unwrap();

        let data = [0, 1, 2, 3, 4, 0xDE, 0xAD, 0xBE, 0xEF, 9];
        let (report, sink) = scan(&scanner, &data);
        assert_eq!(report.regions(), vec![ExtractionRegion::new(3, 4)]);
        assert_eq!(sink.regions[0].1, vec![3, 4, 0xDE, 0xAD]);
    }

    #[test]
    fn test_scan_is_repeatable() {
        let mut data = image(0x20, 0x30);
        data.extend(image(0x40, 0x10));
        let scanner =
            SignatureScanner::with_config(SignatureConfig::new().region_len(0x10)).unwrap();

        let (first, first_sink) = scan(&scanner, &data);
        let (second, second_sink) = scan(&scanner, &data);
        assert_eq!(first, second);
        assert_eq!(first_sink.regions, second_sink.regions);
    }

    #[test]
    fn test_command_sink_sees_same_regions() {
        let data = image(0x30, 0x10);
        let mut cursor = ByteStreamCursor::new(Cursor::new(data));
        let mut sink = CommandSink::new(Vec::new(), "drv.sys", "cx");

        SignatureScanner::new().scan(&mut cursor, &mut sink).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            out,
            "dd if=drv.sys of=cx2e.bin skip=0x2e bs=1 count=0x40000\n"
        );
    }

    #[test]
    fn test_parse_pattern() {
        assert_eq!(parse_pattern("000066bb55aa").unwrap(), CX_PATTERN.to_vec());
        assert_eq!(parse_pattern("00:00:66:BB:55:AA").unwrap(), CX_PATTERN.to_vec());
        assert_eq!(parse_pattern("0x0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert!(parse_pattern("").is_err());
        assert!(parse_pattern("abc").is_err());
        assert!(parse_pattern("zz").is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(SignatureScanner::with_config(SignatureConfig::new().pattern(vec![])).is_err());
        assert!(SignatureScanner::with_config(SignatureConfig::new().region_len(0)).is_err());
    }
}
