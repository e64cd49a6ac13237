//! # fwcut-core
//!
//! A library for carving embedded firmware images out of Windows driver
//! binaries.
//!
//! Vendor drivers for CX and EZ-USB based capture devices ship the device
//! firmware inside the `.sys` file. This crate finds those images with a
//! single forward pass over the file and hands each one to an output sink.
//!
//! ## Architecture
//!
//! - [`cursor`]: sequential byte reader with offset tracking
//! - [`scanner`]: signature and padding-run scanners
//! - [`region`]: carve regions and output naming
//! - [`sink`]: where carved regions go (files, `dd` commands, memory)
//! - [`firmware`]: checks on carved CX images and their download layout
//! - [`error`]: error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use fwcut_core::{scan_file, FileSink, SignatureScanner, CX_PREFIX};
//!
//! let mut sink = FileSink::new(".", CX_PREFIX);
//! let report = scan_file("p2usbwdm.sys", &SignatureScanner::new(), &mut sink)?;
//!
//! for path in sink.written() {
//!     println!("dump to {}", path.display());
//! }
//! println!("{} skipped", report.skipped.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod cursor;
pub mod error;
pub mod firmware;
pub mod region;
pub mod scanner;
pub mod sink;

// Re-export primary types for convenience
pub use cursor::ByteStreamCursor;
pub use error::{Error, Result};
pub use firmware::CxFirmware;
pub use region::{CarvedRegion, Extraction, ExtractionRegion, CX_PREFIX, EZ_PREFIX};
pub use scanner::{
    scan_file, PaddingConfig, PaddingScanner, ScanReport, ScanStrategy, SignatureConfig,
    SignatureScanner,
};
pub use sink::{CommandSink, ExtractionSink, FileSink, RegionCollector};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
