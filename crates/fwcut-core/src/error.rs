//! Error types for the fwcut-core library.
//!
//! All failure modes of a scan pass are collected in a single [`Error`]
//! enum built with `thiserror`. Most variants abort the scan; the ones
//! reported by [`Error::is_recoverable`] are logged and skipped instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fwcut operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all fwcut operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input path does not resolve to a regular file
    #[error("file not found: '{path}'")]
    FileNotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// Failed to open or inspect the input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an extracted image
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Read or seek failure on the input stream during a scan
    #[error("I/O error while scanning: {0}")]
    Io(#[from] std::io::Error),

    /// Relative seek would move before the start of the stream
    #[error("invalid seek by {delta} bytes from offset {offset}: position would precede start of stream")]
    InvalidSeek {
        /// Cursor offset at the time of the seek
        offset: u64,
        /// Requested relative movement
        delta: i64,
    },

    /// A match implies a carve region starting before the stream
    #[error("match at offset {match_offset:#x} implies region start {start} before start of stream")]
    InvalidOffset {
        /// Offset of the byte that completed the detection
        match_offset: u64,
        /// Computed (negative) region start
        start: i64,
    },

    /// A firmware image does not have the expected size
    #[error("invalid firmware image: expected {expected:#x} bytes, found {actual:#x}")]
    InvalidFirmware {
        /// Required image size
        expected: u64,
        /// Size of the image that was given
        actual: u64,
    },

    /// Signature pattern could not be parsed or is unusable
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// Scanner configuration is inconsistent
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Creates a new file-not-found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new invalid pattern error
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    /// Creates a new invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Returns true if the scan can skip this error and keep going
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidOffset { .. })
    }
}
