//! Output sinks for carved regions.
//!
//! Scanners hand every carved region to an [`ExtractionSink`]. The sink
//! decides what "extracting" means: writing an image file, printing a `dd`
//! command line, or keeping the bytes in memory.

use crate::error::{Error, Result};
use crate::region::{Extraction, ExtractionRegion};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Receives carved regions from a scanner.
///
/// # Example
///
/// ```
/// use fwcut_core::{Extraction, ExtractionSink, Result};
///
/// struct CountingSink(usize);
///
/// impl ExtractionSink for CountingSink {
///     fn emit(&mut self, _extraction: &Extraction<'_>) -> Result<()> {
///         self.0 += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait ExtractionSink {
    /// Handle one carved region
    fn emit(&mut self, extraction: &Extraction<'_>) -> Result<()>;
}

impl<S: ExtractionSink + ?Sized> ExtractionSink for &mut S {
    fn emit(&mut self, extraction: &Extraction<'_>) -> Result<()> {
        (**self).emit(extraction)
    }
}

/// Writes each region to `<dir>/<prefix><hex start>.bin`
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    prefix: String,
    written: Vec<PathBuf>,
}

impl FileSink {
    /// Creates a sink writing into `dir` with the given file-name prefix
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            written: Vec::new(),
        }
    }

    /// Paths written so far, in emission order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write_image(path: &Path, data: &[u8]) -> Result<()> {
        let file = fs::File::create(path).map_err(|e| Error::file_write(path, e))?;
        finish_image(path, file, data)
    }
}

/// Writes `data` through `out`, which was opened for `path`.
///
/// On failure `path` is removed so no half-written image is left behind.
fn finish_image<W: Write>(path: &Path, mut out: W, data: &[u8]) -> Result<()> {
    let result = out.write_all(data).and_then(|()| out.flush());
    drop(out);
    if let Err(e) = result {
        let _ = fs::remove_file(path);
        return Err(Error::file_write(path, e));
    }
    Ok(())
}

impl ExtractionSink for FileSink {
    fn emit(&mut self, extraction: &Extraction<'_>) -> Result<()> {
        if !self.dir.as_os_str().is_empty() && !self.dir.is_dir() {
            fs::create_dir_all(&self.dir)
                .map_err(|e| Error::directory_create(&self.dir, e))?;
        }

        let path = self.dir.join(extraction.region.file_name(&self.prefix));
        Self::write_image(&path, extraction.data)?;

        info!(
            "Wrote {} ({} bytes)",
            path.display(),
            extraction.data.len()
        );
        self.written.push(path);
        Ok(())
    }
}

/// Prints a `dd` command line per region instead of writing images
#[derive(Debug)]
pub struct CommandSink<W> {
    out: W,
    input: String,
    prefix: String,
}

impl<W: Write> CommandSink<W> {
    /// Creates a sink that references `input` in the emitted commands
    pub fn new(out: W, input: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            out,
            input: input.into(),
            prefix: prefix.into(),
        }
    }

    /// Consumes the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ExtractionSink for CommandSink<W> {
    fn emit(&mut self, extraction: &Extraction<'_>) -> Result<()> {
        let command = extraction.region.dd_command(&self.input, &self.prefix);
        debug!("Emitting: {}", command);
        writeln!(self.out, "{}", command)?;
        Ok(())
    }
}

/// Keeps every carved region and its bytes in memory
#[derive(Debug, Default)]
pub struct RegionCollector {
    /// Collected regions with their carved bytes
    pub regions: Vec<(ExtractionRegion, Vec<u8>)>,
}

impl RegionCollector {
    /// Creates an empty collector
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExtractionSink for RegionCollector {
    fn emit(&mut self, extraction: &Extraction<'_>) -> Result<()> {
        self.regions
            .push((extraction.region, extraction.data.to_vec()));
        Ok(())
    }
}
