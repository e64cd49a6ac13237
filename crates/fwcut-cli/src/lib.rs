//! Shared driver for the `cxfwcut` and `ezfwcut` tools.
//!
//! Both binaries take a single Windows driver file, run one scanner over
//! it and either write the carved images or print the equivalent `dd`
//! commands.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use fwcut_core::scanner::parse_pattern;
use fwcut_core::{scan_file, CommandSink, FileSink, ScanReport, ScanStrategy};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Exit code for a completed scan
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code for a scan or write failure
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for bad arguments (matches clap)
pub const EXIT_USAGE: u8 = 2;
/// Exit code when the input is not a regular file
pub const EXIT_NOT_FOUND: u8 = 3;

/// Arguments shared by both tools
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Windows driver file to scan
    #[arg(value_name = "SYS_FILE")]
    pub file: PathBuf,

    /// Output directory for extracted images
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "file")]
    pub format: OutputFormat,

    /// Maximum number of regions to extract (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub max_regions: usize,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// What to do with each carved region
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Write each image to <prefix><offset>.bin
    File,
    /// Print a dd command per image instead of writing it
    Dd,
}

/// Hex signature given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexPattern(pub Vec<u8>);

impl FromStr for HexPattern {
    type Err = fwcut_core::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_pattern(s).map(Self)
    }
}

/// Installs the stderr log subscriber for the given `-v` count
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs `strategy` over the input file and returns the process exit code
pub fn run<T: ScanStrategy>(args: &CommonArgs, prefix: &str, strategy: &T) -> u8 {
    let stdout = std::io::stdout();
    run_with_output(args, prefix, strategy, &mut stdout.lock())
}

/// Like [`run`], writing `dump to` lines and `dd` commands to `out`
pub fn run_with_output<T, W>(args: &CommonArgs, prefix: &str, strategy: &T, out: &mut W) -> u8
where
    T: ScanStrategy,
    W: Write,
{
    if !args.file.is_file() {
        eprintln!("File not found: {}", args.file.display());
        return EXIT_NOT_FOUND;
    }

    match execute(args, prefix, strategy, out) {
        Ok(report) => {
            info!(
                "Summary: {} extracted, {} skipped, {} truncated",
                report.extracted.len(),
                report.skipped.len(),
                report.truncated_count()
            );
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_FAILURE
        }
    }
}

fn execute<T, W>(args: &CommonArgs, prefix: &str, strategy: &T, out: &mut W) -> Result<ScanReport>
where
    T: ScanStrategy,
    W: Write,
{
    let file = &args.file;

    let report = match args.format {
        OutputFormat::File => {
            let mut sink = FileSink::new(&args.output, prefix);
            let result = scan_file(file, strategy, &mut sink);

            // Report whatever was written before a failure
            for path in sink.written() {
                writeln!(out, "dump to {}", path.display()).context("Failed to write output")?;
            }
            result.with_context(|| format!("Failed to extract from {}", file.display()))?
        }
        OutputFormat::Dd => {
            let mut sink = CommandSink::new(&mut *out, file.display().to_string(), prefix);
            scan_file(file, strategy, &mut sink)
                .with_context(|| format!("Failed to scan {}", file.display()))?
        }
    };

    out.flush().context("Failed to flush output")?;
    Ok(report)
}
