//! cxfwcut - Extract CX firmware images from Windows driver files
//!
//! Looks for the `00 00 66 bb 55 aa` signature and carves the 256 KiB
//! image that starts just before it.

use clap::Parser;
use fwcut::{init_tracing, run, CommonArgs, HexPattern, EXIT_USAGE};
use fwcut_core::{SignatureConfig, SignatureScanner, CX_PREFIX};
use std::process::ExitCode;

/// Extract CX firmware images from a Windows driver file
#[derive(Parser, Debug)]
#[command(name = "cxfwcut")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Alternate signature as hex bytes (default: 000066bb55aa)
    #[arg(long)]
    pattern: Option<HexPattern>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.common.verbose);

    let mut config = SignatureConfig::new().max_results(cli.common.max_regions);
    if let Some(pattern) = cli.pattern {
        config = config.pattern(pattern.0);
    }

    let scanner = match SignatureScanner::with_config(config) {
        Ok(scanner) => scanner,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    ExitCode::from(run(&cli.common, CX_PREFIX, &scanner))
}
