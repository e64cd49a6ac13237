//! ezfwcut - Extract EZ-USB firmware images from Windows driver files
//!
//! EZ-USB images sit in 64 KiB slots padded with `0xaa`; the first 8 KiB
//! of every slot that ends in a long padding run is carved.

use clap::Parser;
use fwcut::{init_tracing, run, CommonArgs, EXIT_USAGE};
use fwcut_core::{PaddingConfig, PaddingScanner, EZ_PREFIX};
use std::process::ExitCode;

/// Extract EZ-USB firmware images from a Windows driver file
#[derive(Parser, Debug)]
#[command(name = "ezfwcut")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.common.verbose);

    let config = PaddingConfig::new().max_results(cli.common.max_regions);
    let scanner = match PaddingScanner::with_config(config) {
        Ok(scanner) => scanner,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    ExitCode::from(run(&cli.common, EZ_PREFIX, &scanner))
}
