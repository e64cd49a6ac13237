//! cxfwcheck - Validate a carved CX firmware image
//!
//! Checks that a `cx*.bin` file has the size the encoder expects and
//! optionally writes the byte-swapped stream that the capture tool sends
//! to the device during firmware download.

use anyhow::{Context, Result};
use clap::Parser;
use fwcut::{init_tracing, EXIT_FAILURE, EXIT_NOT_FOUND, EXIT_SUCCESS};
use fwcut_core::{CxFirmware, Error as CoreError};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

/// Validate a carved CX firmware image
#[derive(Parser, Debug)]
#[command(name = "cxfwcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Carved CX firmware image
    #[arg(value_name = "CX_FIRMWARE")]
    firmware: PathBuf,

    /// Write the big-endian download stream to this file
    #[arg(long, value_name = "FILE")]
    wire_out: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match check(&cli, &mut std::io::stdout().lock()) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => match e.downcast_ref::<CoreError>() {
            Some(CoreError::FileNotFound { .. }) => {
                eprintln!("File not found: {}", cli.firmware.display());
                ExitCode::from(EXIT_NOT_FOUND)
            }
            _ => {
                eprintln!("Error: {:#}", e);
                ExitCode::from(EXIT_FAILURE)
            }
        },
    }
}

fn check<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let firmware = CxFirmware::load(&cli.firmware)?;

    if !firmware.has_signature() {
        warn!(
            "{} does not carry the CX signature at offset 2",
            cli.firmware.display()
        );
    }

    writeln!(
        out,
        "{}: {:#x} bytes, {} transfers",
        cli.firmware.display(),
        firmware.as_bytes().len(),
        firmware.chunk_count()
    )?;

    if let Some(ref path) = cli.wire_out {
        fs::write(path, firmware.download_image())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writeln!(out, "wrote download stream to {}", path.display())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwcut_core::scanner::CX_REGION_LEN;
    use tempfile::TempDir;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_writes_download_stream() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("cx3f0.bin");
        let wire = temp_dir.path().join("cx3f0.wire");
        let mut data = vec![0u8; CX_REGION_LEN as usize];
        data[..4].copy_from_slice(&[1, 2, 3, 4]);
        fs::write(&input, &data).unwrap();

        let cli = Cli::try_parse_from([
            "cxfwcheck",
            "--wire-out",
            wire.to_str().unwrap(),
            input.to_str().unwrap(),
        ])
        .unwrap();
        let mut out = Vec::new();
        check(&cli, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("0x40000 bytes, 8 transfers"));

        let stream = fs::read(&wire).unwrap();
        assert_eq!(stream.len(), data.len());
        assert_eq!(&stream[..4], &[4u8, 3, 2, 1]);
    }

    #[test]
    fn test_check_rejects_short_image() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("cx0.bin");
        fs::write(&input, [0u8; 0x100]).unwrap();

        let cli = Cli::try_parse_from(["cxfwcheck", input.to_str().unwrap()]).unwrap();
        let err = check(&cli, &mut Vec::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidFirmware { actual: 0x100, .. })
        ));
    }
}
