//! Verify command

use super::load_image;
use super::progress::IndicatifProgress;
use pic24prog_core::flash;
use pic24prog_core::hex::word_get;
use pic24prog_core::programmer::LineDriver;
use pic24prog_core::protocol::Pic24Programmer;
use pic24prog_core::Error;
use std::path::Path;

/// Mismatches listed before the summary
const MAX_REPORTED: usize = 16;

pub fn run<D: LineDriver>(
    prog: &mut Pic24Programmer<D>,
    input: &Path,
    swap: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = load_image(input, swap)?;

    let probe = flash::identify(prog)?;
    println!("{}", probe.chip);

    let mut progress = IndicatifProgress::new();
    let mismatches = flash::verify_device(prog, &probe, &image, &mut progress)?;

    if mismatches.is_empty() {
        println!("Verification passed");
        return Ok(());
    }

    for &index in mismatches.iter().take(MAX_REPORTED) {
        println!(
            "  0x{:06X}: expected {:06X}",
            index << 1,
            word_get(&image, index)
        );
    }
    if mismatches.len() > MAX_REPORTED {
        println!("  ... and {} more", mismatches.len() - MAX_REPORTED);
    }
    println!("Verification failed: {} words differ", mismatches.len());
    Err(Error::VerifyError.into())
}
