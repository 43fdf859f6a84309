//! Write command

use super::load_image;
use super::progress::IndicatifProgress;
use pic24prog_core::flash;
use pic24prog_core::programmer::LineDriver;
use pic24prog_core::protocol::Pic24Programmer;
use std::path::Path;

pub fn run<D: LineDriver>(
    prog: &mut Pic24Programmer<D>,
    input: &Path,
    swap: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = load_image(input, swap)?;

    let probe = flash::identify(prog)?;
    println!("{}", probe.chip);

    let mut progress = IndicatifProgress::new();
    let stats = flash::write_device(prog, &probe, &image, &mut progress)?;

    println!(
        "Write complete: {} rows written, {} blank rows skipped",
        stats.rows_written, stats.rows_skipped
    );
    if stats.config_written {
        println!("Configuration words written");
    }
    Ok(())
}
