//! Read command

use super::progress::IndicatifProgress;
use super::save_image;
use pic24prog_core::flash::{self, regions, RegionKind};
use pic24prog_core::hex::{word_get, word_present, HexImage};
use pic24prog_core::programmer::LineDriver;
use pic24prog_core::protocol::Pic24Programmer;
use std::path::Path;

/// Words shown per dump line
const WORDS_PER_LINE: u32 = 8;

pub fn run<D: LineDriver>(
    prog: &mut Pic24Programmer<D>,
    output: Option<&Path>,
    swap: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let probe = flash::identify(prog)?;
    println!("{}", probe.chip);
    println!("Reading...");

    let mut progress = IndicatifProgress::new();
    let image = flash::read_device(prog, &probe, &mut progress)?;

    match output {
        Some(path) => save_image(&image, path, swap),
        None => {
            print_image(&image, &probe.chip);
            Ok(())
        }
    }
}

/// Print the listed words of every region
fn print_image(image: &HexImage, chip: &pic24prog_core::chip::ChipDescriptor) {
    for region in regions(chip) {
        println!("{}:", region.name);
        if region.kind == RegionKind::Config {
            let first = region.first_index();
            for row in 0..region.words / 4 {
                let words: Vec<String> = (0..4)
                    .map(|col| format!("0x{:04X}", word_get(image, first + row * 4 + col)))
                    .collect();
                println!("  {}", words.join(" "));
            }
            continue;
        }

        let mut printed = false;
        let mut line = region.first_index();
        while line < region.end_index() {
            let end = (line + WORDS_PER_LINE).min(region.end_index());
            if (line..end).any(|i| word_present(image, i)) {
                let words: Vec<String> = (line..end)
                    .map(|i| format!("{:06X}", word_get(image, i)))
                    .collect();
                println!("  0x{:06X}: {}", line << 1, words.join(" "));
                printed = true;
            }
            line = end;
        }
        if !printed {
            println!("  (blank)");
        }
    }
}
