//! Whole-device read, write, verify and erase

use std::collections::BTreeSet;

use super::regions::{regions, MemoryRegion, RegionKind};
use crate::chip::{self, ChipDescriptor};
use crate::error::{Error, Result};
use crate::hex::{
    contiguous_runs, listed_word_addresses, word_get, word_present, word_set, HexImage,
};
use crate::programmer::LineDriver;
use crate::protocol::pic24::{
    DeviceId, Pic24Programmer, CONFIG_WORDS, MAX_READ_WORDS, ROW_WORDS,
};

/// Value of an erased program word
const ERASED_WORD: u32 = 0xFF_FFFF;

/// Callback for progress reporting during device operations
pub trait Progress {
    /// Called when starting to read a region
    fn reading(&mut self, region: &str, total_words: usize);

    /// Called to update read progress
    fn read_progress(&mut self, words_read: usize);

    /// Called when starting to write a region
    fn writing(&mut self, region: &str, total_words: usize);

    /// Called to update write progress
    fn write_progress(&mut self, words_written: usize);

    /// Called when the operation is complete
    fn complete(&mut self);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn reading(&mut self, _region: &str, _total_words: usize) {}
    fn read_progress(&mut self, _words_read: usize) {}
    fn writing(&mut self, _region: &str, _total_words: usize) {}
    fn write_progress(&mut self, _words_written: usize) {}
    fn complete(&mut self) {}
}

/// Identification of the attached target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Registers as read from the target
    pub id: DeviceId,
    /// Catalog lookup for those registers
    pub chip: ChipDescriptor,
}

impl ProbeResult {
    fn require_known(&self) -> Result<()> {
        if self.chip.is_known() {
            Ok(())
        } else {
            Err(Error::UnknownDevice {
                device_id: self.id.device,
                revision_id: self.id.revision,
            })
        }
    }
}

/// Statistics from a device write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    /// Rows programmed
    pub rows_written: usize,
    /// Rows touched by the image but left alone because they were blank
    pub rows_skipped: usize,
    /// Whether the configuration words were programmed
    pub config_written: bool,
}

/// Run `f` inside one ICSP session, closing it even when `f` fails
fn with_session<D, T, F>(prog: &mut Pic24Programmer<D>, f: F) -> Result<T>
where
    D: LineDriver,
    F: FnOnce(&mut Pic24Programmer<D>) -> Result<T>,
{
    prog.begin()?;
    let result = f(prog);
    let ended = prog.end();
    let value = result?;
    ended?;
    Ok(value)
}

/// Read the device id and look it up in the catalog
pub fn identify<D: LineDriver>(prog: &mut Pic24Programmer<D>) -> Result<ProbeResult> {
    let id = with_session(prog, |p| p.read_device_id())?;
    let chip = chip::identify(id.device, id.revision);
    if chip.is_known() {
        log::info!("Found {}", chip);
    } else {
        log::warn!(
            "Unknown device id 0x{:04X} (revision 0x{:04X})",
            id.device,
            id.revision
        );
    }
    Ok(ProbeResult { id, chip })
}

/// Number of listed words that fall outside every region of `chip`
fn ignored_words(image: &HexImage, chip: &ChipDescriptor) -> usize {
    let all = regions(chip);
    listed_word_addresses(image)
        .into_iter()
        .filter(|&i| !all.iter().any(|r| r.contains_index(i)))
        .count()
}

/// Start indices of the rows that hold words listed in `image`
///
/// Only words inside flash or the programming executive are considered;
/// anything outside the memory map of `chip` is reported and skipped.
pub fn blocks_to_write(image: &HexImage, chip: &ChipDescriptor) -> Vec<u32> {
    let ignored = ignored_words(image, chip);
    if ignored > 0 {
        log::warn!(
            "Ignoring {} image words outside the memory of {}",
            ignored,
            chip.name
        );
    }

    let program: Vec<MemoryRegion> = regions(chip)
        .into_iter()
        .filter(|r| r.kind != RegionKind::Config && r.words > 0)
        .collect();
    let row = ROW_WORDS as u32;

    let mut blocks = BTreeSet::new();
    for run in contiguous_runs(image) {
        log::debug!("image range {}", run);
        for region in &program {
            let lo = run.start.max(region.first_index());
            let hi = run.end.min(region.end_index() - 1);
            if lo > hi {
                continue;
            }
            let first = region.first_index();
            for block in (lo - first) / row..=(hi - first) / row {
                blocks.insert(first + block * row);
            }
        }
    }
    blocks.into_iter().collect()
}

fn config_region(chip: &ChipDescriptor) -> MemoryRegion {
    let [_, _, config] = regions(chip);
    config
}

fn expected_config(image: &HexImage, chip: &ChipDescriptor) -> Option<Vec<u32>> {
    let region = config_region(chip);
    let first = region.first_index();
    if !(first..region.end_index()).any(|i| word_present(image, i)) {
        return None;
    }
    let mut words: Vec<u32> = (0..CONFIG_WORDS as u32)
        .map(|i| word_get(image, first + i) & 0xFFFF)
        .collect();
    chip.apply_config_fixups(&mut words);
    Some(words)
}

/// Read flash, programming executive and configuration words into an image
///
/// Erased words (0xFFFFFF) are left out of the image; configuration words
/// are always stored.
pub fn read_device<D: LineDriver, P: Progress>(
    prog: &mut Pic24Programmer<D>,
    probe: &ProbeResult,
    progress: &mut P,
) -> Result<HexImage> {
    probe.require_known()?;
    let [flash, pe, config] = regions(&probe.chip);
    let mut image = HexImage::new();

    with_session(prog, |p| {
        for region in [flash, pe] {
            progress.reading(region.name, region.words as usize);
            let mut offset = 0u32;
            while offset < region.words {
                let count = (region.words - offset).min(MAX_READ_WORDS as u32);
                let index = region.first_index() + offset;
                let words = p.read_memory(MemoryRegion::address_of(index), count as usize)?;
                for (i, &word) in words.iter().enumerate() {
                    if word != ERASED_WORD {
                        word_set(&mut image, index + i as u32, word);
                    }
                }
                offset += count;
                progress.read_progress(offset as usize);
            }
        }
        Ok(())
    })?;

    // Configuration words are read in a fresh session
    progress.reading(config.name, CONFIG_WORDS);
    let words = with_session(prog, |p| p.read_config_memory())?;
    for (i, &word) in words.iter().enumerate() {
        word_set(&mut image, config.first_index() + i as u32, word);
    }
    progress.read_progress(CONFIG_WORDS);
    progress.complete();

    log::info!("Read {} words", image.len() / 4);
    Ok(image)
}

/// Program an image into the target
///
/// Rows containing only erased words are skipped; words missing from a
/// written row are programmed as 0xFFFFFF. Configuration words are written
/// only when the image lists at least one of them. The first failing row
/// aborts the operation.
pub fn write_device<D: LineDriver, P: Progress>(
    prog: &mut Pic24Programmer<D>,
    probe: &ProbeResult,
    image: &HexImage,
    progress: &mut P,
) -> Result<WriteStats> {
    probe.require_known()?;
    let blocks = blocks_to_write(image, &probe.chip);
    let config = expected_config(image, &probe.chip);
    let mut stats = WriteStats::default();

    with_session(prog, |p| {
        progress.writing("Program memory", blocks.len() * ROW_WORDS);
        for (n, &start) in blocks.iter().enumerate() {
            let words: Vec<u32> = (start..start + ROW_WORDS as u32)
                .map(|i| word_get(image, i))
                .collect();
            if words.iter().all(|&w| w == ERASED_WORD) {
                log::debug!("Skipping blank row at 0x{:06X}", MemoryRegion::address_of(start));
                stats.rows_skipped += 1;
            } else {
                p.write_memory(MemoryRegion::address_of(start), &words)?;
                stats.rows_written += 1;
            }
            progress.write_progress((n + 1) * ROW_WORDS);
        }

        match &config {
            Some(words) => {
                progress.writing("Configuration", CONFIG_WORDS);
                p.write_config_memory(words)?;
                progress.write_progress(CONFIG_WORDS);
                stats.config_written = true;
            }
            None => log::info!("Image has no configuration words, leaving them unchanged"),
        }
        Ok(())
    })?;
    progress.complete();

    log::info!(
        "Wrote {} rows ({} blank rows skipped){}",
        stats.rows_written,
        stats.rows_skipped,
        if stats.config_written {
            " and configuration"
        } else {
            ""
        }
    );
    Ok(stats)
}

/// Compare the target against an image
///
/// Returns the image word indices whose contents differ. Only words listed
/// in the image are compared.
pub fn verify_device<D: LineDriver, P: Progress>(
    prog: &mut Pic24Programmer<D>,
    probe: &ProbeResult,
    image: &HexImage,
    progress: &mut P,
) -> Result<Vec<u32>> {
    probe.require_known()?;
    let blocks = blocks_to_write(image, &probe.chip);
    let config = expected_config(image, &probe.chip);
    let mut mismatches = Vec::new();

    with_session(prog, |p| {
        progress.reading("Program memory", blocks.len() * ROW_WORDS);
        for (n, &start) in blocks.iter().enumerate() {
            let words = p.read_memory(MemoryRegion::address_of(start), MAX_READ_WORDS)?;
            for (i, &actual) in words.iter().enumerate() {
                let index = start + i as u32;
                if word_present(image, index) && word_get(image, index) != actual {
                    mismatches.push(index);
                }
            }
            progress.read_progress((n + 1) * ROW_WORDS);
        }
        Ok(())
    })?;

    if let Some(expected) = config {
        progress.reading("Configuration", CONFIG_WORDS);
        let first = config_region(&probe.chip).first_index();
        let actual = with_session(prog, |p| p.read_config_memory())?;
        for (i, (&want, &got)) in expected.iter().zip(&actual).enumerate() {
            let index = first + i as u32;
            if word_present(image, index) && want != got & 0xFFFF {
                mismatches.push(index);
            }
        }
        progress.read_progress(CONFIG_WORDS);
    }
    progress.complete();

    for &index in mismatches.iter().take(8) {
        log::debug!("Mismatch at word 0x{:06X}", index);
    }
    Ok(mismatches)
}

/// Erase the whole target
pub fn erase_device<D: LineDriver>(prog: &mut Pic24Programmer<D>) -> Result<()> {
    with_session(prog, |p| p.erase_chip())?;
    log::info!("Chip erased");
    Ok(())
}
