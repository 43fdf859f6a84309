//! 24-bit program words inside a byte-addressed image
//!
//! Word index `i` occupies byte addresses `4*i .. 4*i + 3`:
//!
//! ```text
//! 4*i + 0   bits  7..0
//! 4*i + 1   bits 15..8
//! 4*i + 2   bits 23..16
//! 4*i + 3   padding (always written as 0)
//! ```
//!
//! Word index is the device address divided by two, so byte address is the
//! device address times two.

use std::fmt;

use super::HexImage;

/// Bytes occupied by one program word
pub const BYTES_PER_WORD: u32 = 4;

/// Offset of the padding byte inside a word
const PAD_LANE: u32 = 3;

/// Inclusive range of word indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRun {
    /// First word index
    pub start: u32,
    /// Last word index
    pub end: u32,
}

impl fmt::Display for AddressRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}-0x{:06X}", self.start, self.end)
    }
}

fn base(index: u32) -> u32 {
    index.wrapping_mul(BYTES_PER_WORD)
}

/// Read the word at `index`; absent bytes read as 0xFF
pub fn word_get(image: &HexImage, index: u32) -> u32 {
    let b = base(index);
    u32::from(image.get_byte(b))
        | u32::from(image.get_byte(b + 1)) << 8
        | u32::from(image.get_byte(b + 2)) << 16
}

/// Store the 24-bit `value` at `index`
pub fn word_set(image: &mut HexImage, index: u32, value: u32) {
    let b = base(index);
    image.set_byte(b, value as u8);
    image.set_byte(b + 1, (value >> 8) as u8);
    image.set_byte(b + 2, (value >> 16) as u8);
    image.set_byte(b + PAD_LANE, 0);
}

/// Whether the image lists a word at `index`
pub fn word_present(image: &HexImage, index: u32) -> bool {
    image.contains(base(index) + PAD_LANE)
}

/// Word indices listed in the image, ascending
///
/// A word counts as listed when its padding byte is present.
pub fn listed_word_addresses(image: &HexImage) -> Vec<u32> {
    image
        .addresses()
        .filter(|a| a % BYTES_PER_WORD == PAD_LANE)
        .map(|a| a / BYTES_PER_WORD)
        .collect()
}

/// Coalesce the listed word indices into inclusive runs
pub fn contiguous_runs(image: &HexImage) -> Vec<AddressRun> {
    let mut runs: Vec<AddressRun> = Vec::new();
    for index in listed_word_addresses(image) {
        match runs.last_mut() {
            Some(run) if run.end.checked_add(1) == Some(index) => run.end = index,
            _ => runs.push(AddressRun {
                start: index,
                end: index,
            }),
        }
    }
    runs
}

/// Reverse the byte order inside every word
///
/// Converts between the canonical layout and images that store the
/// padding byte first. Applying it twice returns the original image.
pub fn swap_lanes(image: &HexImage) -> HexImage {
    image.iter().map(|(a, v)| (a ^ 0b11, v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with_words(indices: &[u32]) -> HexImage {
        let mut image = HexImage::new();
        for &i in indices {
            word_set(&mut image, i, i);
        }
        image
    }

    #[test]
    fn test_word_layout() {
        let mut image = HexImage::new();
        word_set(&mut image, 2, 0xAB_CDEF);
        assert_eq!(image.get_byte(8), 0xEF);
        assert_eq!(image.get_byte(9), 0xCD);
        assert_eq!(image.get_byte(10), 0xAB);
        assert_eq!(image.get_byte(11), 0x00);
        assert_eq!(word_get(&image, 2), 0xAB_CDEF);
        assert!(word_present(&image, 2));
        assert!(!word_present(&image, 3));
    }

    #[test]
    fn test_missing_word_reads_erased() {
        assert_eq!(word_get(&HexImage::new(), 100), 0xFF_FFFF);
    }

    #[test]
    fn test_word_set_drops_upper_byte() {
        let mut image = HexImage::new();
        word_set(&mut image, 0, 0xFF12_3456);
        assert_eq!(word_get(&image, 0), 0x12_3456);
    }

    #[test]
    fn test_contiguous_runs() {
        let image = image_with_words(&[5, 6, 7, 10, 11, 20]);
        assert_eq!(
            contiguous_runs(&image),
            vec![
                AddressRun { start: 5, end: 7 },
                AddressRun { start: 10, end: 11 },
                AddressRun { start: 20, end: 20 },
            ]
        );
    }

    #[test]
    fn test_runs_single_word_at_zero() {
        let image = image_with_words(&[0]);
        assert_eq!(
            contiguous_runs(&image),
            vec![AddressRun { start: 0, end: 0 }]
        );
        assert!(contiguous_runs(&HexImage::new()).is_empty());
    }

    #[test]
    fn test_listed_ignores_partial_words() {
        let mut image = image_with_words(&[1]);
        // Bytes of word 4 without its padding byte
        image.set_byte(16, 0x12);
        image.set_byte(17, 0x34);
        assert_eq!(listed_word_addresses(&image), vec![1]);
    }

    #[test]
    fn test_swap_lanes() {
        let mut image = HexImage::new();
        word_set(&mut image, 0, 0x12_3456);
        let swapped = swap_lanes(&image);
        assert_eq!(swapped.get_byte(0), 0x00);
        assert_eq!(swapped.get_byte(1), 0x12);
        assert_eq!(swapped.get_byte(2), 0x34);
        assert_eq!(swapped.get_byte(3), 0x56);
        assert_eq!(swap_lanes(&swapped), image);
    }

    #[test]
    fn test_swap_lanes_involution_sparse() {
        let image: HexImage = [(0x101u32, 0x01u8), (0x206, 0x02), (0x7C_0003, 0x03)]
            .into_iter()
            .collect();
        assert_eq!(swap_lanes(&swap_lanes(&image)), image);
        assert_eq!(swap_lanes(&image).get_byte(0x102), 0x01);
    }
}
