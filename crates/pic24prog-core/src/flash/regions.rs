//! Program memory map of a target

use crate::chip::ChipDescriptor;
use crate::protocol::pic24::{CONFIG_ADDR, CONFIG_WORDS};

/// Device address of the programming executive
pub const PE_BASE: u32 = 0x80_0000;

/// Kind of memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// User program flash
    Flash,
    /// Programming executive
    Executive,
    /// Configuration registers
    Config,
}

/// A span of program memory, in device addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    /// Region kind
    pub kind: RegionKind,
    /// Display name
    pub name: &'static str,
    /// First device address
    pub base: u32,
    /// Size in instruction words
    pub words: u32,
}

impl MemoryRegion {
    /// Image word index of the first word
    pub fn first_index(&self) -> u32 {
        self.base >> 1
    }

    /// Image word index one past the last word
    pub fn end_index(&self) -> u32 {
        self.first_index() + self.words
    }

    /// Whether the image word `index` lies in this region
    pub fn contains_index(&self, index: u32) -> bool {
        (self.first_index()..self.end_index()).contains(&index)
    }

    /// Device address of the image word `index`
    pub fn address_of(index: u32) -> u32 {
        index << 1
    }
}

/// Flash, executive and configuration regions of `chip`
pub fn regions(chip: &ChipDescriptor) -> [MemoryRegion; 3] {
    [
        MemoryRegion {
            kind: RegionKind::Flash,
            name: "FLASH",
            base: 0,
            words: chip.flash_words,
        },
        MemoryRegion {
            kind: RegionKind::Executive,
            name: "Programming Executive",
            base: PE_BASE,
            words: chip.pe_words,
        },
        MemoryRegion {
            kind: RegionKind::Config,
            name: "Configuration",
            base: CONFIG_ADDR,
            words: CONFIG_WORDS as u32,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip;

    #[test]
    fn test_region_indices() {
        let [flash, pe, config] = regions(&chip::identify(0x0802, 0x3001));
        assert_eq!((flash.first_index(), flash.end_index()), (0, 4096));
        assert_eq!(pe.first_index(), 0x40_0000);
        assert!(pe.contains_index(0x40_03FF));
        assert!(!pe.contains_index(0x40_0400));
        assert_eq!(config.first_index(), 0x7C_0000);
        assert_eq!(MemoryRegion::address_of(config.first_index()), 0xF8_0000);
    }

    #[test]
    fn test_unknown_chip_has_empty_program_regions() {
        let [flash, pe, _] = regions(&chip::ChipDescriptor::unknown());
        assert_eq!(flash.words, 0);
        assert_eq!(pe.words, 0);
    }
}
