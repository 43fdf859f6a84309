//! Chip type definitions

use std::borrow::Cow;
use std::fmt;

/// A silicon revision label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    /// DEVREV register value
    pub id: u16,
    /// Human-readable label
    pub label: &'static str,
}

/// A configuration word that must be forced before programming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigFixup {
    /// Index into the configuration words
    pub index: usize,
    /// Value written instead of the image contents
    pub value: u32,
}

/// Static catalog entry
#[derive(Debug, Clone, Copy)]
pub struct ChipEntry {
    /// DEVID register value
    pub device_id: u16,
    /// Part name
    pub name: &'static str,
    /// Known silicon revisions
    pub revisions: &'static [Revision],
    /// Program flash size in instruction words
    pub flash_words: u32,
    /// RAM size in bytes
    pub ram_bytes: u32,
    /// Programming executive size in instruction words
    pub pe_words: u32,
    /// Configuration words forced on write
    pub config_fixups: &'static [ConfigFixup],
}

impl ChipEntry {
    /// Look up a revision label
    pub fn revision(&self, id: u16) -> Option<&'static str> {
        self.revisions.iter().find(|r| r.id == id).map(|r| r.label)
    }
}

/// Result of identifying a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipDescriptor {
    /// DEVID (0 for an unknown device)
    pub device_id: u16,
    /// Part name
    pub name: &'static str,
    /// DEVREV as read from the target (0 for an unknown device)
    pub revision_id: u16,
    /// Revision label
    pub revision: Cow<'static, str>,
    /// Program flash size in instruction words
    pub flash_words: u32,
    /// RAM size in bytes
    pub ram_bytes: u32,
    /// Programming executive size in instruction words
    pub pe_words: u32,
    /// Configuration words forced on write
    pub config_fixups: &'static [ConfigFixup],
}

impl ChipDescriptor {
    /// The descriptor returned for a device id missing from the catalog
    pub fn unknown() -> Self {
        Self {
            device_id: 0,
            name: "Unknown",
            revision_id: 0,
            revision: Cow::Borrowed("Unknown"),
            flash_words: 0,
            ram_bytes: 0,
            pe_words: 0,
            config_fixups: &[],
        }
    }

    /// Build a descriptor from a catalog entry and the revision read back
    pub fn from_entry(entry: &ChipEntry, revision_id: u16) -> Self {
        let revision = match entry.revision(revision_id) {
            Some(label) => Cow::Borrowed(label),
            None => Cow::Owned(format!("Unknown revision, RevId:{:#x}", revision_id)),
        };
        Self {
            device_id: entry.device_id,
            name: entry.name,
            revision_id,
            revision,
            flash_words: entry.flash_words,
            ram_bytes: entry.ram_bytes,
            pe_words: entry.pe_words,
            config_fixups: entry.config_fixups,
        }
    }

    /// Whether the device was found in the catalog
    pub fn is_known(&self) -> bool {
        self.device_id != 0
    }

    /// Overwrite configuration words that need a fixed value on this part
    pub fn apply_config_fixups(&self, config: &mut [u32]) {
        for fixup in self.config_fixups {
            if let Some(word) = config.get_mut(fixup.index) {
                log::debug!(
                    "{}: forcing config word {} to 0x{:04X}",
                    self.name,
                    fixup.index,
                    fixup.value
                );
                *word = fixup.value;
            }
        }
    }
}

fn kib(n: u32) -> f64 {
    n as f64 / 1024.0
}

impl fmt::Display for ChipDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug keeps the trailing ".0" on whole numbers
        write!(
            f,
            "{} - {} - Flash:{:?}K RAM:{:?}K PE:{:?}K",
            self.name,
            self.revision,
            kib(self.flash_words),
            kib(self.ram_bytes),
            kib(self.pe_words)
        )
    }
}
