//! Built-in chip catalog

use super::types::{ChipDescriptor, ChipEntry, ConfigFixup, Revision};

const K: u32 = 1024;

/// Programming executive size shared by every supported part
const PE_WORDS: u32 = 1024;

const DSPIC33FJ06GS101_REVS: &[Revision] = &[
    Revision {
        id: 0x3000,
        label: "A0 Revision",
    },
    Revision {
        id: 0x3001,
        label: "A1 Revision",
    },
    Revision {
        id: 0x3002,
        label: "A2 Revision",
    },
];

const DSPIC33FJ12GP201_REVS: &[Revision] = &[
    Revision {
        id: 0x3001,
        label: "A2 Revision",
    },
    Revision {
        id: 0x3002,
        label: "A3 Revision",
    },
    Revision {
        id: 0x3003,
        label: "A4 Revision",
    },
];

const PIC24HJ12GP20X_REVS: &[Revision] = &[
    Revision {
        id: 0x3001,
        label: "A2 Revision",
    },
    Revision {
        id: 0x3002,
        label: "A3 Revision",
    },
    Revision {
        id: 0x3003,
        label: "A4 Revision",
    },
    Revision {
        id: 0x3005,
        label: "A5 Revision",
    },
];

/// Configuration word 1 must be programmed as 0x000F on PIC24HJ12GP20x
const PIC24HJ12GP20X_FIXUPS: &[ConfigFixup] = &[ConfigFixup {
    index: 1,
    value: 0x000F,
}];

const fn entry(
    device_id: u16,
    name: &'static str,
    revisions: &'static [Revision],
    flash_words: u32,
    ram_bytes: u32,
) -> ChipEntry {
    ChipEntry {
        device_id,
        name,
        revisions,
        flash_words,
        ram_bytes,
        pe_words: PE_WORDS,
        config_fixups: &[],
    }
}

static CHIPS: &[ChipEntry] = &[
    // dsPIC33FJ SMPS family
    entry(0x0C00, "dsPIC33FJ06GS101", DSPIC33FJ06GS101_REVS, 2 * K, 256),
    entry(0x0C01, "dsPIC33FJ06GS102", DSPIC33FJ06GS101_REVS, 2 * K, 256),
    entry(0x0C02, "dsPIC33FJ06GS202", DSPIC33FJ06GS101_REVS, 2 * K, K),
    entry(0x0C04, "dsPIC33FJ16GS402", DSPIC33FJ06GS101_REVS, 6 * K, 2 * K),
    entry(0x0C06, "dsPIC33FJ16GS404", DSPIC33FJ06GS101_REVS, 6 * K, 2 * K),
    entry(0x0C03, "dsPIC33FJ16GS502", DSPIC33FJ06GS101_REVS, 6 * K, 2 * K),
    entry(0x0C05, "dsPIC33FJ16GS504", DSPIC33FJ06GS101_REVS, 6 * K, 2 * K),
    // dsPIC33FJ12 general purpose / motor control
    entry(0x0802, "dsPIC33FJ12GP201", DSPIC33FJ12GP201_REVS, 4 * K, K),
    entry(0x0803, "dsPIC33FJ12GP202", DSPIC33FJ12GP201_REVS, 4 * K, K),
    entry(0x0800, "dsPIC33FJ12MC201", DSPIC33FJ12GP201_REVS, 4 * K, K),
    entry(0x0801, "dsPIC33FJ12MC202", DSPIC33FJ12GP201_REVS, 4 * K, K),
    // PIC24HJ12
    ChipEntry {
        config_fixups: PIC24HJ12GP20X_FIXUPS,
        ..entry(0x080A, "PIC24HJ12GP201", PIC24HJ12GP20X_REVS, 4 * K, K)
    },
    ChipEntry {
        config_fixups: PIC24HJ12GP20X_FIXUPS,
        ..entry(0x080B, "PIC24HJ12GP202", PIC24HJ12GP20X_REVS, 4 * K, K)
    },
];

/// All catalog entries
pub fn chips() -> &'static [ChipEntry] {
    CHIPS
}

/// Identify a target from its DEVID and DEVREV registers
///
/// Never fails: an unknown device id yields [`ChipDescriptor::unknown`],
/// an unknown revision yields the part with an "Unknown revision" label.
pub fn identify(device_id: u16, revision_id: u16) -> ChipDescriptor {
    match CHIPS.iter().find(|c| c.device_id == device_id) {
        Some(entry) => ChipDescriptor::from_entry(entry, revision_id),
        None => {
            log::debug!("chip: device id 0x{:04X} not in catalog", device_id);
            ChipDescriptor::unknown()
        }
    }
}
