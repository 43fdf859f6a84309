//! Whole-device operations
//!
//! These functions combine the programming engine, the chip catalog and
//! the hex word adapter into the operations a user actually runs: identify
//! the target, dump it to an image, program an image, verify, erase.

mod operations;
mod regions;

pub use operations::{
    blocks_to_write, erase_device, identify, read_device, verify_device, write_device,
    NoProgress, ProbeResult, Progress, WriteStats,
};
pub use regions::{regions, MemoryRegion, RegionKind, PE_BASE};
