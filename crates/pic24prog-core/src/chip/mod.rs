//! Chip catalog
//!
//! Static table of supported 16-bit PICs keyed by the DEVID register, with
//! memory sizes and per-family silicon revision labels.

mod database;
mod types;

pub use database::{chips, identify};
pub use types::{ChipDescriptor, ChipEntry, ConfigFixup, Revision};
