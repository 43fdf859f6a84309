//! ICSP bit protocol
//!
//! This module provides the bit-level sequencing of the In-Circuit Serial
//! Programming protocol used by PIC24/dsPIC devices, the instruction opcodes
//! the programming engine feeds through it, and the codec that packs 24-bit
//! instruction words into 16-bit working registers.

pub mod codec;
mod command;
pub mod opcodes;
mod sequencer;

pub use codec::{pack, unpack};
pub use command::Command;
pub use sequencer::{Sequencer, ENTRY_KEY};
