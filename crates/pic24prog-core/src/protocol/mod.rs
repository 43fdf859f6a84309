//! Programming protocol implementations
//!
//! This module contains the command scripts that read, write and erase
//! 16-bit PIC program memory through the ICSP sequencer.

pub mod pic24;

pub use pic24::{DeviceId, Pic24Programmer, SessionState};
