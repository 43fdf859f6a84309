//! pic24prog-core - Core library for PIC24/dsPIC ICSP programming
//!
//! This crate provides the ICSP protocol engine used to read, write and
//! erase 16-bit PIC microcontrollers (PIC24, dsPIC30, dsPIC33) over a
//! bit-banged In-Circuit Serial Programming link.
//!
//! # Layers
//!
//! - [`programmer`] - the `LineDriver` capability implemented by adapters
//! - [`icsp`] - bit-level SIX/REGOUT sequencing and the word codec
//! - [`protocol`] - the programming engine (sessions, block read/write,
//!   configuration words, chip erase)
//! - [`chip`] - static device-id catalog
//! - [`hex`] - Intel-HEX images and the 24-bit word address adapter
//! - [`flash`] - whole-device operations built on the engine
//!
//! # Example
//!
//! ```ignore
//! use pic24prog_core::{flash, protocol::Pic24Programmer};
//!
//! let mut prog = Pic24Programmer::new(driver);
//! let probe = flash::identify(&mut prog)?;
//! println!("Found: {}", probe.chip);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod chip;
pub mod error;
pub mod flash;
pub mod hex;
pub mod icsp;
pub mod programmer;
pub mod protocol;

pub use error::{Error, PreconditionViolation, Result};
