//! Intel-HEX images and 24-bit word addressing
//!
//! Program memory words are stored four bytes per word inside a byte
//! addressed Intel-HEX image. [`HexImage`] handles the file format,
//! [`word_get`] and [`word_set`] map word indices onto that byte space.

mod image;
mod words;

pub use image::{HexError, HexImage};
pub use words::{
    contiguous_runs, listed_word_addresses, swap_lanes, word_get, word_present, word_set,
    AddressRun, BYTES_PER_WORD,
};
