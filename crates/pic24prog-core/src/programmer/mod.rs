//! Line driver traits and abstractions
//!
//! A line driver moves the four ICSP lines (MCLR, VDD, PGD, PGC) of an
//! adapter and samples PGD back. Everything above it is adapter-agnostic.

#[cfg(test)]
pub(crate) mod recording;
mod signals;
mod traits;

pub use signals::SignalState;
pub use traits::*;
