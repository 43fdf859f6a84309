//! Programmer selection for pic24prog
//!
//! This crate resolves programmer specification strings into line drivers.
//! The CLI only asks this crate for a driver and hands it to the core
//! programming engine; it never names a driver crate directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI (bin/pic24prog)                     │
//! │  - Imports pic24prog-flash and pic24prog-core                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   pic24prog-flash (this crate)               │
//! │  - Opens programmers by name, returns Box<dyn LineDriver>    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │    pic24prog-core        │   │  Driver crates           │
//! │  - ICSP sequencer        │   │  - parport, dummy        │
//! │  - Programming engine    │   │  - Implement LineDriver  │
//! │  - Chip catalog, hex     │   │                          │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pic24prog_core::protocol::Pic24Programmer;
//! use pic24prog_flash::open_programmer;
//!
//! let driver = open_programmer("CheapParport:dev=/dev/parport0")?;
//! let mut prog = Pic24Programmer::new(driver);
//! ```

mod registry;

pub use registry::{
    available_programmers, find_programmer, open_programmer, parse_programmer_params,
    programmer_names_short, BoxedDriver, ProgrammerInfo, ProgrammerParams,
};
