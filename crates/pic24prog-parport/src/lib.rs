//! pic24prog-parport - Parallel port ICSP adapter support
//!
//! This crate drives the "CheapParport" adapter: a passive cable that
//! connects the ICSP lines of a PIC24/dsPIC target to the data and status
//! registers of a PC parallel port, accessed through Linux ppdev
//! (`/dev/parportN`).
//!
//! # Example
//!
//! ```no_run
//! use pic24prog_core::protocol::Pic24Programmer;
//! use pic24prog_parport::{CheapParport, CheapParportConfig};
//!
//! let port = CheapParport::new(CheapParportConfig::new("/dev/parport0"));
//! let mut prog = Pic24Programmer::new(port);
//! prog.begin()?;
//! let id = prog.read_device_id()?;
//! println!("DEVID: {:04X}", id.device);
//! prog.end()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with pic24prog CLI
//!
//! ```bash
//! pic24prog --programmer CheapParport identify
//! pic24prog --programmer CheapParport:dev=/dev/parport1 identify
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with ppdev support (`CONFIG_PPDEV`)
//! - Read/write access to `/dev/parportN`, usually through the `lp` group

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, CheapParport, CheapParportConfig, DataLines, StatusLines};
pub use error::{ParportError, Result};

/// Open a CheapParport adapter and return a boxed LineDriver
///
/// This is a convenience function for use in the CLI programmer dispatch.
///
/// # Example Options
///
/// - `dev=/dev/parport0` - Optional: device path (default: /dev/parport0)
pub fn open_cheap_parport(
    options: &[(&str, &str)],
) -> std::result::Result<
    Box<dyn pic24prog_core::programmer::LineDriver + Send>,
    Box<dyn std::error::Error>,
> {
    let config = parse_options(options)?;
    let port = CheapParport::probe(config)?;
    Ok(Box::new(port))
}
