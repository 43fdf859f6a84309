//! CLI command implementations
//!
//! Each device command opens its own ICSP sessions through the operations
//! in `pic24prog_core::flash`; the programmer is left closed afterwards so
//! `main` can start the target.

pub mod erase;
pub mod identify;
mod list;
mod progress;
pub mod read;
pub mod verify;
pub mod write;

pub use list::{list_chips, list_programmers};

use pic24prog_core::hex::{swap_lanes, HexImage};
use std::path::Path;

/// Load an Intel HEX image, converting from the swapped lane order if asked
fn load_image(path: &Path, swap: bool) -> Result<HexImage, Box<dyn std::error::Error>> {
    let image = HexImage::load(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    println!("Read {} bytes from {:?}", image.len(), path);
    Ok(if swap { swap_lanes(&image) } else { image })
}

/// Save an Intel HEX image, converting to the swapped lane order if asked
fn save_image(image: &HexImage, path: &Path, swap: bool) -> Result<(), Box<dyn std::error::Error>> {
    let out = if swap { swap_lanes(image) } else { image.clone() };
    out.save(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    println!("Wrote {} bytes to {:?}", out.len(), path);
    Ok(())
}
