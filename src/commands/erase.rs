//! Erase command

use pic24prog_core::flash;
use pic24prog_core::programmer::LineDriver;
use pic24prog_core::protocol::Pic24Programmer;

pub fn run<D: LineDriver>(prog: &mut Pic24Programmer<D>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Erasing...");
    flash::erase_device(prog)?;
    println!("Erase complete");
    Ok(())
}
