//! Identify command

use pic24prog_core::flash;
use pic24prog_core::programmer::LineDriver;
use pic24prog_core::protocol::Pic24Programmer;

pub fn run<D: LineDriver>(prog: &mut Pic24Programmer<D>) -> Result<(), Box<dyn std::error::Error>> {
    let probe = flash::identify(prog)?;
    println!("0x{:04X} 0x{:04X}", probe.id.device, probe.id.revision);
    println!("{}", probe.chip);
    Ok(())
}
