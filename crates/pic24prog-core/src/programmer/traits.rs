//! Line driver trait definitions

use super::SignalState;
use crate::error::Result;

/// Hardware access for one ICSP adapter
///
/// Implementations translate a [`SignalState`] into whatever the adapter
/// needs (a parallel port data register, GPIO lines, a simulated target)
/// and report the PGD level driven by the target.
///
/// Calls arrive strictly in order and from a single thread. `commit` must
/// apply the state before returning, since the sequencer relies on each
/// call producing exactly one edge on the wire.
pub trait LineDriver {
    /// Acquire the adapter
    fn open(&mut self) -> Result<()>;

    /// Release the adapter
    fn close(&mut self) -> Result<()>;

    /// Drive the output lines to `state`
    fn commit(&mut self, state: &SignalState) -> Result<()>;

    /// Sample the PGD line
    fn read_data(&mut self) -> Result<bool>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

// Blanket impl for boxed drivers to allow trait objects
impl LineDriver for Box<dyn LineDriver + Send> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn commit(&mut self, state: &SignalState) -> Result<()> {
        (**self).commit(state)
    }

    fn read_data(&mut self) -> Result<bool> {
        (**self).read_data()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
