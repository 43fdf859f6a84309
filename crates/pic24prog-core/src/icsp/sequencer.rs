//! Bit-level ICSP sequencing
//!
//! Every primitive is expressed as a series of [`SignalState`] commits so a
//! driver only ever has to move lines, never understand the protocol.
//!
//! Timing on the wire is set by how fast the driver applies commits; the
//! only explicit delays are the ones around ICSP entry.

use super::Command;
use crate::error::Result;
use crate::programmer::{LineDriver, SignalState};

/// Key clocked in MSB-first while MCLR is held low to enter ICSP mode
pub const ENTRY_KEY: u32 = 0x4D43_4851;

/// Delay between the entry key and releasing MCLR
const KEY_TO_MCLR_US: u32 = 5_000;
/// Delay after releasing MCLR before the first command
const MCLR_TO_FIRST_COMMAND_US: u32 = 30_000;

/// Clocks of the 4-bit control code
const CONTROL_CODE_BITS: u32 = 4;
/// Extra clocks on the first SIX of a session
const FIRST_COMMAND_PAD: u32 = 5;
/// Clocks after the REGOUT control code before data is shifted out
const REGOUT_IDLE_CLOCKS: u32 = 8;

/// Drives one line driver through the ICSP protocol
pub struct Sequencer<D: LineDriver> {
    driver: D,
    state: SignalState,
}

impl<D: LineDriver> Sequencer<D> {
    /// Create a sequencer with all lines low
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            state: SignalState::new(),
        }
    }

    /// Get a reference to the line driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the line driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Consume the sequencer, returning the line driver
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Current line state
    pub fn signals(&self) -> &SignalState {
        &self.state
    }

    fn commit(&mut self) -> Result<()> {
        self.driver.commit(&self.state)
    }

    fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.state.data = bit;
        self.commit()?;
        self.state.clock = true;
        self.commit()?;
        self.state.clock = false;
        self.commit()
    }

    fn read_bit(&mut self) -> Result<bool> {
        self.state.clock = true;
        self.commit()?;
        self.state.input = self.driver.read_data()?;
        self.state.clock = false;
        self.commit()?;
        Ok(self.state.input)
    }

    /// Power the target and clock in the ICSP entry key
    pub fn enter_session(&mut self) -> Result<()> {
        log::debug!("icsp: entering programming mode");
        self.driver.open()?;

        self.state.power = true;
        self.commit()?;
        self.state.data = false;
        self.state.clock = false;
        self.commit()?;

        for level in [false, true, false] {
            self.state.reset = level;
            self.commit()?;
        }

        for i in (0..32).rev() {
            self.write_bit((ENTRY_KEY >> i) & 1 != 0)?;
        }

        self.state.data = false;
        self.commit()?;
        self.driver.delay_us(KEY_TO_MCLR_US);

        self.state.reset = true;
        self.commit()?;
        self.driver.delay_us(MCLR_TO_FIRST_COMMAND_US);
        Ok(())
    }

    /// Hold the target in reset, remove power and release the driver
    ///
    /// The driver is closed even when the line changes fail.
    pub fn leave_session(&mut self) -> Result<()> {
        log::debug!("icsp: leaving programming mode");
        self.power_down()
    }

    fn power_down(&mut self) -> Result<()> {
        self.state.reset = false;
        let lowered = self.commit();
        self.state.power = false;
        let lowered = lowered.and_then(|()| self.commit());
        let closed = self.driver.close();
        lowered?;
        closed
    }

    /// Execute one instruction on the target (SIX)
    pub fn execute(&mut self, cmd: Command) -> Result<()> {
        log::trace!("icsp: SIX 0x{:06X}{}", cmd.opcode, if cmd.first { " (first)" } else { "" });

        for _ in 0..CONTROL_CODE_BITS {
            self.write_bit(false)?;
        }
        if cmd.first {
            for _ in 0..FIRST_COMMAND_PAD {
                self.write_bit(false)?;
            }
        }
        for i in 0..24 {
            self.write_bit((cmd.opcode >> i) & 1 != 0)?;
        }
        Ok(())
    }

    /// Shift out the VISI register (REGOUT)
    pub fn read_register(&mut self) -> Result<u16> {
        // Control code 0b0001, LSB first
        self.write_bit(true)?;
        for _ in 1..CONTROL_CODE_BITS + REGOUT_IDLE_CLOCKS {
            self.write_bit(false)?;
        }

        // Release PGD while the target drives it
        self.state.data = true;
        self.commit()?;

        let mut value = 0u16;
        for i in 0..16 {
            if self.read_bit()? {
                value |= 1 << i;
            }
        }
        log::trace!("icsp: REGOUT 0x{:04X}", value);
        Ok(value)
    }

    /// Power the target and release it from reset so it runs its program
    pub fn start_device(&mut self) -> Result<()> {
        log::debug!("icsp: starting target");
        self.driver.open()?;
        self.state.power = true;
        self.commit()?;
        self.state.reset = true;
        self.commit()
    }

    /// Hold the target in reset and remove power
    pub fn stop_device(&mut self) -> Result<()> {
        log::debug!("icsp: stopping target");
        self.power_down()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::programmer::recording::{Event, RecordingDriver};

    /// Data levels at each rising clock edge
    fn clocked_bits(commits: &[SignalState]) -> Vec<bool> {
        let mut bits = Vec::new();
        let mut clock = false;
        for s in commits {
            if s.clock && !clock {
                bits.push(s.data);
            }
            clock = s.clock;
        }
        bits
    }

    fn opened() -> Sequencer<RecordingDriver> {
        let mut driver = RecordingDriver::new();
        driver.open().unwrap();
        driver.clear();
        Sequencer::new(driver)
    }

    #[test]
    fn test_execute_bit_order() {
        let mut seq = opened();
        seq.execute(Command::new(0x80_0001)).unwrap();

        let bits = clocked_bits(&seq.driver().commits());
        assert_eq!(bits.len(), 28);
        assert!(bits[..4].iter().all(|b| !b));
        // LSB first
        assert!(bits[4]);
        assert!(bits[5..27].iter().all(|b| !b));
        assert!(bits[27]);
        // Three commits per bit
        assert_eq!(seq.driver().commits().len(), 28 * 3);
    }

    #[test]
    fn test_first_command_padding() {
        let mut seq = opened();
        seq.execute(Command::first(0)).unwrap();
        assert_eq!(clocked_bits(&seq.driver().commits()).len(), 4 + 5 + 24);
    }

    #[test]
    fn test_read_register_lsb_first() {
        let mut seq = opened();
        // 0x8005 = bits 0, 2 and 15
        let mut input = vec![false; 16];
        input[0] = true;
        input[2] = true;
        input[15] = true;
        seq.driver_mut().input = input.into();

        assert_eq!(seq.read_register().unwrap(), 0x8005);
        assert_eq!(seq.driver().reads(), 16);

        let bits = clocked_bits(&seq.driver().commits());
        assert_eq!(bits.len(), 12 + 16);
        assert!(bits[0]);
        assert!(bits[1..12].iter().all(|b| !b));
        // PGD released during the shift
        assert!(bits[12..].iter().all(|b| *b));
    }

    #[test]
    fn test_enter_session_sequence() {
        let mut seq = Sequencer::new(RecordingDriver::new());
        seq.enter_session().unwrap();

        let events = &seq.driver().events;
        assert_eq!(events[0], Event::Open);

        let commits = seq.driver().commits();
        assert!(commits[0].power);
        // MCLR pulse before the key
        let resets: Vec<bool> = commits[1..5].iter().map(|s| s.reset).collect();
        assert_eq!(resets, [false, false, true, false]);

        let key_bits = clocked_bits(&commits);
        assert_eq!(key_bits.len(), 32);
        let key = key_bits.iter().fold(0u32, |acc, &b| (acc << 1) | b as u32);
        assert_eq!(key, ENTRY_KEY);

        let delays: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                Event::Delay(us) => Some(*us),
                _ => None,
            })
            .collect();
        assert_eq!(delays, [5_000, 30_000]);

        let last = commits.last().unwrap();
        assert!(last.reset && last.power && !last.data);
    }

    #[test]
    fn test_leave_session() {
        let mut seq = Sequencer::new(RecordingDriver::new());
        seq.enter_session().unwrap();
        seq.driver_mut().clear();
        seq.leave_session().unwrap();

        let commits = seq.driver().commits();
        assert!(!commits[0].reset && commits[0].power);
        assert!(!commits[1].reset && !commits[1].power);
        assert_eq!(*seq.driver().events.last().unwrap(), Event::Close);
    }

    #[test]
    fn test_leave_session_closes_after_line_failure() {
        let mut seq = Sequencer::new(RecordingDriver::failing_at(103));
        seq.enter_session().unwrap();
        assert_eq!(seq.leave_session(), Err(Error::Transport));
        assert!(!seq.driver().is_open());
        assert!(!seq.signals().power);
    }

    #[test]
    fn test_start_stop_device() {
        let mut seq = Sequencer::new(RecordingDriver::new());
        seq.start_device().unwrap();
        assert!(seq.signals().reset && seq.signals().power);
        seq.stop_device().unwrap();
        assert!(!seq.signals().reset && !seq.signals().power);
        assert_eq!(*seq.driver().events.last().unwrap(), Event::Close);
    }
}
