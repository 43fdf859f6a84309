//! PIC24/dsPIC33 ICSP programming engine
//!
//! Implements the plain ICSP programming method: every memory
//! operation is a fixed script of instructions executed one by one on the
//! target CPU through SIX, with results extracted through the VISI register.
//!
//! Addresses taken by this module are device (table pointer) addresses, two
//! units per instruction word.

use crate::error::{Error, PreconditionViolation, Result};
use crate::icsp::opcodes::{self, mov_lit16, mov_to_visi};
use crate::icsp::{pack, unpack, Command, Sequencer};
use crate::programmer::LineDriver;

/// Maximum words transferred by one block read
pub const MAX_READ_WORDS: usize = 64;
/// Words programmed by one row write
pub const ROW_WORDS: usize = 64;
/// Number of configuration words
pub const CONFIG_WORDS: usize = 12;
/// Completion polls before a write is declared failed
pub const POLL_ATTEMPTS: u32 = 20;

/// Device id and revision registers
pub const DEVICE_ID_ADDR: u32 = 0xFF_0000;
/// First configuration register
pub const CONFIG_ADDR: u32 = 0xF8_0000;

/// NVMCON bit reporting a finished write
const WRITE_COMPLETE: u16 = 0x8000;

const ROW_SETTLE_US: u32 = 2_000;
const CONFIG_SETTLE_US: u32 = 25_000;
const ERASE_SETTLE_US: u32 = 330_000;

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Driver released, target unpowered
    Closed,
    /// Target held in ICSP mode
    Open,
    /// Target powered and executing its own program
    Running,
}

/// Device and revision id read from the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    /// Device id (DEVID)
    pub device: u16,
    /// Silicon revision (DEVREV)
    pub revision: u16,
}

/// ICSP programming engine for one target
pub struct Pic24Programmer<D: LineDriver> {
    seq: Sequencer<D>,
    state: SessionState,
}

impl<D: LineDriver> Pic24Programmer<D> {
    /// Create an engine around a line driver
    pub fn new(driver: D) -> Self {
        Self {
            seq: Sequencer::new(driver),
            state: SessionState::Closed,
        }
    }

    /// Current engine state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get a reference to the line driver
    pub fn driver(&self) -> &D {
        self.seq.driver()
    }

    /// Get a mutable reference to the line driver
    pub fn driver_mut(&mut self) -> &mut D {
        self.seq.driver_mut()
    }

    /// Consume the engine, returning the line driver
    pub fn into_driver(self) -> D {
        self.seq.into_driver()
    }

    // =========================================================================
    // Session control
    // =========================================================================

    /// Enter ICSP mode
    pub fn begin(&mut self) -> Result<()> {
        self.require(SessionState::Closed)?;

        let entered = self
            .seq
            .enter_session()
            .and_then(|()| self.seq.execute(Command::first(opcodes::NOP)));
        if let Err(e) = entered {
            log::warn!("pic24: ICSP entry failed: {}", e);
            if let Err(e) = self.seq.leave_session() {
                log::debug!("pic24: cleanup after failed entry: {}", e);
            }
            return Err(e);
        }
        self.state = SessionState::Open;
        Ok(())
    }

    /// Leave ICSP mode
    pub fn end(&mut self) -> Result<()> {
        self.require(SessionState::Open)?;
        self.state = SessionState::Closed;
        self.seq.leave_session()
    }

    /// Power the target and let it run
    pub fn start_device(&mut self) -> Result<()> {
        self.require(SessionState::Closed)?;
        self.seq.start_device()?;
        self.state = SessionState::Running;
        Ok(())
    }

    /// Stop a running target
    pub fn stop_device(&mut self) -> Result<()> {
        self.require(SessionState::Running)?;
        self.state = SessionState::Closed;
        self.seq.stop_device()
    }

    /// Stop and restart a running target
    pub fn reset_device(&mut self) -> Result<()> {
        self.stop_device()?;
        self.start_device()
    }

    fn require(&self, wanted: SessionState) -> Result<()> {
        if self.state == wanted {
            return Ok(());
        }
        let violation = match (wanted, self.state) {
            (_, SessionState::Running) => PreconditionViolation::DeviceRunning,
            (SessionState::Closed, SessionState::Open) => PreconditionViolation::SessionAlreadyOpen,
            (SessionState::Running, _) => PreconditionViolation::DeviceNotRunning,
            _ => PreconditionViolation::SessionNotOpen,
        };
        Err(violation.into())
    }

    // =========================================================================
    // Command helpers
    // =========================================================================

    fn six(&mut self, opcode: u32) -> Result<()> {
        self.seq.execute(Command::new(opcode))
    }

    fn six_all(&mut self, opcodes: &[u32]) -> Result<()> {
        for &op in opcodes {
            self.six(op)?;
        }
        Ok(())
    }

    fn nops(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.six(opcodes::NOP)?;
        }
        Ok(())
    }

    /// Point TBLPAG at the upper address byte and `wd` at the lower 16 bits
    fn load_table_pointer(&mut self, addr: u32, wd: u8) -> Result<()> {
        self.six(mov_lit16(((addr >> 16) & 0xFF) as u16, 0))?;
        self.six(opcodes::MOV_W0_TBLPAG)?;
        self.six(mov_lit16((addr & 0xFFFF) as u16, wd))
    }

    /// Set the WR bit and give the flash controller time to start
    fn start_nvm_operation(&mut self, settle_us: u32) -> Result<()> {
        self.six(opcodes::BSET_NVMCON_WR)?;
        self.nops(4)?;
        self.seq.driver_mut().delay_us(settle_us);
        Ok(())
    }

    /// Poll NVMCON until the completion bit is set
    fn wait_write_complete(&mut self, addr: u32) -> Result<()> {
        for attempt in 1..=POLL_ATTEMPTS {
            self.six(opcodes::MOV_NVMCON_W0)?;
            self.six(opcodes::MOV_W0_VISI)?;
            self.six(opcodes::NOP)?;
            let nvmcon = self.seq.read_register()?;
            self.six(opcodes::GOTO_0X200)?;
            self.six(opcodes::NOP)?;

            if nvmcon & WRITE_COMPLETE != 0 {
                log::trace!("pic24: write at 0x{:06X} done after {} polls", addr, attempt);
                return Ok(());
            }
        }

        log::warn!(
            "pic24: write at 0x{:06X} not complete after {} polls",
            addr,
            POLL_ATTEMPTS
        );
        Err(Error::WriteTimeout {
            addr,
            attempts: POLL_ATTEMPTS,
        })
    }

    // =========================================================================
    // Memory operations
    // =========================================================================

    /// Read the device and revision id
    pub fn read_device_id(&mut self) -> Result<DeviceId> {
        let words = self.read_memory(DEVICE_ID_ADDR, 4)?;
        let id = DeviceId {
            device: words[0] as u16,
            revision: words[1] as u16,
        };
        log::debug!(
            "pic24: DEVID=0x{:04X} DEVREV=0x{:04X}",
            id.device,
            id.revision
        );
        Ok(id)
    }

    /// Read `count` instruction words starting at `addr`
    ///
    /// `count` must be a positive multiple of 4 no larger than 64.
    pub fn read_memory(&mut self, addr: u32, count: usize) -> Result<Vec<u32>> {
        self.require(SessionState::Open)?;
        if count == 0 || count % 4 != 0 || count > MAX_READ_WORDS {
            return Err(PreconditionViolation::BlockSize { words: count }.into());
        }
        log::debug!("pic24: reading {} words at 0x{:06X}", count, addr);

        self.six_all(&[opcodes::GOTO_0X200, opcodes::GOTO_0X200, opcodes::NOP])?;
        self.load_table_pointer(addr, 6)?;

        let mut words = Vec::with_capacity(count);
        for _ in 0..count / 4 {
            self.six(opcodes::CLR_W7)?;
            self.six(opcodes::NOP)?;
            for _ in 0..2 {
                for op in opcodes::READ_PAIR {
                    self.six(op)?;
                    self.nops(2)?;
                }
            }

            let mut regs = [0u16; 6];
            for (i, reg) in regs.iter_mut().enumerate() {
                self.six(mov_to_visi(i as u8))?;
                self.six(opcodes::NOP)?;
                *reg = self.seq.read_register()?;
                self.six(opcodes::NOP)?;
            }
            words.extend_from_slice(&unpack(&regs));
        }

        self.six(opcodes::GOTO_0X200)?;
        self.six(opcodes::NOP)?;
        Ok(words)
    }

    /// Program one 64-word row starting at `addr`
    pub fn write_memory(&mut self, addr: u32, words: &[u32]) -> Result<()> {
        self.require(SessionState::Open)?;
        if words.len() != ROW_WORDS {
            return Err(PreconditionViolation::BlockLength {
                expected: ROW_WORDS,
                actual: words.len(),
            }
            .into());
        }
        log::debug!("pic24: writing row at 0x{:06X}", addr);

        self.six_all(&[
            opcodes::GOTO_0X200,
            opcodes::GOTO_0X200,
            mov_lit16(opcodes::NVMCON_ROW_PROGRAM, 10),
            opcodes::MOV_W10_NVMCON,
        ])?;
        self.load_table_pointer(addr, 7)?;

        for group in words.chunks_exact(4) {
            let regs = pack(&[group[0], group[1], group[2], group[3]]);
            for (i, &reg) in regs.iter().enumerate() {
                self.six(mov_lit16(reg, i as u8))?;
            }
            self.six(opcodes::CLR_W6)?;
            self.six(opcodes::NOP)?;
            for _ in 0..2 {
                for op in opcodes::WRITE_PAIR {
                    self.six(op)?;
                    self.nops(2)?;
                }
            }
        }

        self.start_nvm_operation(ROW_SETTLE_US)?;
        self.wait_write_complete(addr)
    }

    /// Read the configuration words
    pub fn read_config_memory(&mut self) -> Result<Vec<u32>> {
        self.read_memory(CONFIG_ADDR, CONFIG_WORDS)
    }

    /// Program the configuration words, one at a time
    ///
    /// Only the low 16 bits of each word are significant.
    pub fn write_config_memory(&mut self, words: &[u32]) -> Result<()> {
        self.require(SessionState::Open)?;
        if words.len() != CONFIG_WORDS {
            return Err(PreconditionViolation::BlockLength {
                expected: CONFIG_WORDS,
                actual: words.len(),
            }
            .into());
        }
        log::debug!("pic24: writing {} configuration words", CONFIG_WORDS);

        self.six_all(&[
            opcodes::GOTO_0X200,
            opcodes::GOTO_0X200,
            opcodes::NOP,
            mov_lit16(0, 7),
            mov_lit16(opcodes::NVMCON_WORD_PROGRAM, 10),
            opcodes::MOV_W10_NVMCON,
            mov_lit16((CONFIG_ADDR >> 16) as u16, 0),
            opcodes::MOV_W0_TBLPAG,
        ])?;

        for (i, &word) in words.iter().enumerate() {
            self.six(mov_lit16((word & 0xFFFF) as u16, 0))?;
            self.six(opcodes::TBLWTL_W0_W7PP)?;
            self.nops(2)?;
            self.start_nvm_operation(CONFIG_SETTLE_US)?;
            self.wait_write_complete(CONFIG_ADDR + 2 * i as u32)?;
        }
        Ok(())
    }

    /// Erase all program memory
    ///
    /// The erase is not polled; the fixed settle delay covers it.
    pub fn erase_chip(&mut self) -> Result<()> {
        self.require(SessionState::Open)?;
        log::debug!("pic24: chip erase");

        self.six_all(&[
            opcodes::GOTO_0X200,
            opcodes::GOTO_0X200,
            opcodes::NOP,
            mov_lit16(opcodes::NVMCON_CHIP_ERASE, 10),
            opcodes::MOV_W10_NVMCON,
        ])?;
        self.start_nvm_operation(ERASE_SETTLE_US)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programmer::recording::{Event, RecordingDriver};

    /// Opcodes of the SIX commands in a commit stream with no REGOUTs
    fn six_opcodes(driver: &RecordingDriver) -> Vec<u32> {
        let mut bits = Vec::new();
        let mut clock = false;
        for s in driver.commits() {
            if s.clock && !clock {
                bits.push(s.data);
            }
            clock = s.clock;
        }
        assert_eq!(bits.len() % 28, 0);
        bits.chunks(28)
            .map(|c| {
                c[4..]
                    .iter()
                    .enumerate()
                    .fold(0u32, |acc, (i, &b)| acc | (b as u32) << i)
            })
            .collect()
    }

    fn open_session(idle_input: bool) -> Pic24Programmer<RecordingDriver> {
        let mut prog = Pic24Programmer::new(RecordingDriver::with_idle_input(idle_input));
        prog.begin().unwrap();
        prog.driver_mut().clear();
        prog
    }

    #[test]
    fn test_operations_require_session() {
        let mut prog = Pic24Programmer::new(RecordingDriver::new());
        assert_eq!(
            prog.read_memory(0, 4),
            Err(Error::Precondition(PreconditionViolation::SessionNotOpen))
        );
        assert_eq!(
            prog.erase_chip(),
            Err(Error::Precondition(PreconditionViolation::SessionNotOpen))
        );
        assert_eq!(
            prog.end(),
            Err(Error::Precondition(PreconditionViolation::SessionNotOpen))
        );
        assert!(prog.driver().events.is_empty());
    }

    #[test]
    fn test_begin_twice() {
        let mut prog = open_session(false);
        assert_eq!(
            prog.begin(),
            Err(Error::Precondition(PreconditionViolation::SessionAlreadyOpen))
        );
        prog.end().unwrap();
        assert_eq!(prog.state(), SessionState::Closed);
        prog.begin().unwrap();
    }

    #[test]
    fn test_session_and_running_exclusive() {
        let mut prog = Pic24Programmer::new(RecordingDriver::new());
        prog.start_device().unwrap();
        assert_eq!(
            prog.begin(),
            Err(Error::Precondition(PreconditionViolation::DeviceRunning))
        );
        prog.reset_device().unwrap();
        prog.stop_device().unwrap();
        assert_eq!(
            prog.stop_device(),
            Err(Error::Precondition(PreconditionViolation::DeviceNotRunning))
        );
    }

    #[test]
    fn test_read_block_sizes() {
        let mut prog = open_session(false);
        for bad in [0, 5, 68, 130] {
            assert_eq!(
                prog.read_memory(0, bad),
                Err(Error::Precondition(PreconditionViolation::BlockSize {
                    words: bad
                }))
            );
        }
        assert!(prog.driver().events.is_empty());

        let words = prog.read_memory(0, 64).unwrap();
        assert_eq!(words.len(), 64);
        // Six REGOUTs of 16 bits per group of four words
        assert_eq!(prog.driver().reads(), 16 * 6 * 16);
    }

    #[test]
    fn test_read_memory_unpacks_registers() {
        let mut prog = open_session(true);
        let words = prog.read_memory(0x1000, 4).unwrap();
        assert_eq!(words, vec![0xFF_FFFF; 4]);
    }

    #[test]
    fn test_write_wrong_length() {
        let mut prog = open_session(true);
        assert_eq!(
            prog.write_memory(0, &[0; 63]),
            Err(Error::Precondition(PreconditionViolation::BlockLength {
                expected: 64,
                actual: 63
            }))
        );
        assert_eq!(
            prog.write_config_memory(&[0; 4]),
            Err(Error::Precondition(PreconditionViolation::BlockLength {
                expected: 12,
                actual: 4
            }))
        );
    }

    #[test]
    fn test_write_times_out_after_twenty_polls() {
        let mut prog = open_session(false);
        let words: Vec<u32> = (0..64).collect();
        assert_eq!(
            prog.write_memory(0x400, &words),
            Err(Error::WriteTimeout {
                addr: 0x400,
                attempts: 20
            })
        );
        assert_eq!(prog.driver().reads(), 20 * 16);
        assert!(prog.driver().events.contains(&Event::Delay(2_000)));
    }

    #[test]
    fn test_write_completes_on_first_poll() {
        let mut prog = open_session(true);
        prog.write_memory(0, &[0xFF_FFFF; 64]).unwrap();
        assert_eq!(prog.driver().reads(), 16);
    }

    #[test]
    fn test_write_config_polls_each_word() {
        let mut prog = open_session(true);
        prog.write_config_memory(&[0xFFFF; 12]).unwrap();
        assert_eq!(prog.driver().reads(), 12 * 16);
        let settles = prog
            .driver()
            .events
            .iter()
            .filter(|e| **e == Event::Delay(25_000))
            .count();
        assert_eq!(settles, 12);
    }

    #[test]
    fn test_erase_script() {
        let mut prog = open_session(false);
        prog.erase_chip().unwrap();
        assert_eq!(
            six_opcodes(prog.driver()),
            vec![
                0x04_0200, 0x04_0200, 0x00_0000, 0x24_04FA, 0x88_3B0A, 0xA8_E761, 0, 0, 0, 0
            ]
        );
        assert_eq!(prog.driver().reads(), 0);
        assert_eq!(*prog.driver().events.last().unwrap(), Event::Delay(330_000));
    }

    #[test]
    fn test_failed_first_command_closes_session() {
        // Entry takes 103 commits, so commit 110 falls inside the first SIX
        let mut prog = Pic24Programmer::new(RecordingDriver::failing_at(110));
        assert_eq!(prog.begin(), Err(Error::Transport));
        assert_eq!(prog.state(), SessionState::Closed);
        assert!(!prog.driver().is_open());
        assert_eq!(*prog.driver().events.last().unwrap(), Event::Close);

        prog.start_device().unwrap();
        prog.stop_device().unwrap();
        prog.begin().unwrap();
        assert_eq!(prog.state(), SessionState::Open);
    }

    #[test]
    fn test_failed_entry_key_closes_session() {
        let mut prog = Pic24Programmer::new(RecordingDriver::failing_at(20));
        assert_eq!(prog.begin(), Err(Error::Transport));
        assert_eq!(prog.state(), SessionState::Closed);
        assert!(!prog.driver().is_open());
    }

    #[test]
    fn test_begin_sends_first_nop() {
        let mut prog = Pic24Programmer::new(RecordingDriver::new());
        prog.begin().unwrap();
        let commits = prog.driver().commits();
        let mut edges = 0;
        let mut clock = false;
        for s in commits {
            if s.clock && !clock {
                edges += 1;
            }
            clock = s.clock;
        }
        // Entry key plus the padded first SIX
        assert_eq!(edges, 32 + 4 + 5 + 24);
    }
}
