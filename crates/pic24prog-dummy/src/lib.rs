//! pic24prog-dummy - Simulated dsPIC33 target for testing
//!
//! This crate provides a line driver that behaves like a dsPIC33 attached to
//! an ICSP adapter. It decodes the bit stream on PGC/PGD (entry key, SIX and
//! REGOUT control codes), executes the instructions used by the programming
//! scripts and keeps program memory, configuration words and the device id
//! in memory. It's useful for testing and development without real hardware.
//!
//! Supported instructions:
//! - `MOV #lit16, Wd`, `MOV Ws, f`, `MOV f, Wd`, `CLR Wd`
//! - `TBLRDL`/`TBLRDH`/`TBLWTL`/`TBLWTH` in word and byte form with
//!   `Wn`, `[Wn]`, `[Wn++]`, `[Wn--]`, `[++Wn]` and `[--Wn]` addressing
//! - `BSET f, #b` (used to start flash operations through NVMCON)
//! - `GOTO` and `NOP` (ignored)

use std::collections::HashMap;

use pic24prog_core::error::{Error, Result};
use pic24prog_core::icsp::{opcodes, ENTRY_KEY};
use pic24prog_core::programmer::{LineDriver, SignalState};
use pic24prog_core::protocol::pic24::{CONFIG_ADDR, CONFIG_WORDS, DEVICE_ID_ADDR};

/// Value of an erased program word
const ERASED_WORD: u32 = 0xFF_FFFF;
/// Start of the programming executive, not touched by chip erase
const PE_BASE: u32 = 0x80_0000;
/// Size of the emulated data space (covers the W registers and all SFRs used)
const DATA_SPACE: usize = 0x800;

/// Configuration for the simulated target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// DEVID register
    pub device_id: u16,
    /// DEVREV register
    pub revision_id: u16,
    /// Whether flash operations ever report completion
    pub completes_writes: bool,
    /// Initial configuration words
    pub config_words: [u16; CONFIG_WORDS],
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            device_id: 0x0800,   // dsPIC33FJ12MC201
            revision_id: 0x3002, // A3
            completes_writes: true,
            config_words: [0xFFFF; CONFIG_WORDS],
        }
    }
}

fn parse_hex_u16(key: &str, value: &str) -> std::result::Result<u16, String> {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|_| format!("Invalid {} value: {}", key, value))
}

/// Parse programmer options from a list of key-value pairs
///
/// - `devid=<hex>` - DEVID register (default: 0x0800)
/// - `revid=<hex>` - DEVREV register (default: 0x3002)
/// - `stall=1` - never report completion of flash operations
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<DummyConfig, String> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "devid" => config.device_id = parse_hex_u16(key, value)?,
            "revid" => config.revision_id = parse_hex_u16(key, value)?,
            "stall" => {
                config.completes_writes = match *value {
                    "1" | "yes" | "true" => false,
                    "0" | "no" | "false" => true,
                    _ => return Err(format!("Invalid stall value: {}", value)),
                }
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

/// Position in the ICSP bit stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Not in programming mode
    Idle,
    /// MCLR low, shifting in the entry key
    Key { bits: u32, value: u32 },
    /// Key accepted, waiting for MCLR release
    KeyAccepted,
    /// Shifting in a 4-bit control code
    Control { bits: u32, code: u32 },
    /// Extra clocks of the first SIX
    FirstPad { left: u32 },
    /// Shifting in a SIX opcode
    Six { bits: u32, opcode: u32 },
    /// Clocks between the REGOUT code and the data
    RegoutIdle { left: u32 },
    /// Shifting out VISI
    RegoutShift { bits: u32, value: u16 },
}

/// Instruction operand after addressing mode resolution
#[derive(Debug, Clone, Copy)]
enum Operand {
    Register(u32),
    Memory(u16),
}

/// Simulated dsPIC33 target
pub struct DummyPic {
    config: DummyConfig,
    program: HashMap<u32, u32>,
    config_words: [u16; CONFIG_WORDS],
    latches: HashMap<u32, u32>,
    data: Vec<u8>,
    open: bool,
    lines: SignalState,
    phase: Phase,
    first_pending: bool,
    output: bool,
    nvm_polls: u32,
    nvm_operations: u32,
    elapsed_us: u64,
}

impl DummyPic {
    /// Create a new simulated target with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let config_words = config.config_words;
        Self {
            config,
            program: HashMap::new(),
            config_words,
            latches: HashMap::new(),
            data: vec![0; DATA_SPACE],
            open: false,
            lines: SignalState::new(),
            phase: Phase::Idle,
            first_pending: false,
            output: false,
            nvm_polls: 0,
            nvm_operations: 0,
            elapsed_us: 0,
        }
    }

    /// Create a new simulated target with default configuration (dsPIC33FJ12MC201)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Program word at device address `addr`
    pub fn program_word(&self, addr: u32) -> u32 {
        self.program.get(&(addr & !1)).copied().unwrap_or(ERASED_WORD)
    }

    /// Preload a program word at device address `addr`
    pub fn set_program_word(&mut self, addr: u32, value: u32) {
        self.program.insert(addr & !1, value & ERASED_WORD);
    }

    /// Configuration word `index`
    pub fn config_word(&self, index: usize) -> u16 {
        self.config_words[index]
    }

    /// Number of times NVMCON was read back
    pub fn nvm_polls(&self) -> u32 {
        self.nvm_polls
    }

    /// Number of flash operations started
    pub fn nvm_operations(&self) -> u32 {
        self.nvm_operations
    }

    /// Total delay requested by the host
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    /// Whether the target is in ICSP mode
    pub fn in_icsp(&self) -> bool {
        !matches!(
            self.phase,
            Phase::Idle | Phase::Key { .. } | Phase::KeyAccepted
        )
    }

    /// Whether the target is powered, out of reset and running its program
    pub fn is_running(&self) -> bool {
        self.lines.power && self.lines.reset && self.phase == Phase::Idle
    }

    // =========================================================================
    // Bit stream decoding
    // =========================================================================

    fn reset_cpu(&mut self) {
        self.data.fill(0);
        self.latches.clear();
    }

    fn mclr_falling(&mut self) {
        self.phase = match self.phase {
            Phase::Idle => Phase::Key { bits: 0, value: 0 },
            _ => {
                log::debug!("dummy: left ICSP mode");
                self.reset_cpu();
                Phase::Idle
            }
        };
    }

    fn mclr_rising(&mut self) {
        self.phase = match self.phase {
            Phase::KeyAccepted => {
                log::debug!("dummy: entered ICSP mode");
                self.reset_cpu();
                self.first_pending = true;
                Phase::Control { bits: 0, code: 0 }
            }
            Phase::Key { bits, .. } => {
                log::warn!("dummy: MCLR released after {} key bits", bits);
                Phase::Idle
            }
            other => other,
        };
    }

    fn clock_rising(&mut self, bit: bool) {
        let b = bit as u32;
        self.phase = match self.phase {
            Phase::Idle | Phase::KeyAccepted => self.phase,
            Phase::Key { bits, value } => {
                let value = (value << 1) | b;
                if bits + 1 < 32 {
                    Phase::Key {
                        bits: bits + 1,
                        value,
                    }
                } else if value == ENTRY_KEY {
                    Phase::KeyAccepted
                } else {
                    log::warn!("dummy: wrong entry key 0x{:08X}", value);
                    Phase::Idle
                }
            }
            Phase::Control { bits, code } => {
                let code = code | (b << bits);
                if bits + 1 < 4 {
                    Phase::Control {
                        bits: bits + 1,
                        code,
                    }
                } else {
                    match code {
                        0 if self.first_pending => {
                            self.first_pending = false;
                            Phase::FirstPad { left: 5 }
                        }
                        0 => Phase::Six { bits: 0, opcode: 0 },
                        1 => Phase::RegoutIdle { left: 8 },
                        _ => {
                            log::warn!("dummy: unknown control code {:#x}", code);
                            Phase::Control { bits: 0, code: 0 }
                        }
                    }
                }
            }
            Phase::FirstPad { left } => {
                if left > 1 {
                    Phase::FirstPad { left: left - 1 }
                } else {
                    Phase::Six { bits: 0, opcode: 0 }
                }
            }
            Phase::Six { bits, opcode } => {
                let opcode = opcode | (b << bits);
                if bits + 1 < 24 {
                    Phase::Six {
                        bits: bits + 1,
                        opcode,
                    }
                } else {
                    self.execute(opcode);
                    Phase::Control { bits: 0, code: 0 }
                }
            }
            Phase::RegoutIdle { left } => {
                if left > 1 {
                    Phase::RegoutIdle { left: left - 1 }
                } else {
                    Phase::RegoutShift {
                        bits: 0,
                        value: self.read_word(opcodes::VISI),
                    }
                }
            }
            Phase::RegoutShift { bits, value } => {
                self.output = (value >> bits) & 1 != 0;
                if bits + 1 < 16 {
                    Phase::RegoutShift {
                        bits: bits + 1,
                        value,
                    }
                } else {
                    Phase::Control { bits: 0, code: 0 }
                }
            }
        };
    }

    // =========================================================================
    // Data space
    // =========================================================================

    fn read_word(&self, addr: u16) -> u16 {
        let a = (addr & !1) as usize;
        match self.data.get(a..a + 2) {
            Some(b) => u16::from_le_bytes([b[0], b[1]]),
            None => {
                log::warn!("dummy: read outside data space at 0x{:04X}", addr);
                0
            }
        }
    }

    fn write_word(&mut self, addr: u16, value: u16) {
        let a = (addr & !1) as usize;
        match self.data.get_mut(a..a + 2) {
            Some(b) => b.copy_from_slice(&value.to_le_bytes()),
            None => log::warn!("dummy: write outside data space at 0x{:04X}", addr),
        }
    }

    fn read_byte(&self, addr: u16) -> u8 {
        self.data.get(addr as usize).copied().unwrap_or(0)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        if let Some(b) = self.data.get_mut(addr as usize) {
            *b = value;
        }
    }

    fn w(&self, reg: u32) -> u16 {
        self.read_word((reg * 2) as u16)
    }

    fn set_w(&mut self, reg: u32, value: u16) {
        self.write_word((reg * 2) as u16, value)
    }

    fn resolve(&mut self, mode: u32, reg: u32, step: u16) -> Operand {
        let w = self.w(reg);
        match mode {
            0 => Operand::Register(reg),
            1 => Operand::Memory(w),
            2 => {
                self.set_w(reg, w.wrapping_sub(step));
                Operand::Memory(w)
            }
            3 => {
                self.set_w(reg, w.wrapping_add(step));
                Operand::Memory(w)
            }
            4 => {
                let a = w.wrapping_sub(step);
                self.set_w(reg, a);
                Operand::Memory(a)
            }
            5 => {
                let a = w.wrapping_add(step);
                self.set_w(reg, a);
                Operand::Memory(a)
            }
            _ => {
                log::warn!("dummy: unsupported addressing mode {}", mode);
                Operand::Memory(w)
            }
        }
    }

    fn load(&self, op: Operand, byte: bool) -> u16 {
        match (op, byte) {
            (Operand::Register(r), false) => self.w(r),
            (Operand::Register(r), true) => self.w(r) & 0xFF,
            (Operand::Memory(a), false) => self.read_word(a),
            (Operand::Memory(a), true) => u16::from(self.read_byte(a)),
        }
    }

    fn store(&mut self, op: Operand, value: u16, byte: bool) {
        match (op, byte) {
            (Operand::Register(r), false) => self.set_w(r, value),
            (Operand::Register(r), true) => {
                let w = self.w(r);
                self.set_w(r, (w & 0xFF00) | (value & 0xFF));
            }
            (Operand::Memory(a), false) => self.write_word(a, value),
            (Operand::Memory(a), true) => self.write_byte(a, value as u8),
        }
    }

    fn address(&self, op: Operand) -> u16 {
        match op {
            Operand::Register(r) => self.w(r),
            Operand::Memory(a) => a,
        }
    }

    // =========================================================================
    // Program space
    // =========================================================================

    fn table_address(&self, offset: u16) -> u32 {
        (u32::from(self.read_word(opcodes::TBLPAG) & 0xFF) << 16) | u32::from(offset)
    }

    fn config_index(addr: u32) -> Option<usize> {
        let end = CONFIG_ADDR + 2 * CONFIG_WORDS as u32;
        (CONFIG_ADDR..end)
            .contains(&addr)
            .then(|| ((addr - CONFIG_ADDR) / 2) as usize)
    }

    fn program_read(&self, addr: u32) -> u32 {
        let addr = addr & !1;
        if addr == DEVICE_ID_ADDR {
            return u32::from(self.config.device_id);
        }
        if addr == DEVICE_ID_ADDR + 2 {
            return u32::from(self.config.revision_id);
        }
        if let Some(i) = Self::config_index(addr) {
            return u32::from(self.config_words[i]);
        }
        self.program_word(addr)
    }

    fn table_read(&mut self, op: u32) {
        let high = op & 0x8000 != 0;
        let byte = op & 0x4000 != 0;
        let step = if byte { 1 } else { 2 };

        let src = self.resolve((op >> 4) & 7, op & 0xF, step);
        let pa = self.table_address(self.address(src));
        let word = self.program_read(pa);
        let odd = pa & 1 != 0;

        let value = match (high, byte) {
            (false, false) => word & 0xFFFF,
            (true, false) => (word >> 16) & 0xFF,
            (false, true) if odd => (word >> 8) & 0xFF,
            (false, true) => word & 0xFF,
            // Phantom byte
            (true, true) if odd => 0,
            (true, true) => (word >> 16) & 0xFF,
        };

        let dst = self.resolve((op >> 11) & 7, (op >> 7) & 0xF, step);
        self.store(dst, value as u16, byte);
    }

    fn table_write(&mut self, op: u32) {
        let high = op & 0x8000 != 0;
        let byte = op & 0x4000 != 0;
        let step = if byte { 1 } else { 2 };

        let src = self.resolve((op >> 4) & 7, op & 0xF, step);
        let value = u32::from(self.load(src, byte));
        let dst = self.resolve((op >> 11) & 7, (op >> 7) & 0xF, step);
        let pa = self.table_address(self.address(dst));
        let odd = pa & 1 != 0;

        let latch = self.latches.entry(pa & !1).or_insert(ERASED_WORD);
        *latch = match (high, byte) {
            (false, false) => (*latch & 0xFF_0000) | value,
            (true, false) => (*latch & 0xFFFF) | ((value & 0xFF) << 16),
            (false, true) if odd => (*latch & 0xFF_00FF) | (value << 8),
            (false, true) => (*latch & 0xFF_FF00) | value,
            (true, true) if odd => *latch,
            (true, true) => (*latch & 0xFFFF) | (value << 16),
        };
    }

    fn start_nvm_operation(&mut self) {
        self.nvm_operations += 1;
        if !self.config.completes_writes {
            log::debug!("dummy: flash operation stalled");
            return;
        }

        let nvmcon = self.read_word(opcodes::NVMCON) & !opcodes::NVMCON_WR;
        match nvmcon {
            opcodes::NVMCON_ROW_PROGRAM | opcodes::NVMCON_WORD_PROGRAM => {
                let latches: Vec<(u32, u32)> = self.latches.drain().collect();
                for (addr, value) in latches {
                    match Self::config_index(addr) {
                        Some(i) => self.config_words[i] = value as u16,
                        None => {
                            // Programming only clears bits
                            let word = self.program.entry(addr).or_insert(ERASED_WORD);
                            *word &= value;
                        }
                    }
                }
            }
            opcodes::NVMCON_CHIP_ERASE => {
                self.program.retain(|&addr, _| addr >= PE_BASE);
                self.latches.clear();
            }
            other => log::warn!("dummy: unsupported NVMCON value 0x{:04X}", other),
        }
    }

    // =========================================================================
    // Instruction execution
    // =========================================================================

    fn execute(&mut self, op: u32) {
        match op >> 16 {
            0x00 | 0x04 => {}
            0x20..=0x2F => {
                let lit = ((op >> 4) & 0xFFFF) as u16;
                self.set_w(op & 0xF, lit);
            }
            0x88..=0x8F => {
                let f = (((op >> 4) & 0x7FFF) << 1) as u16;
                let value = self.w(op & 0xF);
                self.write_word(f, value);
            }
            0x80..=0x87 => {
                let f = (((op >> 4) & 0x7FFF) << 1) as u16;
                let mut value = self.read_word(f);
                if f == opcodes::NVMCON {
                    self.nvm_polls += 1;
                    if !self.config.completes_writes {
                        value &= !opcodes::NVMCON_WR;
                    }
                }
                self.set_w(op & 0xF, value);
            }
            0xEB => self.set_w((op >> 7) & 0xF, 0),
            0xA8 => {
                let addr = (op & 0x1FFF) as u16;
                let bit = (op >> 13) & 7;
                let byte = self.read_byte(addr) | (1 << bit);
                self.write_byte(addr, byte);
                if addr == opcodes::NVMCON + 1 && bit == 7 {
                    self.start_nvm_operation();
                }
            }
            0xBA => self.table_read(op),
            0xBB => self.table_write(op),
            _ => log::warn!("dummy: unsupported instruction 0x{:06X}", op),
        }
    }
}

impl LineDriver for DummyPic {
    fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(Error::DriverAlreadyOpen);
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::DriverNotOpen);
        }
        self.open = false;
        Ok(())
    }

    fn commit(&mut self, state: &SignalState) -> Result<()> {
        if !self.open {
            return Err(Error::DriverNotOpen);
        }
        let prev = self.lines;
        self.lines = *state;

        if prev.power && !state.power {
            self.reset_cpu();
            self.phase = Phase::Idle;
        }
        if prev.reset && !state.reset {
            self.mclr_falling();
        } else if !prev.reset && state.reset {
            self.mclr_rising();
        }
        if !prev.clock && state.clock {
            self.clock_rising(state.data);
        }
        Ok(())
    }

    fn read_data(&mut self) -> Result<bool> {
        if !self.open {
            return Err(Error::DriverNotOpen);
        }
        Ok(self.output)
    }

    fn delay_us(&mut self, us: u32) {
        // No wall-clock delay needed for a simulated target
        self.elapsed_us += u64::from(us);
    }
}
