//! ICSP command structure

/// A single SIX (serial instruction execution) command
///
/// The first SIX after entering ICSP mode needs five extra clocks before the
/// opcode so the CPU can start executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// 24-bit instruction opcode (upper byte ignored)
    pub opcode: u32,
    /// First command of the session
    pub first: bool,
}

impl Command {
    /// Create a command for an ordinary instruction
    pub const fn new(opcode: u32) -> Self {
        Self {
            opcode: opcode & 0xFF_FFFF,
            first: false,
        }
    }

    /// Create the first command of a session
    pub const fn first(opcode: u32) -> Self {
        Self {
            opcode: opcode & 0xFF_FFFF,
            first: true,
        }
    }
}
