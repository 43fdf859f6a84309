//! Output line state handed to a line driver on every commit

/// Snapshot of the ICSP lines
///
/// The sequencer owns one of these and mutates it between commits; the
/// driver only ever sees it by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalState {
    /// MCLR line (high = released)
    pub reset: bool,
    /// VDD line (high = target powered)
    pub power: bool,
    /// PGD output level
    pub data: bool,
    /// PGC output level
    pub clock: bool,
    /// Last PGD level sampled from the target
    pub input: bool,
}

impl SignalState {
    /// All lines low, nothing sampled yet
    pub const fn new() -> Self {
        Self {
            reset: false,
            power: false,
            data: false,
            clock: false,
            input: false,
        }
    }
}
