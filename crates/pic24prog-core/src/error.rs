//! Error types for pic24prog-core
//!
//! Device-level failures are reported through a small `Copy` error type so
//! they can be passed around freely by the engine and the drivers.

use core::fmt;

/// Details about an operation attempted in the wrong state or with bad input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionViolation {
    /// A device operation was attempted outside of an ICSP session
    SessionNotOpen,
    /// `begin()` was called while a session was already open
    SessionAlreadyOpen,
    /// The target was started and must be stopped first
    DeviceRunning,
    /// The target was not started
    DeviceNotRunning,
    /// Block read size is not a positive multiple of 4 or exceeds the maximum
    BlockSize {
        /// Requested number of words
        words: usize,
    },
    /// Word slice has the wrong length for the operation
    BlockLength {
        /// Number of words the operation needs
        expected: usize,
        /// Number of words supplied
        actual: usize,
    },
}

/// Core error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Engine errors
    /// Operation not permitted in the current state
    Precondition(PreconditionViolation),
    /// The device never reported write completion
    WriteTimeout {
        /// Device address of the block or word being written
        addr: u32,
        /// Number of completion polls performed
        attempts: u32,
    },

    // Chip errors
    /// Device id not present in the chip catalog
    UnknownDevice {
        /// Device id read from the target
        device_id: u16,
        /// Revision id read from the target
        revision_id: u16,
    },

    // Line driver errors
    /// Line driver was used before `open()`
    DriverNotOpen,
    /// Line driver was opened twice
    DriverAlreadyOpen,
    /// Line driver failed to transfer a signal state
    Transport,

    /// Read-back data did not match the expected contents
    VerifyError,
}

impl From<PreconditionViolation> for Error {
    fn from(v: PreconditionViolation) -> Self {
        Self::Precondition(v)
    }
}

impl fmt::Display for PreconditionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotOpen => write!(f, "no ICSP session is open"),
            Self::SessionAlreadyOpen => write!(f, "an ICSP session is already open"),
            Self::DeviceRunning => write!(f, "target is running"),
            Self::DeviceNotRunning => write!(f, "target is not running"),
            Self::BlockSize { words } => write!(
                f,
                "invalid block size {}: must be a positive multiple of 4 up to 64",
                words
            ),
            Self::BlockLength { expected, actual } => {
                write!(f, "expected {} words, got {}", expected, actual)
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precondition(v) => write!(f, "precondition violated: {}", v),
            Self::WriteTimeout { addr, attempts } => write!(
                f,
                "write at 0x{:06X} did not complete after {} polls",
                addr, attempts
            ),
            Self::UnknownDevice {
                device_id,
                revision_id,
            } => write!(
                f,
                "unknown device id 0x{:04X} (revision 0x{:04X})",
                device_id, revision_id
            ),
            Self::DriverNotOpen => write!(f, "line driver is not open"),
            Self::DriverAlreadyOpen => write!(f, "line driver is already open"),
            Self::Transport => write!(f, "line driver transfer failed"),
            Self::VerifyError => write!(f, "verify failed: data mismatch"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
