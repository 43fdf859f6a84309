//! CheapParport line driver
//!
//! The adapter wires the ICSP lines straight to the PC parallel port:
//!
//! | Port line  | ICSP line          |
//! |------------|--------------------|
//! | D0         | PGD (output)       |
//! | D1         | PGC                |
//! | D2         | MCLR               |
//! | ACK (S6)   | PGD (input)        |
//!
//! VDD is not switched by the adapter, so the power line is ignored.

use crate::error::{ParportError, Result};

use bitflags::bitflags;
use pic24prog_core::error::{Error as CoreError, Result as CoreResult};
use pic24prog_core::programmer::{LineDriver, SignalState};

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Default parallel port device
pub const DEFAULT_DEVICE: &str = "/dev/parport0";

bitflags! {
    /// Data register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DataLines: u8 {
        /// D0: PGD output
        const PGD = 0x01;
        /// D1: PGC
        const PGC = 0x02;
        /// D2: MCLR
        const MCLR = 0x04;
    }
}

bitflags! {
    /// Status register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusLines: u8 {
        /// ACK: PGD input
        const ACK = 0x40;
    }
}

impl DataLines {
    /// Data register value for a signal state
    pub fn from_signals(state: &SignalState) -> Self {
        let mut lines = Self::empty();
        lines.set(Self::PGD, state.data);
        lines.set(Self::PGC, state.clock);
        lines.set(Self::MCLR, state.reset);
        lines
    }
}

/// Linux ppdev ioctl constants
mod ioctl {
    use nix::{ioctl_none, ioctl_read, ioctl_write_ptr};

    // ppdev ioctl magic number
    const PP_IOCTL: u8 = b'p';

    const PPRSTATUS: u8 = 0x81;
    const PPWDATA: u8 = 0x86;
    const PPCLAIM: u8 = 0x8b;
    const PPRELEASE: u8 = 0x8c;

    ioctl_read!(pp_rstatus, PP_IOCTL, PPRSTATUS, u8);
    ioctl_write_ptr!(pp_wdata, PP_IOCTL, PPWDATA, u8);
    ioctl_none!(pp_claim, PP_IOCTL, PPCLAIM);
    ioctl_none!(pp_release, PP_IOCTL, PPRELEASE);
}

fn ioctl_error(op: &'static str, e: nix::Error) -> ParportError {
    ParportError::Ioctl {
        op,
        source: std::io::Error::from_raw_os_error(e as i32),
    }
}

/// Configuration for the CheapParport adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheapParportConfig {
    /// Device path (e.g., "/dev/parport0")
    pub device: String,
}

impl Default for CheapParportConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
        }
    }
}

impl CheapParportConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

/// Bit-banging ICSP adapter on a PC parallel port
///
/// The port is claimed in [`LineDriver::open`] and released in
/// [`LineDriver::close`], so one driver can serve several sessions.
pub struct CheapParport {
    config: CheapParportConfig,
    /// Claimed port, `None` while closed
    file: Option<File>,
}

impl CheapParport {
    /// Create a driver for the configured port without touching it
    pub fn new(config: CheapParportConfig) -> Self {
        Self { config, file: None }
    }

    /// Check that the configured device can be opened
    pub fn probe(config: CheapParportConfig) -> Result<Self> {
        Self::open_device(&config.device)?;
        log::debug!("parport: {} is accessible", config.device);
        Ok(Self::new(config))
    }

    /// Get the configuration
    pub fn config(&self) -> &CheapParportConfig {
        &self.config
    }

    fn open_device(path: &str) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| ParportError::OpenFailed {
                path: path.to_string(),
                source: e,
            })
    }

    fn claim(&mut self) -> Result<()> {
        let file = Self::open_device(&self.config.device)?;
        unsafe {
            ioctl::pp_claim(file.as_raw_fd()).map_err(|e| ioctl_error("PPCLAIM", e))?;
        }
        log::info!("parport: Claimed {}", self.config.device);
        self.file = Some(file);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        let file = self.file.take().ok_or(ParportError::NotClaimed)?;
        unsafe {
            ioctl::pp_release(file.as_raw_fd()).map_err(|e| ioctl_error("PPRELEASE", e))?;
        }
        log::debug!("parport: Released {}", self.config.device);
        Ok(())
    }

    fn write_data(&mut self, lines: DataLines) -> Result<()> {
        let file = self.file.as_ref().ok_or(ParportError::NotClaimed)?;
        let value = lines.bits();
        unsafe {
            ioctl::pp_wdata(file.as_raw_fd(), &value).map_err(|e| ioctl_error("PPWDATA", e))?;
        }
        Ok(())
    }

    fn read_status(&mut self) -> Result<StatusLines> {
        let file = self.file.as_ref().ok_or(ParportError::NotClaimed)?;
        let mut value = 0u8;
        unsafe {
            ioctl::pp_rstatus(file.as_raw_fd(), &mut value)
                .map_err(|e| ioctl_error("PPRSTATUS", e))?;
        }
        Ok(StatusLines::from_bits_truncate(value))
    }
}

fn report(e: ParportError) -> CoreError {
    log::error!("parport: {}", e);
    e.into()
}

impl LineDriver for CheapParport {
    fn open(&mut self) -> CoreResult<()> {
        if self.file.is_some() {
            return Err(CoreError::DriverAlreadyOpen);
        }
        self.claim().map_err(report)
    }

    fn close(&mut self) -> CoreResult<()> {
        self.release().map_err(report)
    }

    fn commit(&mut self, state: &SignalState) -> CoreResult<()> {
        self.write_data(DataLines::from_signals(state))
            .map_err(report)
    }

    fn read_data(&mut self) -> CoreResult<bool> {
        let status = self.read_status().map_err(report)?;
        Ok(status.contains(StatusLines::ACK))
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

impl Drop for CheapParport {
    fn drop(&mut self) {
        if self.file.is_some() {
            if let Err(e) = self.release() {
                log::warn!("parport: {}", e);
            }
        }
    }
}

/// Parse programmer options from a list of key-value pairs
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<CheapParportConfig, String> {
    let mut config = CheapParportConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                if value.is_empty() {
                    return Err("Empty dev value".to_string());
                }
                config.device = value.to_string();
            }
            _ => {
                log::warn!("parport: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_register_mapping() {
        let mut state = SignalState::new();
        assert_eq!(DataLines::from_signals(&state).bits(), 0);

        state.data = true;
        assert_eq!(DataLines::from_signals(&state), DataLines::PGD);
        state.clock = true;
        state.reset = true;
        assert_eq!(DataLines::from_signals(&state).bits(), 0x07);

        // Power is not wired
        state = SignalState::new();
        state.power = true;
        assert!(DataLines::from_signals(&state).is_empty());
    }

    #[test]
    fn test_status_ack() {
        assert!(StatusLines::from_bits_truncate(0x7F).contains(StatusLines::ACK));
        assert!(!StatusLines::from_bits_truncate(0xBF).contains(StatusLines::ACK));
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(parse_options(&[]).unwrap().device, "/dev/parport0");
        assert_eq!(
            parse_options(&[("dev", "/dev/parport1")]).unwrap(),
            CheapParportConfig::new("/dev/parport1")
        );
        // Unknown options are only warned about
        assert!(parse_options(&[("speed", "1")]).is_ok());
        assert!(parse_options(&[("dev", "")]).is_err());
    }

    #[test]
    fn test_unclaimed_port() {
        let mut port = CheapParport::new(CheapParportConfig::new("/nonexistent/parport"));
        assert_eq!(
            port.commit(&SignalState::new()),
            Err(CoreError::DriverNotOpen)
        );
        assert_eq!(port.read_data(), Err(CoreError::DriverNotOpen));
        assert_eq!(port.open(), Err(CoreError::Transport));
    }

    #[test]
    fn test_probe_missing_device() {
        let err = CheapParport::probe(CheapParportConfig::new("/nonexistent/parport"))
            .err()
            .unwrap();
        assert!(matches!(err, ParportError::OpenFailed { .. }));
    }
}
