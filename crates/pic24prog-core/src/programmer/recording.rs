//! Line driver that records every call, for sequencer and engine tests

use std::collections::VecDeque;

use super::{LineDriver, SignalState};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Open,
    Close,
    Commit(SignalState),
    Read,
    Delay(u32),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingDriver {
    pub events: Vec<Event>,
    /// Bits returned by `read_data`, front first
    pub input: VecDeque<bool>,
    /// Level returned once `input` is exhausted
    pub idle_input: bool,
    /// Zero-based index of the commit that fails with `Transport`
    pub fail_at: Option<usize>,
    committed: usize,
    open: bool,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_input(level: bool) -> Self {
        Self {
            idle_input: level,
            ..Self::default()
        }
    }

    pub fn failing_at(commit: usize) -> Self {
        Self {
            fail_at: Some(commit),
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn commits(&self) -> Vec<SignalState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Commit(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn reads(&self) -> usize {
        self.events.iter().filter(|e| **e == Event::Read).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl LineDriver for RecordingDriver {
    fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(Error::DriverAlreadyOpen);
        }
        self.open = true;
        self.events.push(Event::Open);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        self.events.push(Event::Close);
        Ok(())
    }

    fn commit(&mut self, state: &SignalState) -> Result<()> {
        if !self.open {
            return Err(Error::DriverNotOpen);
        }
        let index = self.committed;
        self.committed += 1;
        if self.fail_at == Some(index) {
            return Err(Error::Transport);
        }
        self.events.push(Event::Commit(*state));
        Ok(())
    }

    fn read_data(&mut self) -> Result<bool> {
        self.events.push(Event::Read);
        Ok(self.input.pop_front().unwrap_or(self.idle_input))
    }

    fn delay_us(&mut self, us: u32) {
        self.events.push(Event::Delay(us));
    }
}
