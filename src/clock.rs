//! Time sources.

use crate::error::{EngineError, Result};
use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in whole seconds.
///
/// Readings must never decrease.
pub trait Clock {
    fn now(&self) -> u64;
}

/// Wall clock in Unix seconds, clamped so readings never go backwards.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Cell<u64>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let now = wall.max(self.last.get());
        self.last.set(now);
        now
    }
}

/// Clock driven explicitly, used for journal replay and tests.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: u64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        ManualClock { now: start }
    }

    /// Moves the clock to `time`. Moving backwards is rejected.
    pub fn set(&mut self, time: u64) -> Result<()> {
        if time < self.now {
            return Err(EngineError::ClockRegression {
                now: self.now,
                requested: time,
            });
        }
        self.now = time;
        Ok(())
    }

    pub fn advance(&mut self, seconds: u64) {
        self.now = self.now.saturating_add(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now
    }
}
