// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulation and wall-clock timers.

use nemo_neural::{NemoError, Result};
use std::time::Instant;

/// Tracks elapsed simulation cycles and wall-clock time since the last
/// reset.
#[derive(Debug, Clone)]
pub struct Timer {
    cycles: u64,
    started: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            cycles: 0,
            started: Instant::now(),
        }
    }

    /// Advance the cycle counter by one.
    pub fn step(&mut self) -> Result<()> {
        self.cycles = self
            .cycles
            .checked_add(1)
            .ok_or_else(|| NemoError::Logic("simulation cycle counter overflowed".into()))?;
        Ok(())
    }

    /// Number of completed simulation cycles (milliseconds of simulated
    /// time) since the last reset.
    pub fn elapsed_simulation(&self) -> u64 {
        self.cycles
    }

    /// Wall-clock milliseconds since the last reset.
    pub fn elapsed_wallclock(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn reset(&mut self) {
        self.cycles = 0;
        self.started = Instant::now();
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
