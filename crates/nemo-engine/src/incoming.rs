// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Incoming spike queue.
//!
//! A ring of `max_delay` bins, one per future delivery cycle. The scatter
//! stage of cycle `c` appends spike groups to bin `(c + delay) % max_delay`;
//! the gather stage of cycle `c` consumes and clears bin `c % max_delay`
//! before any scatter of the same cycle runs, so a delay of exactly
//! `max_delay` lands in the bin that was just emptied.
//!
//! Bins are capacity-bounded. Sizing the bins for the worst case (every
//! neuron firing continuously) would be wasteful, so capacity is a
//! configurable fraction of it; exceeding the bound is a `BufferOverflow`,
//! which signals that the network's activity outgrew the sizing multiplier
//! chosen at finalization.

use nemo_neural::{NemoError, Result};

/// A reference to one forward-matrix row that must be streamed: every
/// synapse of `source` at conductance delay `delay`. The source partition is
/// carried for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpikeGroup {
    pub source: u32,
    pub source_partition: u32,
    pub delay: u32,
}

/// Ring of per-cycle spike-group bins.
#[derive(Debug, Clone)]
pub struct IncomingQueue {
    bins: Vec<Vec<SpikeGroup>>,
    bin_capacity: usize,
}

impl IncomingQueue {
    /// `worst_case` is the maximum number of groups a single bin could ever
    /// receive (every forward row enqueued once per ring revolution);
    /// `size_multiplier` relaxes it.
    pub fn new(max_delay: u32, worst_case: usize, size_multiplier: f64) -> Self {
        let bin_count = max_delay.max(1) as usize;
        let bin_capacity = ((worst_case as f64 * size_multiplier).ceil() as usize).max(64);
        Self {
            bins: vec![Vec::new(); bin_count],
            bin_capacity,
        }
    }

    pub fn bin_capacity(&self) -> usize {
        self.bin_capacity
    }

    /// Enqueue a spike group fired at `cycle` for delivery at
    /// `cycle + group.delay`.
    pub fn enqueue(&mut self, cycle: u64, group: SpikeGroup) -> Result<()> {
        let bin = ((cycle + group.delay as u64) % self.bins.len() as u64) as usize;
        let slot = &mut self.bins[bin];
        if slot.len() >= self.bin_capacity {
            return Err(NemoError::BufferOverflow(format!(
                "incoming spike bin {bin} full at cycle {cycle} (capacity {}); \
                 network activity exceeds the queue sizing multiplier",
                self.bin_capacity
            )));
        }
        slot.push(group);
        Ok(())
    }

    /// Move the current cycle's bin into `out`, leaving the bin empty.
    pub fn drain_into(&mut self, cycle: u64, out: &mut Vec<SpikeGroup>) {
        out.clear();
        let bin = (cycle % self.bins.len() as u64) as usize;
        out.append(&mut self.bins[bin]);
    }
}
