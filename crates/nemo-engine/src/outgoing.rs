// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Outgoing spike index.
//!
//! For every source neuron, the list of delays at which it has any outgoing
//! synapses, with the fan-out in target partitions per delay. Built once at
//! finalization by scanning the forward matrix; the scatter stage walks this
//! index instead of probing every possible delay.

use ahash::AHashSet;
use nemo_runtime::Mapper;

use crate::fcm::ConnectivityMatrix;

/// One `(delay, partition fan-out)` group of a source's outgoing synapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutgoingGroup {
    pub delay: u32,
    /// Number of distinct target partitions reached at this delay. Feeds
    /// the incoming-queue sizing.
    pub target_partitions: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct RowRef {
    start: u32,
    len: u32,
}

/// Per-source outgoing groups in a flat, finalized layout.
#[derive(Debug, Clone)]
pub struct OutgoingIndex {
    refs: Vec<RowRef>,
    groups: Vec<OutgoingGroup>,
    delay_bits: Vec<u64>,
    total_span: usize,
}

impl OutgoingIndex {
    pub fn build(cm: &ConnectivityMatrix, mapper: &Mapper) -> Self {
        let count = mapper.neuron_count();
        let mut refs = Vec::with_capacity(count);
        let mut groups = Vec::new();
        let mut delay_bits = vec![0u64; count];
        let mut total_span = 0usize;
        let mut partitions = AHashSet::new();

        for source in 0..count as u32 {
            let start = groups.len() as u32;
            for delay in 1..=cm.max_delay() {
                let row = cm.get_row(source, delay);
                if row.is_empty() {
                    continue;
                }
                partitions.clear();
                for terminal in row {
                    partitions.insert(mapper.partition_of(terminal.target));
                }
                groups.push(OutgoingGroup {
                    delay,
                    target_partitions: partitions.len() as u32,
                });
                delay_bits[source as usize] |= 1 << (delay - 1);
                total_span += partitions.len();
            }
            refs.push(RowRef {
                start,
                len: groups.len() as u32 - start,
            });
        }

        Self {
            refs,
            groups,
            delay_bits,
            total_span,
        }
    }

    /// Outgoing groups of one source, ordered by delay.
    pub fn groups(&self, source: u32) -> &[OutgoingGroup] {
        let r = self.refs[source as usize];
        &self.groups[r.start as usize..(r.start + r.len) as usize]
    }

    /// Bit `d − 1` set iff the source has any outgoing synapse at delay `d`.
    pub fn delay_bits(&self, source: u32) -> u64 {
        self.delay_bits[source as usize]
    }

    /// Worst-case number of spike groups a single incoming bin can receive
    /// per ring revolution, at partition granularity.
    pub fn total_group_span(&self) -> usize {
        self.total_span
    }
}
