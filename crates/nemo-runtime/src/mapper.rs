// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Neuron index mapping.
//!
//! Users address neurons with arbitrary sparse `u32` indices; internally the
//! core uses dense local indices `0..N`, grouped into fixed-size partitions
//! that serve as the unit of locality for queue sizing and diagnostics.
//! Local indices are assigned in ascending order of the user index at
//! finalization, so the mapping is deterministic for a given construction.

use ahash::AHashMap;
use nemo_neural::{NemoError, NeuronId, Result};

/// Bijection between user-facing and dense local neuron indices.
#[derive(Debug, Clone)]
pub struct Mapper {
    partition_size: u32,
    local_to_global: Vec<u32>,
    global_to_local: AHashMap<u32, u32>,
}

impl Mapper {
    /// Build from the set of user indices present in the network. Duplicate
    /// indices must have been rejected at construction.
    pub fn new(mut globals: Vec<u32>, partition_size: u32) -> Result<Self> {
        if partition_size == 0 {
            return Err(NemoError::InvalidInput(
                "partition size must be at least 1".into(),
            ));
        }
        globals.sort_unstable();

        let mut global_to_local = AHashMap::with_capacity(globals.len());
        for (local, &global) in globals.iter().enumerate() {
            if global_to_local.insert(global, local as u32).is_some() {
                return Err(NemoError::Logic(format!(
                    "duplicate neuron index {global} survived construction"
                )));
            }
        }

        Ok(Self {
            partition_size,
            local_to_global: globals,
            global_to_local,
        })
    }

    /// Dense local index for a user index; unknown indices are an input
    /// error.
    pub fn local_idx(&self, global: NeuronId) -> Result<u32> {
        self.global_to_local
            .get(&global.0)
            .copied()
            .ok_or_else(|| NemoError::InvalidInput(format!("unknown neuron index {}", global.0)))
    }

    /// User index for a dense local index. Local indices originate inside
    /// the core, so an unknown one is an internal error.
    pub fn global_idx(&self, local: u32) -> NeuronId {
        debug_assert!((local as usize) < self.local_to_global.len());
        NeuronId(self.local_to_global[local as usize])
    }

    pub fn existing_global(&self, global: NeuronId) -> bool {
        self.global_to_local.contains_key(&global.0)
    }

    pub fn neuron_count(&self) -> usize {
        self.local_to_global.len()
    }

    pub fn partition_size(&self) -> u32 {
        self.partition_size
    }

    pub fn partition_of(&self, local: u32) -> u32 {
        local / self.partition_size
    }

    pub fn partition_count(&self) -> u32 {
        (self.local_to_global.len() as u32).div_ceil(self.partition_size)
    }
}
