// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Simulation configuration.
//!
//! Everything that is decided at finalization rather than construction:
//! partition size, fixed-point format override, queue sizing, worker count,
//! RNG seed, backend selection and the STDP window function.

use nemo_neural::{NemoError, Result, StdpFunction};

use crate::backend::BackendType;

/// Configuration consumed by [`crate::Simulation::new`].
#[derive(Debug, Clone)]
pub struct Configuration {
    partition_size: u32,
    fractional_bits: Option<u32>,
    incoming_size_multiplier: f64,
    cpu_threads: Option<usize>,
    backend: BackendType,
    seed: u64,
    stdp: Option<StdpFunction>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            partition_size: 1024,
            fractional_bits: None,
            incoming_size_multiplier: 0.1,
            cpu_threads: None,
            backend: BackendType::Auto,
            seed: 0,
            stdp: None,
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable STDP with the given window function. `prefire` covers spike
    /// arrivals before the postsynaptic firing and `postfire` arrivals at or
    /// after it, each starting closest to the firing.
    pub fn set_stdp_function(
        &mut self,
        prefire: &[f32],
        postfire: &[f32],
        min_weight: f32,
        max_weight: f32,
    ) -> Result<()> {
        self.stdp = Some(StdpFunction::new(
            prefire.to_vec(),
            postfire.to_vec(),
            min_weight,
            max_weight,
        )?);
        Ok(())
    }

    pub fn stdp_function(&self) -> Option<&StdpFunction> {
        self.stdp.as_ref()
    }

    /// Override the automatic fixed-point format selection.
    pub fn set_fractional_bits(&mut self, fbits: u32) -> Result<()> {
        if !(1..=30).contains(&fbits) {
            return Err(NemoError::InvalidInput(format!(
                "fractional bit count {fbits} outside [1, 30]"
            )));
        }
        self.fractional_bits = Some(fbits);
        Ok(())
    }

    pub fn fractional_bits(&self) -> Option<u32> {
        self.fractional_bits
    }

    pub fn set_partition_size(&mut self, size: u32) -> Result<()> {
        if size == 0 {
            return Err(NemoError::InvalidInput(
                "partition size must be at least 1".into(),
            ));
        }
        self.partition_size = size;
        Ok(())
    }

    pub fn partition_size(&self) -> u32 {
        self.partition_size
    }

    /// Incoming-queue bin capacity as a fraction of the worst-case
    /// saturation load.
    pub fn set_incoming_size_multiplier(&mut self, multiplier: f64) -> Result<()> {
        if !(multiplier.is_finite() && multiplier > 0.0) {
            return Err(NemoError::InvalidInput(format!(
                "incoming queue size multiplier must be positive (got {multiplier})"
            )));
        }
        self.incoming_size_multiplier = multiplier;
        Ok(())
    }

    pub fn incoming_size_multiplier(&self) -> f64 {
        self.incoming_size_multiplier
    }

    /// Select the CPU backend, optionally with a fixed worker-pool size.
    /// `None` or `Some(0)` uses the default pool.
    pub fn set_cpu_backend(&mut self, threads: Option<usize>) {
        self.backend = BackendType::Cpu;
        self.cpu_threads = threads.filter(|&t| t > 0);
    }

    pub fn cpu_threads(&self) -> Option<usize> {
        self.cpu_threads
    }

    pub fn backend(&self) -> BackendType {
        self.backend
    }

    /// Seed for the per-neuron RNG streams.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}
