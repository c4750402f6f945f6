// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Compute backend abstraction.
//!
//! The neuron-update stage of the pipeline runs behind a small trait so the
//! engine logic stays independent of how the arithmetic is executed. The CPU
//! backend is the reference implementation; the `supports_stdp` capability
//! probe defaults to unsupported so restricted backends fail `apply_stdp`
//! without extra plumbing.

use nemo_neural::{NemoError, Result};
use nemo_runtime::NeuronArray;

/// Neuron counts below this are not worth fanning out to workers.
const PARALLEL_THRESHOLD: usize = 4096;

/// Execution strategy for the per-neuron update stage.
pub trait ComputeBackend: Send + Sync {
    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Run noise + integration for every neuron. `current` holds the
    /// accumulated input current per neuron (already in float); `fired`
    /// receives the firing decision. Must be deterministic for a given
    /// input regardless of worker count.
    fn update_neurons(
        &self,
        neurons: &mut NeuronArray,
        current: &[f32],
        fired: &mut [bool],
    ) -> Result<()>;

    /// Whether `apply_stdp` works on this backend.
    fn supports_stdp(&self) -> bool {
        false
    }
}

/// Reference CPU backend, optionally with its own worker pool created at
/// finalization.
pub struct CpuBackend {
    pool: Option<rayon::ThreadPool>,
}

impl CpuBackend {
    /// `threads` of `None` shares the process-global rayon pool; otherwise a
    /// dedicated pool of the given size is created once, up front.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let pool = match threads {
            None => None,
            Some(t) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(t)
                    .build()
                    .map_err(|e| {
                        NemoError::Allocation(format!("failed to build CPU worker pool: {e}"))
                    })?,
            ),
        };
        Ok(Self { pool })
    }
}

impl ComputeBackend for CpuBackend {
    fn backend_name(&self) -> &'static str {
        "CPU"
    }

    fn update_neurons(
        &self,
        neurons: &mut NeuronArray,
        current: &[f32],
        fired: &mut [bool],
    ) -> Result<()> {
        let count = neurons.count();
        if count < PARALLEL_THRESHOLD {
            neurons.update_range(0..count, current, fired);
        } else {
            match &self.pool {
                Some(pool) => pool.install(|| neurons.update_parallel(current, fired)),
                None => neurons.update_parallel(current, fired),
            }
        }
        Ok(())
    }

    fn supports_stdp(&self) -> bool {
        true
    }
}

/// Backend selection, resolved at finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// The reference CPU implementation.
    Cpu,
    /// Pick the best available backend; resolves to CPU on this build.
    #[default]
    Auto,
}

impl core::fmt::Display for BackendType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BackendType::Cpu => write!(f, "CPU"),
            BackendType::Auto => write!(f, "Auto"),
        }
    }
}

impl core::str::FromStr for BackendType {
    type Err = NemoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(BackendType::Cpu),
            "auto" => Ok(BackendType::Auto),
            other => Err(NemoError::InvalidInput(format!(
                "unknown backend \"{other}\""
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nemo_neural::{IzhikevichParams, IzhikevichState};

    #[test]
    fn backend_type_parses_known_names() {
        assert_eq!("cpu".parse::<BackendType>().unwrap(), BackendType::Cpu);
        assert_eq!("Auto".parse::<BackendType>().unwrap(), BackendType::Auto);
        assert!("cuda".parse::<BackendType>().is_err());
    }

    #[test]
    fn cpu_backend_supports_stdp() {
        let backend = CpuBackend::new(None).unwrap();
        assert!(backend.supports_stdp());
        assert_eq!(backend.backend_name(), "CPU");
    }

    #[test]
    fn dedicated_pool_gives_the_same_result_as_the_global_one() {
        let params = IzhikevichParams::regular_spiking(1.0);
        let mut a = NeuronArray::new(64, 9);
        let mut b = NeuronArray::new(64, 9);
        for n in 0..64 {
            a.set(n, params, IzhikevichState::resting(&params)).unwrap();
            b.set(n, params, IzhikevichState::resting(&params)).unwrap();
        }

        let global = CpuBackend::new(None).unwrap();
        let pooled = CpuBackend::new(Some(2)).unwrap();
        let current = vec![8.0; 64];
        let mut fired_a = vec![false; 64];
        let mut fired_b = vec![false; 64];
        for _ in 0..20 {
            global.update_neurons(&mut a, &current, &mut fired_a).unwrap();
            pooled.update_neurons(&mut b, &current, &mut fired_b).unwrap();
            a.reset_fired(&fired_a);
            b.reset_fired(&fired_b);
            assert_eq!(fired_a, fired_b);
        }
        assert_eq!(a.v, b.v);
    }
}
