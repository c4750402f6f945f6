// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Izhikevich Point-Neuron Model
//!
//! ## Model Dynamics
//!
//! ```text
//! v' = 0.04 v² + 5 v + 140 − u + I
//! u' = a (b v − u)
//!
//! on v ≥ 30 mV:  v ← c,  u ← u + d
//! ```
//!
//! The ODE is stiff near the firing threshold, so one millisecond of
//! simulated time is integrated as four Euler sub-steps of 0.25 ms each.
//! Integration terminates early within the cycle once the threshold is
//! crossed: `v` and `u` are frozen until the post-firing reset.

/// Membrane potential at which a neuron is considered to have fired.
pub const FIRING_THRESHOLD_MV: f32 = 30.0;

const SUBSTEPS: u32 = 4;
const SUBSTEP_MULT: f32 = 0.25;

/// Per-neuron model parameters, immutable after network finalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IzhikevichParams {
    /// Recovery time scale.
    pub a: f32,
    /// Recovery sensitivity to sub-threshold fluctuations of `v`.
    pub b: f32,
    /// Post-firing reset value of `v` (mV).
    pub c: f32,
    /// Post-firing increment of `u`.
    pub d: f32,
    /// Standard deviation of the per-cycle Gaussian input noise; `0` turns
    /// the noise term off entirely.
    pub sigma: f32,
}

impl IzhikevichParams {
    /// Canonical regular-spiking (excitatory) parameter set.
    pub fn regular_spiking(sigma: f32) -> Self {
        Self {
            a: 0.02,
            b: 0.2,
            c: -65.0,
            d: 8.0,
            sigma,
        }
    }

    /// Canonical fast-spiking (inhibitory) parameter set.
    pub fn fast_spiking(sigma: f32) -> Self {
        Self {
            a: 0.1,
            b: 0.2,
            c: -65.0,
            d: 2.0,
            sigma,
        }
    }
}

/// Mutable per-neuron state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IzhikevichState {
    /// Membrane recovery variable.
    pub u: f32,
    /// Membrane potential (mV).
    pub v: f32,
}

impl IzhikevichState {
    /// Resting state for the given parameters: `v` at the resting potential,
    /// `u` at its nullcline value `b·v`.
    pub fn resting(params: &IzhikevichParams) -> Self {
        Self {
            u: params.b * params.c,
            v: params.c,
        }
    }
}

/// Advance one neuron by one millisecond under input current `current`.
/// Returns whether the neuron fired this cycle. State is frozen at the
/// sub-step where the threshold was crossed; the caller applies the
/// post-firing reset separately so a forced firing can share the same path.
#[inline]
pub fn update(params: &IzhikevichParams, state: &mut IzhikevichState, current: f32) -> bool {
    let mut fired = false;
    for _ in 0..SUBSTEPS {
        if !fired {
            state.v +=
                SUBSTEP_MULT * ((0.04 * state.v + 5.0) * state.v + 140.0 - state.u + current);
            state.u += SUBSTEP_MULT * (params.a * (params.b * state.v - state.u));
            fired = state.v >= FIRING_THRESHOLD_MV;
        }
    }
    fired
}

/// Post-firing reset: `v ← c`, `u ← u + d`.
#[inline]
pub fn reset(params: &IzhikevichParams, state: &mut IzhikevichState) {
    state.v = params.c;
    state.u += params.d;
}
