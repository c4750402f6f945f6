// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Structure-of-arrays neuron storage.
//!
//! One column per Izhikevich parameter and state variable, plus the
//! per-neuron RNG stream for thalamic noise. Columns are plain `Vec`s so the
//! update stage streams them sequentially.
//!
//! The parallel update uses a compute-then-apply split: workers produce
//! `(state, rng, fired)` results from read-only borrows, and the results are
//! written back afterwards. This keeps the outcome bit-identical to the
//! sequential path regardless of worker count.

use nemo_neural::models::izhikevich;
use nemo_neural::{IzhikevichParams, IzhikevichState, NemoError, NeuronRng, Result};
use rayon::prelude::*;

/// Dense per-neuron parameter and state columns.
#[derive(Debug, Clone)]
pub struct NeuronArray {
    count: usize,
    pub a: Vec<f32>,
    pub b: Vec<f32>,
    pub c: Vec<f32>,
    pub d: Vec<f32>,
    pub sigma: Vec<f32>,
    pub u: Vec<f32>,
    pub v: Vec<f32>,
    pub valid: Vec<bool>,
    pub rng: Vec<NeuronRng>,
}

impl NeuronArray {
    /// Allocate `count` invalid neurons, each with its RNG stream seeded
    /// from `(seed, local index)`.
    pub fn new(count: usize, seed: u64) -> Self {
        Self {
            count,
            a: vec![0.0; count],
            b: vec![0.0; count],
            c: vec![0.0; count],
            d: vec![0.0; count],
            sigma: vec![0.0; count],
            u: vec![0.0; count],
            v: vec![0.0; count],
            valid: vec![false; count],
            rng: (0..count).map(|n| NeuronRng::new(seed, n as u64)).collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn check_index(&self, n: usize) -> Result<()> {
        if n >= self.count || !self.valid[n] {
            return Err(NemoError::InvalidInput(format!(
                "no neuron at local index {n}"
            )));
        }
        Ok(())
    }

    /// Install a neuron's parameters and initial state.
    pub fn set(&mut self, n: usize, params: IzhikevichParams, state: IzhikevichState) -> Result<()> {
        if n >= self.count {
            return Err(NemoError::InvalidInput(format!(
                "local index {n} out of range ({} neurons)",
                self.count
            )));
        }
        if !(params.sigma >= 0.0) {
            return Err(NemoError::InvalidInput(format!(
                "sigma must be non-negative (got {})",
                params.sigma
            )));
        }
        self.a[n] = params.a;
        self.b[n] = params.b;
        self.c[n] = params.c;
        self.d[n] = params.d;
        self.sigma[n] = params.sigma;
        self.u[n] = state.u;
        self.v[n] = state.v;
        self.valid[n] = true;
        Ok(())
    }

    pub fn get(&self, n: usize) -> Result<(IzhikevichParams, IzhikevichState)> {
        self.check_index(n)?;
        Ok((
            IzhikevichParams {
                a: self.a[n],
                b: self.b[n],
                c: self.c[n],
                d: self.d[n],
                sigma: self.sigma[n],
            },
            IzhikevichState {
                u: self.u[n],
                v: self.v[n],
            },
        ))
    }

    pub fn membrane_potential(&self, n: usize) -> Result<f32> {
        self.check_index(n)?;
        Ok(self.v[n])
    }

    #[inline]
    fn update_one(
        params: &IzhikevichParams,
        state: &mut IzhikevichState,
        rng: &mut NeuronRng,
        current: f32,
    ) -> bool {
        let mut input = current;
        if params.sigma != 0.0 {
            input += params.sigma * rng.gaussian();
        }
        izhikevich::update(params, state, input)
    }

    /// Sequential update of `range`: add noise, integrate, record firing.
    /// `current` and `fired` span the whole array.
    pub fn update_range(
        &mut self,
        range: core::ops::Range<usize>,
        current: &[f32],
        fired: &mut [bool],
    ) {
        for n in range {
            fired[n] = false;
            if !self.valid[n] {
                continue;
            }
            let params = IzhikevichParams {
                a: self.a[n],
                b: self.b[n],
                c: self.c[n],
                d: self.d[n],
                sigma: self.sigma[n],
            };
            let mut state = IzhikevichState {
                u: self.u[n],
                v: self.v[n],
            };
            let mut rng = self.rng[n];
            fired[n] = Self::update_one(&params, &mut state, &mut rng, current[n]);
            self.u[n] = state.u;
            self.v[n] = state.v;
            self.rng[n] = rng;
        }
    }

    /// Parallel update of the whole array, bit-identical to
    /// `update_range(0..count, ..)`.
    pub fn update_parallel(&mut self, current: &[f32], fired: &mut [bool]) {
        // Phase 1: compute from read-only borrows.
        let results: Vec<(f32, f32, NeuronRng, bool)> = (0..self.count)
            .into_par_iter()
            .map(|n| {
                if !self.valid[n] {
                    return (self.u[n], self.v[n], self.rng[n], false);
                }
                let params = IzhikevichParams {
                    a: self.a[n],
                    b: self.b[n],
                    c: self.c[n],
                    d: self.d[n],
                    sigma: self.sigma[n],
                };
                let mut state = IzhikevichState {
                    u: self.u[n],
                    v: self.v[n],
                };
                let mut rng = self.rng[n];
                let f = Self::update_one(&params, &mut state, &mut rng, current[n]);
                (state.u, state.v, rng, f)
            })
            .collect();

        // Phase 2: apply sequentially.
        for (n, (u, v, rng, f)) in results.into_iter().enumerate() {
            self.u[n] = u;
            self.v[n] = v;
            self.rng[n] = rng;
            fired[n] = f;
        }
    }

    /// Post-firing reset for every fired neuron: `v ← c`, `u ← u + d`.
    pub fn reset_fired(&mut self, fired: &[bool]) {
        for n in 0..self.count {
            if fired[n] && self.valid[n] {
                self.v[n] = self.c[n];
                self.u[n] += self.d[n];
            }
        }
    }
}
