// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Reverse connectivity matrix.
//!
//! Target-indexed view over the plastic synapses only: each entry points
//! back at its weight slot in the forward matrix and carries a pending
//! weight-delta accumulator. Rows are stored pitched — every target gets
//! `max incoming plastic` slots — so the STDP scan can hand each worker one
//! disjoint row chunk.
//!
//! `accumulate_cycle` runs the per-cycle STDP scan: for every target whose
//! firing has reached the end of its post-fire window, the arrival history
//! of each plastic incoming synapse is matched against the window function
//! and the resulting delta accumulated. `apply` flushes the accumulators
//! into the forward weights under the reward multiplier, clamping excitatory
//! synapses to `[0, max]` and inhibitory ones to `[min, 0]` so no synapse
//! changes sign.

use nemo_neural::{Fix, StdpFunction};
use nemo_runtime::RecentFiring;
use rayon::prelude::*;

use crate::fcm::ConnectivityMatrix;

/// One plastic synapse as seen from its target.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RSynapse {
    pub source: u32,
    pub delay: u32,
    /// Weight slot in the forward matrix.
    pub forward_address: u32,
    /// Classification at insertion time; the clamp keeps it truthful.
    pub excitatory: bool,
}

/// Pitched target-indexed plastic synapse table with delta accumulators.
#[derive(Debug, Clone)]
pub struct ReverseMatrix {
    pitch: usize,
    lens: Vec<u32>,
    entries: Vec<RSynapse>,
    deltas: Vec<Fix>,
    synapse_count: usize,
}

impl ReverseMatrix {
    pub(crate) fn build(rows: Vec<Vec<RSynapse>>) -> Self {
        let pitch = rows.iter().map(Vec::len).max().unwrap_or(0);
        let count = rows.len();
        let synapse_count = rows.iter().map(Vec::len).sum();

        let mut lens = Vec::with_capacity(count);
        let mut entries = vec![RSynapse::default(); count * pitch];
        for (target, row) in rows.into_iter().enumerate() {
            lens.push(row.len() as u32);
            entries[target * pitch..target * pitch + row.len()].copy_from_slice(&row);
        }

        Self {
            pitch,
            lens,
            entries,
            deltas: vec![Fix::ZERO; count * pitch],
            synapse_count,
        }
    }

    /// Number of plastic synapses indexed.
    pub fn synapse_count(&self) -> usize {
        self.synapse_count
    }

    /// True if any accumulator is non-zero.
    pub fn has_pending(&self) -> bool {
        self.deltas.iter().any(|d| !d.is_zero())
    }

    /// The per-cycle STDP accumulation scan over all targets. Reads the
    /// post-update half of the firing history, so the current cycle's firing
    /// bits are visible.
    pub fn accumulate_cycle(&mut self, recent: &RecentFiring, stdp: &StdpFunction, fbits: u32) {
        if self.pitch == 0 {
            return;
        }
        let gate = 1u64 << stdp.process_delay();
        let pitch = self.pitch;
        let entries = &self.entries;
        let lens = &self.lens;
        let words = recent.words();

        self.deltas
            .par_chunks_mut(pitch)
            .enumerate()
            .for_each(|(target, deltas)| {
                if words[target] & gate == 0 {
                    return;
                }
                for (i, delta) in deltas
                    .iter_mut()
                    .enumerate()
                    .take(lens[target] as usize)
                {
                    let synapse = entries[target * pitch + i];
                    let arrivals = if synapse.delay >= 64 {
                        0
                    } else {
                        words[synapse.source as usize] >> synapse.delay
                    };
                    let w_diff = stdp.weight_change(arrivals);
                    if w_diff != 0.0 {
                        *delta = delta.saturating_add(Fix::from_float(w_diff, fbits)).0;
                    }
                }
            });
    }

    /// Flush pending deltas into the forward weights:
    /// `w ← clamp(w + reward × delta)`. Always clears the accumulators; with
    /// `reward == 0` that is all it does.
    pub fn apply(
        &mut self,
        reward: f32,
        cm: &mut ConnectivityMatrix,
        min_weight: Fix,
        max_weight: Fix,
    ) {
        for target in 0..self.lens.len() {
            for i in 0..self.lens[target] as usize {
                let idx = target * self.pitch + i;
                let delta = core::mem::replace(&mut self.deltas[idx], Fix::ZERO);
                if reward == 0.0 || delta.is_zero() {
                    continue;
                }
                let synapse = self.entries[idx];
                let (sum, _) = cm
                    .weight(synapse.forward_address)
                    .saturating_add(delta.scale(reward));
                let clamped = if synapse.excitatory {
                    sum.clamp(Fix::ZERO, max_weight)
                } else {
                    sum.clamp(min_weight, Fix::ZERO)
                };
                cm.set_weight(synapse.forward_address, clamped);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fcm::FAxonTerminal;

    const FBITS: u32 = 20;

    /// Forward matrix with two plastic synapses onto target 2:
    /// 0→2 (delay 1, excitatory) and 1→2 (delay 2, inhibitory).
    fn fixture() -> (ConnectivityMatrix, ReverseMatrix) {
        let mut cm = ConnectivityMatrix::new(FBITS);
        cm.set_row(
            0,
            1,
            vec![FAxonTerminal {
                target: 2,
                weight: Fix::from_float(2.0, FBITS),
            }],
        )
        .unwrap();
        cm.set_row(
            1,
            2,
            vec![FAxonTerminal {
                target: 2,
                weight: Fix::from_float(-2.0, FBITS),
            }],
        )
        .unwrap();
        cm.finalize(3).unwrap();

        let mut rows = vec![Vec::new(); 3];
        rows[2] = vec![
            RSynapse {
                source: 0,
                delay: 1,
                forward_address: cm.forward_address(0, 1, 0),
                excitatory: true,
            },
            RSynapse {
                source: 1,
                delay: 2,
                forward_address: cm.forward_address(1, 2, 0),
                excitatory: false,
            },
        ];
        let rcm = ReverseMatrix::build(rows);
        (cm, rcm)
    }

    fn stdp() -> StdpFunction {
        StdpFunction::new(vec![1.0, 0.5], vec![-1.0, -0.5], -4.0, 4.0).unwrap()
    }

    /// Drive the history so `source` fired `source_ago` cycles before the
    /// current cycle and the target fired `process_delay` cycles before it.
    fn history(source: u32, source_ago: u32, target: u32, target_ago: u32) -> RecentFiring {
        let mut recent = RecentFiring::new(3);
        let horizon = source_ago.max(target_ago);
        for back in (0..=horizon).rev() {
            for n in 0..3u32 {
                let fired = (n == source && back == source_ago) || (n == target && back == target_ago);
                recent.update(n as usize, fired);
            }
            if back > 0 {
                recent.commit();
            }
        }
        recent
    }

    #[test]
    fn pre_before_post_accumulates_potentiation() {
        let (_, mut rcm) = fixture();
        let f = stdp();
        // Target fired process_delay() cycles ago; source 0 fired one cycle
        // before that plus its delay of 1.
        let recent = history(0, f.process_delay() + 2, 2, f.process_delay());
        rcm.accumulate_cycle(&recent, &f, FBITS);
        assert!(rcm.has_pending());
    }

    #[test]
    fn apply_zero_reward_only_clears_accumulators() {
        let (mut cm, mut rcm) = fixture();
        let f = stdp();
        let recent = history(0, f.process_delay() + 2, 2, f.process_delay());
        rcm.accumulate_cycle(&recent, &f, FBITS);
        assert!(rcm.has_pending());

        let before = cm.weight(cm.forward_address(0, 1, 0));
        rcm.apply(0.0, &mut cm, Fix::from_float(-4.0, FBITS), Fix::from_float(4.0, FBITS));
        assert!(!rcm.has_pending());
        assert_eq!(cm.weight(cm.forward_address(0, 1, 0)), before);
    }

    #[test]
    fn apply_scales_by_reward_and_clamps() {
        let (mut cm, mut rcm) = fixture();
        let f = stdp();
        let recent = history(0, f.process_delay() + 2, 2, f.process_delay());
        // Accumulate the same +1.0 potentiation several times.
        for _ in 0..3 {
            rcm.accumulate_cycle(&recent, &f, FBITS);
        }
        let min = Fix::from_float(-4.0, FBITS);
        let max = Fix::from_float(4.0, FBITS);
        rcm.apply(1.0, &mut cm, min, max);
        // 2.0 + 3×1.0 clamped to 4.0.
        let w = cm.weight(cm.forward_address(0, 1, 0)).to_float(FBITS);
        assert!((w - 4.0).abs() < 1e-4, "weight {w}");
        assert!(!rcm.has_pending());
    }

    #[test]
    fn inhibitory_synapses_are_clamped_to_the_negative_range() {
        let (mut cm, mut rcm) = fixture();
        let f = stdp();
        // Source 1 (delay 2) fired so its spike arrived at the firing cycle:
        // depression sample −1.0 on the inhibitory synapse, repeatedly.
        let recent = history(1, f.process_delay() + 2, 2, f.process_delay());
        for _ in 0..10 {
            rcm.accumulate_cycle(&recent, &f, FBITS);
        }
        let min = Fix::from_float(-4.0, FBITS);
        let max = Fix::from_float(4.0, FBITS);
        rcm.apply(1.0, &mut cm, min, max);
        let w = cm.weight(cm.forward_address(1, 2, 0)).to_float(FBITS);
        assert!((-4.0..=0.0).contains(&w), "weight {w}");
    }

    #[test]
    fn ungated_targets_accumulate_nothing() {
        let (_, mut rcm) = fixture();
        let f = stdp();
        // Target never fired: nothing pending regardless of source activity.
        let recent = history(0, 1, 2, 60);
        rcm.accumulate_cycle(&recent, &f, FBITS);
        assert!(!rcm.has_pending());
    }
}
