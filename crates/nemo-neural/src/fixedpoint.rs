// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Signed Qm.n fixed-point arithmetic.
//!
//! Synaptic weights and accumulated input currents are kept in a 32-bit
//! fixed-point format so that summation is associative and commutative:
//! the gather stage can then be reordered or parallelized without changing
//! the result. The fractional-bit count is chosen once, at network
//! finalization, from the largest absolute synapse weight.

/// Bits reserved above the integer part of the weight range so that roughly
/// 32 maximal-weight spikes can land on one neuron in a single cycle without
/// saturating the accumulator.
const HEADROOM_BITS: u32 = 5;

/// A signed fixed-point value. The fractional-bit count is carried
/// externally (it is uniform across a finalized network), not per value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fix(i32);

impl Fix {
    pub const ZERO: Fix = Fix(0);
    pub const MIN: Fix = Fix(i32::MIN);
    pub const MAX: Fix = Fix(i32::MAX);

    /// Convert from float, truncating toward zero and saturating at the
    /// representable range.
    pub fn from_float(value: f32, fbits: u32) -> Fix {
        debug_assert!(fbits < 31);
        // `as` casts from float saturate, which is exactly the contract here.
        Fix((value as f64 * (1i64 << fbits) as f64) as i32)
    }

    pub fn to_float(self, fbits: u32) -> f32 {
        (self.0 as f64 / (1i64 << fbits) as f64) as f32
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn from_raw(raw: i32) -> Fix {
        Fix(raw)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Saturating addition. The second element of the result reports whether
    /// saturation occurred, so callers can keep a per-neuron overflow bit for
    /// diagnostics while accumulation proceeds.
    pub fn saturating_add(self, rhs: Fix) -> (Fix, bool) {
        match self.0.checked_add(rhs.0) {
            Some(sum) => (Fix(sum), false),
            None => {
                let sat = if self.0 < 0 { i32::MIN } else { i32::MAX };
                (Fix(sat), true)
            }
        }
    }

    /// Scale by a float factor (the STDP reward multiplier), rounding to
    /// nearest and saturating.
    pub fn scale(self, factor: f32) -> Fix {
        Fix((self.0 as f64 * factor as f64).round() as i32)
    }

    pub fn clamp(self, floor: Fix, ceiling: Fix) -> Fix {
        Fix(self.0.clamp(floor.0, ceiling.0))
    }
}

/// Fractional-bit count for a network whose largest absolute weight is
/// `max_abs_weight`: `31 − ⌈log2 maxAbsWeight⌉ − 5`, clamped to a sane range.
/// Weights below 1.0 are treated as 1.0 so small networks get the full
/// `Q5.26` resolution.
pub fn fractional_bits(max_abs_weight: f32) -> u32 {
    let magnitude = max_abs_weight.abs().max(1.0).ceil() as u64;
    let int_bits = 64 - (magnitude - 1).leading_zeros() as i64; // ceil(log2)
    (31 - int_bits - HEADROOM_BITS as i64).clamp(1, 30) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_bits_follows_the_headroom_rule() {
        assert_eq!(fractional_bits(1.0), 26);
        assert_eq!(fractional_bits(0.1), 26);
        assert_eq!(fractional_bits(60.0), 20); // ceil(log2 60) = 6
        assert_eq!(fractional_bits(64.0), 20);
        assert_eq!(fractional_bits(65.0), 19);
    }

    #[test]
    fn conversion_round_trips_within_quantization() {
        let fbits = fractional_bits(10.0);
        for w in [-10.0f32, -0.25, 0.0, 0.5, 3.75, 9.99] {
            let fx = Fix::from_float(w, fbits);
            assert!((fx.to_float(fbits) - w).abs() < 1.0 / (1u64 << fbits) as f32);
        }
    }

    #[test]
    fn conversion_saturates_out_of_range_values() {
        assert_eq!(Fix::from_float(f32::MAX, 26), Fix::MAX);
        assert_eq!(Fix::from_float(f32::MIN, 26), Fix::MIN);
    }

    #[test]
    fn saturating_add_reports_saturation() {
        let (sum, sat) = Fix::from_raw(i32::MAX - 1).saturating_add(Fix::from_raw(10));
        assert_eq!(sum, Fix::MAX);
        assert!(sat);

        let (sum, sat) = Fix::from_raw(i32::MIN + 1).saturating_add(Fix::from_raw(-10));
        assert_eq!(sum, Fix::MIN);
        assert!(sat);

        let (sum, sat) = Fix::from_raw(3).saturating_add(Fix::from_raw(4));
        assert_eq!(sum.raw(), 7);
        assert!(!sat);
    }

    #[test]
    fn addition_is_order_independent() {
        let fbits = 20;
        let terms: Vec<Fix> = [0.5f32, -1.25, 3.0, -0.125, 7.75]
            .iter()
            .map(|&w| Fix::from_float(w, fbits))
            .collect();

        let forward = terms
            .iter()
            .fold(Fix::ZERO, |acc, &t| acc.saturating_add(t).0);
        let reverse = terms
            .iter()
            .rev()
            .fold(Fix::ZERO, |acc, &t| acc.saturating_add(t).0);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn scale_applies_reward_multiplier() {
        let fbits = 20;
        let delta = Fix::from_float(2.0, fbits);
        assert!((delta.scale(0.5).to_float(fbits) - 1.0).abs() < 1e-4);
        assert_eq!(delta.scale(0.0), Fix::ZERO);
        assert!((delta.scale(-1.0).to_float(fbits) + 2.0).abs() < 1e-4);
    }

    #[test]
    fn clamp_bounds_both_sides() {
        let fbits = 20;
        let floor = Fix::ZERO;
        let ceiling = Fix::from_float(4.0, fbits);
        assert_eq!(Fix::from_float(-1.0, fbits).clamp(floor, ceiling), floor);
        assert_eq!(Fix::from_float(9.0, fbits).clamp(floor, ceiling), ceiling);
    }
}
