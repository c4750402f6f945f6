// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Spike-timing-dependent plasticity window function.
//!
//! The whole STDP decision for one synapse fits in 64-bit integer ops over
//! the recent-firing word. Window layout, relative to a postsynaptic firing
//! processed `postfire.len() − 1` cycles after it happened (so the complete
//! post-fire window has been observed):
//!
//! ```text
//! arrival word bit:   W-1 ...  postW | postW-1 ... 1 0
//! table sample:       prefire (i)    | postfire (j)
//! cycle distance:     i + 1          | j
//! ```
//!
//! `postfire[0]` is an arrival in the same cycle as the firing, `prefire[0]`
//! an arrival one cycle before it. Samples with positive values form the
//! potentiation mask, negative ones the depression mask; the two regions are
//! scanned independently and their contributions summed.

use crate::types::{NemoError, Result};
use crate::HISTORY_BITS;

/// Sentinel distance for "no arrival in this direction".
const NO_APPLICATION: u32 = u32::MAX;

fn low_bits(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// A sampled STDP function plus the derived 64-bit window masks.
#[derive(Debug, Clone, PartialEq)]
pub struct StdpFunction {
    prefire: Vec<f32>,
    postfire: Vec<f32>,
    min_weight: f32,
    max_weight: f32,
    potentiation_mask: u64,
    depression_mask: u64,
    pre_fire_bits: u64,
    post_fire_bits: u64,
}

impl StdpFunction {
    /// Validate and compile a window function.
    ///
    /// `prefire` covers arrivals before the postsynaptic firing, starting
    /// closest to it; `postfire` covers arrivals at or after the firing,
    /// starting at the firing cycle itself. The combined window may not
    /// exceed the 64-bit firing history.
    pub fn new(
        prefire: Vec<f32>,
        postfire: Vec<f32>,
        min_weight: f32,
        max_weight: f32,
    ) -> Result<Self> {
        let window = prefire.len() + postfire.len();
        if window == 0 {
            return Err(NemoError::InvalidInput(
                "STDP function must have at least one sample".into(),
            ));
        }
        if window > HISTORY_BITS as usize {
            return Err(NemoError::InvalidInput(format!(
                "STDP window of {window} cycles exceeds the {HISTORY_BITS}-cycle firing history"
            )));
        }
        if prefire.iter().chain(postfire.iter()).any(|s| !s.is_finite()) {
            return Err(NemoError::InvalidInput(
                "STDP function samples must be finite".into(),
            ));
        }
        if !(min_weight <= 0.0 && 0.0 <= max_weight) {
            return Err(NemoError::InvalidInput(format!(
                "STDP weight bounds must straddle zero (got [{min_weight}, {max_weight}])"
            )));
        }

        let postw = postfire.len() as u32;
        let mut potentiation_mask = 0u64;
        let mut depression_mask = 0u64;
        for (j, &sample) in postfire.iter().enumerate() {
            // postfire[j] sits at bit (postw - 1) - j.
            let bit = 1u64 << (postw - 1 - j as u32);
            if sample > 0.0 {
                potentiation_mask |= bit;
            } else if sample < 0.0 {
                depression_mask |= bit;
            }
        }
        for (i, &sample) in prefire.iter().enumerate() {
            let bit = 1u64 << (postw + i as u32);
            if sample > 0.0 {
                potentiation_mask |= bit;
            } else if sample < 0.0 {
                depression_mask |= bit;
            }
        }

        let pre_fire_bits = if prefire.is_empty() {
            0
        } else {
            low_bits(prefire.len() as u32) << postw
        };

        Ok(Self {
            pre_fire_bits,
            post_fire_bits: low_bits(postw),
            prefire,
            postfire,
            min_weight,
            max_weight,
            potentiation_mask,
            depression_mask,
        })
    }

    pub fn min_weight(&self) -> f32 {
        self.min_weight
    }

    pub fn max_weight(&self) -> f32 {
        self.max_weight
    }

    pub fn potentiation_mask(&self) -> u64 {
        self.potentiation_mask
    }

    pub fn depression_mask(&self) -> u64 {
        self.depression_mask
    }

    /// Cycles after a firing at which its full STDP window has been observed
    /// and accumulation runs. Gating bit position in the recent-firing word.
    pub fn process_delay(&self) -> u32 {
        (self.postfire.len() as u32).saturating_sub(1)
    }

    /// Number of cycles between the postsynaptic firing and the first
    /// arrival before it, as an index into the prefire table; or
    /// `NO_APPLICATION` when there is none.
    fn closest_pre_fire(&self, arrivals: u64) -> u32 {
        let valid = arrivals & self.pre_fire_bits;
        if valid == 0 {
            NO_APPLICATION
        } else {
            (valid >> self.postfire.len() as u32).trailing_zeros()
        }
    }

    /// Index into the postfire table of the arrival closest after (or at)
    /// the postsynaptic firing; or `NO_APPLICATION` when there is none.
    fn closest_post_fire(&self, arrivals: u64) -> u32 {
        let valid = arrivals & self.post_fire_bits;
        if valid == 0 {
            NO_APPLICATION
        } else {
            (valid << (HISTORY_BITS - self.postfire.len() as u32)).leading_zeros()
        }
    }

    /// Weight change from the arrivals in one masked region. The update can
    /// sit on either side of the firing; only the side closer to it applies,
    /// and equidistant sides cancel.
    fn update_region(&self, arrivals: u64) -> f32 {
        if arrivals == 0 {
            return 0.0;
        }
        let dt_pre = self.closest_pre_fire(arrivals);
        let dt_post = self.closest_post_fire(arrivals);
        if dt_pre < dt_post {
            self.prefire[dt_pre as usize]
        } else if dt_post < dt_pre {
            self.postfire[dt_post as usize]
        } else {
            0.0
        }
    }

    /// Total weight change for one synapse, given its arrival history
    /// relative to the postsynaptic firing being processed (the source
    /// recent-firing word shifted right by the conductance delay).
    pub fn weight_change(&self, arrivals: u64) -> f32 {
        self.update_region(arrivals & self.potentiation_mask)
            + self.update_region(arrivals & self.depression_mask)
    }
}
