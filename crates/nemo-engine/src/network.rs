// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Network construction.
//!
//! A `Network` accumulates neurons and synapses in hash maps keyed by user
//! indices; nothing is laid out for simulation here. Creating a
//! [`crate::Simulation`] from a network is the finalization transition: it
//! materializes the flat connectivity matrices and leaves the network
//! untouched, so one description can seed several simulations.
//!
//! Synapses may reference neurons that have not been added yet; endpoint
//! existence is checked at finalization.

use ahash::{AHashMap, AHashSet};
use nemo_neural::{
    IzhikevichParams, IzhikevichState, NemoError, NeuronId, Result, SynapseId, MAX_DELAY,
};

#[derive(Debug, Clone, Copy)]
pub(crate) struct NeuronSpec {
    pub params: IzhikevichParams,
    pub state: IzhikevichState,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SynapseSpec {
    pub target: u32,
    pub delay: u32,
    pub weight: f32,
    pub plastic: bool,
}

/// Mutable network description consumed by `Simulation::new`.
#[derive(Debug, Clone, Default)]
pub struct Network {
    neurons: AHashMap<u32, NeuronSpec>,
    /// Per-source synapses in insertion order.
    axons: AHashMap<u32, Vec<SynapseSpec>>,
    /// `(source, target, delay)` triples already inserted.
    synapse_keys: AHashSet<(u32, u32, u32)>,
    synapse_count: usize,
    max_delay: u32,
    max_abs_weight: f32,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one neuron. `sigma` is the standard deviation of its thalamic
    /// noise term (`0` disables noise); `u`/`v` are the initial state.
    #[allow(clippy::too_many_arguments)] // mirrors the canonical construction signature
    pub fn add_neuron(
        &mut self,
        idx: NeuronId,
        a: f32,
        b: f32,
        c: f32,
        d: f32,
        u: f32,
        v: f32,
        sigma: f32,
    ) -> Result<()> {
        if !(sigma >= 0.0) {
            return Err(NemoError::InvalidInput(format!(
                "sigma must be non-negative (neuron {idx}, sigma {sigma})"
            )));
        }
        let spec = NeuronSpec {
            params: IzhikevichParams { a, b, c, d, sigma },
            state: IzhikevichState { u, v },
        };
        if self.neurons.insert(idx.0, spec).is_some() {
            return Err(NemoError::InvalidInput(format!(
                "duplicate neuron index {idx}"
            )));
        }
        Ok(())
    }

    /// Add one synapse. Delays are in whole cycles, `1..=MAX_DELAY`. At most
    /// one synapse may connect a given `(source, target, delay)` triple.
    pub fn add_synapse(
        &mut self,
        source: NeuronId,
        target: NeuronId,
        delay: u32,
        weight: f32,
        plastic: bool,
    ) -> Result<SynapseId> {
        if delay < 1 || delay > MAX_DELAY {
            return Err(NemoError::InvalidInput(format!(
                "synapse {source} -> {target} has delay {delay} outside [1, {MAX_DELAY}]"
            )));
        }
        if !weight.is_finite() {
            return Err(NemoError::InvalidInput(format!(
                "synapse {source} -> {target} has non-finite weight"
            )));
        }
        if !self.synapse_keys.insert((source.0, target.0, delay)) {
            return Err(NemoError::InvalidInput(format!(
                "duplicate synapse {source} -> {target} at delay {delay}"
            )));
        }

        let axon = self.axons.entry(source.0).or_default();
        let ordinal = axon.len() as u32;
        axon.push(SynapseSpec {
            target: target.0,
            delay,
            weight,
            plastic,
        });
        self.synapse_count += 1;
        self.max_delay = self.max_delay.max(delay);
        self.max_abs_weight = self.max_abs_weight.max(weight.abs());
        Ok(SynapseId::new(source, ordinal))
    }

    /// Construction-time synapse query: parallel `(targets, delays, weights,
    /// plastic)` columns in insertion order.
    pub fn get_synapses(
        &self,
        source: NeuronId,
    ) -> Result<(Vec<NeuronId>, Vec<u32>, Vec<f32>, Vec<bool>)> {
        if !self.neurons.contains_key(&source.0) && !self.axons.contains_key(&source.0) {
            return Err(NemoError::InvalidInput(format!(
                "unknown source neuron {source}"
            )));
        }
        let mut out: (Vec<NeuronId>, Vec<u32>, Vec<f32>, Vec<bool>) = Default::default();
        if let Some(axon) = self.axons.get(&source.0) {
            for s in axon {
                out.0.push(NeuronId(s.target));
                out.1.push(s.delay);
                out.2.push(s.weight);
                out.3.push(s.plastic);
            }
        }
        Ok(out)
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    pub fn synapse_count(&self) -> usize {
        self.synapse_count
    }

    /// Largest delay inserted so far; `0` for a synapse-free network.
    pub fn max_delay(&self) -> u32 {
        self.max_delay
    }

    /// Largest absolute weight inserted so far, which drives the
    /// fixed-point format selection.
    pub fn max_abs_weight(&self) -> f32 {
        self.max_abs_weight
    }

    /// All user neuron indices, unordered.
    pub(crate) fn neuron_ids(&self) -> Vec<u32> {
        self.neurons.keys().copied().collect()
    }

    pub(crate) fn neurons(&self) -> &AHashMap<u32, NeuronSpec> {
        &self.neurons
    }

    pub(crate) fn axons(&self) -> &AHashMap<u32, Vec<SynapseSpec>> {
        &self.axons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs_neuron(net: &mut Network, idx: u32) {
        net.add_neuron(NeuronId(idx), 0.02, 0.2, -65.0, 8.0, -13.0, -65.0, 0.0)
            .unwrap();
    }

    #[test]
    fn duplicate_neuron_index_is_rejected() {
        let mut net = Network::new();
        rs_neuron(&mut net, 4);
        let err = net
            .add_neuron(NeuronId(4), 0.1, 0.2, -65.0, 2.0, -13.0, -65.0, 0.0)
            .unwrap_err();
        assert!(matches!(err, NemoError::InvalidInput(_)));
        assert_eq!(net.neuron_count(), 1);
    }

    #[test]
    fn negative_sigma_is_rejected() {
        let mut net = Network::new();
        let err = net
            .add_neuron(NeuronId(0), 0.02, 0.2, -65.0, 8.0, -13.0, -65.0, -0.5)
            .unwrap_err();
        assert!(matches!(err, NemoError::InvalidInput(_)));
    }

    #[test]
    fn synapse_delay_bounds_are_enforced() {
        let mut net = Network::new();
        rs_neuron(&mut net, 0);
        rs_neuron(&mut net, 1);
        assert!(net
            .add_synapse(NeuronId(0), NeuronId(1), 0, 1.0, false)
            .is_err());
        assert!(net
            .add_synapse(NeuronId(0), NeuronId(1), MAX_DELAY + 1, 1.0, false)
            .is_err());
        assert!(net
            .add_synapse(NeuronId(0), NeuronId(1), MAX_DELAY, 1.0, false)
            .is_ok());
    }

    #[test]
    fn duplicate_triple_is_rejected_but_other_delays_pass() {
        let mut net = Network::new();
        rs_neuron(&mut net, 0);
        rs_neuron(&mut net, 1);
        net.add_synapse(NeuronId(0), NeuronId(1), 3, 1.0, false)
            .unwrap();
        assert!(net
            .add_synapse(NeuronId(0), NeuronId(1), 3, 2.0, false)
            .is_err());
        assert!(net
            .add_synapse(NeuronId(0), NeuronId(1), 4, 2.0, false)
            .is_ok());
        assert_eq!(net.synapse_count(), 2);
    }

    #[test]
    fn synapse_ids_carry_source_and_insertion_ordinal() {
        let mut net = Network::new();
        rs_neuron(&mut net, 7);
        rs_neuron(&mut net, 8);
        let first = net
            .add_synapse(NeuronId(7), NeuronId(8), 1, 1.0, false)
            .unwrap();
        let second = net
            .add_synapse(NeuronId(7), NeuronId(8), 2, 1.0, false)
            .unwrap();
        assert_eq!(first.source(), NeuronId(7));
        assert_eq!(first.ordinal(), 0);
        assert_eq!(second.ordinal(), 1);
    }

    #[test]
    fn construction_query_returns_insertion_order() {
        let mut net = Network::new();
        for idx in 0..3 {
            rs_neuron(&mut net, idx);
        }
        net.add_synapse(NeuronId(0), NeuronId(2), 5, 0.5, true)
            .unwrap();
        net.add_synapse(NeuronId(0), NeuronId(1), 1, -0.5, false)
            .unwrap();
        let (targets, delays, weights, plastic) = net.get_synapses(NeuronId(0)).unwrap();
        assert_eq!(targets, vec![NeuronId(2), NeuronId(1)]);
        assert_eq!(delays, vec![5, 1]);
        assert_eq!(weights, vec![0.5, -0.5]);
        assert_eq!(plastic, vec![true, false]);
        assert!(net.get_synapses(NeuronId(9)).is_err());
    }
}
