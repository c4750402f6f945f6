// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! The cycle pipeline.
//!
//! One `step` advances the network by a millisecond:
//!
//! 1. **Gather** — drain the current incoming bin and stream the referenced
//!    forward rows into the per-neuron fixed-point current accumulators
//!    (excitatory and inhibitory buckets, saturating)
//! 2. **Noise + integrate** — convert currents to float, add thalamic noise
//!    and run the sub-stepped Izhikevich update on the selected backend
//! 3. **Force** — OR the external firing stimulus into the firing decisions
//! 4. **Reset** — `v ← c`, `u ← u + d` for every fired neuron
//! 5. **History** — shift the firing bit into the write half of the
//!    recent-firing ring
//! 6. **Scatter** — enqueue each fired neuron's outgoing groups into future
//!    incoming bins
//! 7. **STDP** — accumulate pending weight deltas against the just-written
//!    history
//! 8. **Commit** — record firing output, advance the cycle counter, swap the
//!    history buffers
//!
//! Stages see a consistent snapshot: integration reads only the currents
//! gathered in stage 1, scatter writes only future bins, and the STDP scan
//! reads the post-update history half. Current accumulation is fixed-point,
//! so intra-stage parallelism cannot change results.

use std::sync::OnceLock;

use nemo_neural::{
    fractional_bits, Fix, IzhikevichParams, IzhikevichState, NemoError, NeuronId, Result,
    StdpFunction, SynapseId,
};
use nemo_runtime::{Mapper, NeuronArray, RecentFiring};
use tracing::{trace, warn};

use crate::backend::{BackendType, ComputeBackend, CpuBackend};
use crate::config::Configuration;
use crate::fcm::{ConnectivityMatrix, FAxonTerminal};
use crate::firing_buffer::{FiredList, FiringBuffer};
use crate::incoming::{IncomingQueue, SpikeGroup};
use crate::network::Network;
use crate::outgoing::OutgoingIndex;
use crate::rcm::{RSynapse, ReverseMatrix};
use crate::timer::Timer;

/// Runtime-gated firing trace. Enable with `NEMO_TRACE_FIRING=1`; restrict
/// to one neuron with `NEMO_TRACE_NEURON=<user index>`.
struct FiringTraceCfg {
    enabled: bool,
    neuron_filter: Option<u32>,
}

fn firing_trace_cfg() -> &'static FiringTraceCfg {
    static CFG: OnceLock<FiringTraceCfg> = OnceLock::new();
    CFG.get_or_init(|| {
        let enabled = std::env::var("NEMO_TRACE_FIRING")
            .ok()
            .as_deref()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let neuron_filter = std::env::var("NEMO_TRACE_NEURON")
            .ok()
            .and_then(|v| v.parse().ok());
        FiringTraceCfg {
            enabled,
            neuron_filter,
        }
    })
}

/// Synapse query result: four parallel columns in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynapseQuery {
    pub targets: Vec<NeuronId>,
    pub delays: Vec<u32>,
    pub weights: Vec<f32>,
    pub plastic: Vec<bool>,
}

/// Diagnostics for the most recent cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleStats {
    pub neurons_fired: usize,
    pub synapses_streamed: usize,
    /// Accumulator saturations this cycle. Non-zero means the fixed-point
    /// format is too hot for the network's activity.
    pub accumulator_saturations: usize,
}

/// A finalized, runnable simulation.
pub struct Simulation {
    mapper: Mapper,
    neurons: NeuronArray,
    recent: RecentFiring,
    cm: ConnectivityMatrix,
    rcm: ReverseMatrix,
    outgoing: OutgoingIndex,
    incoming: IncomingQueue,
    stdp: Option<StdpFunction>,
    backend: Box<dyn ComputeBackend>,

    current_e: Vec<Fix>,
    current_i: Vec<Fix>,
    current: Vec<f32>,
    /// Sticky per-neuron saturation bits, diagnostics only.
    overflow: Vec<bool>,
    fired: Vec<bool>,
    gather_scratch: Vec<SpikeGroup>,

    firing: FiringBuffer,
    timer: Timer,
    stats: CycleStats,
    fbits: u32,
}

impl Simulation {
    /// Finalize `net` into a runnable simulation. Taking the network by
    /// value is the lock: once finalized, no further construction calls can
    /// be expressed. Clone the description first to seed several
    /// simulations.
    pub fn new(net: Network, conf: &Configuration) -> Result<Self> {
        let mapper = Mapper::new(net.neuron_ids(), conf.partition_size())?;
        let count = mapper.neuron_count();

        let fbits = match conf.fractional_bits() {
            Some(fbits) => fbits,
            None => fractional_bits(net.max_abs_weight()),
        };

        let (cm, rcm) = Self::build_connectivity(&net, &mapper, fbits)?;
        let outgoing = OutgoingIndex::build(&cm, &mapper);
        let incoming = IncomingQueue::new(
            cm.max_delay(),
            outgoing.total_group_span(),
            conf.incoming_size_multiplier(),
        );

        let mut neurons = NeuronArray::new(count, conf.seed());
        for (&global, spec) in net.neurons() {
            let local = mapper.local_idx(NeuronId(global))?;
            neurons.set(local as usize, spec.params, spec.state)?;
        }

        let backend: Box<dyn ComputeBackend> = match conf.backend() {
            BackendType::Cpu | BackendType::Auto => Box::new(CpuBackend::new(conf.cpu_threads())?),
        };

        Ok(Self {
            mapper,
            neurons,
            recent: RecentFiring::new(count),
            cm,
            rcm,
            outgoing,
            incoming,
            stdp: conf.stdp_function().cloned(),
            backend,
            current_e: vec![Fix::ZERO; count],
            current_i: vec![Fix::ZERO; count],
            current: vec![0.0; count],
            overflow: vec![false; count],
            fired: vec![false; count],
            gather_scratch: Vec::new(),
            firing: FiringBuffer::new(),
            timer: Timer::new(),
            stats: CycleStats::default(),
            fbits,
        })
    }

    /// Materialize forward and reverse matrices from the builder maps.
    fn build_connectivity(
        net: &Network,
        mapper: &Mapper,
        fbits: u32,
    ) -> Result<(ConnectivityMatrix, ReverseMatrix)> {
        let count = mapper.neuron_count();
        let mut cm = ConnectivityMatrix::new(fbits);

        // Insertion-ordered synapse records per source, for the reverse
        // matrix pass: (delay, row position, target local, weight, plastic).
        let mut records: Vec<Vec<(u32, u32, u32, f32, bool)>> = vec![Vec::new(); count];

        for local in 0..count as u32 {
            let global = mapper.global_idx(local);
            let Some(axon) = net.axons().get(&global.0) else {
                continue;
            };

            let mut rows: Vec<(u32, Vec<FAxonTerminal>)> = Vec::new();
            for spec in axon {
                let target = mapper.local_idx(NeuronId(spec.target)).map_err(|_| {
                    NemoError::InvalidInput(format!(
                        "synapse {global} -> Neuron({}) references a non-existent target",
                        spec.target
                    ))
                })?;

                let pos = match rows.iter().position(|(d, _)| *d == spec.delay) {
                    Some(pos) => pos,
                    None => {
                        rows.push((spec.delay, Vec::new()));
                        rows.len() - 1
                    }
                };
                let row = &mut rows[pos].1;
                let row_idx = row.len() as u32;
                row.push(FAxonTerminal {
                    target,
                    weight: Fix::from_float(spec.weight, fbits),
                });
                cm.push_aux(local, spec.delay, row_idx, spec.plastic);
                records[local as usize].push((spec.delay, row_idx, target, spec.weight, spec.plastic));
            }

            rows.sort_unstable_by_key(|(delay, _)| *delay);
            for (delay, terminals) in rows {
                cm.set_row(local, delay, terminals)?;
            }
        }
        cm.finalize(count as u32)?;

        let mut reverse_rows: Vec<Vec<RSynapse>> = vec![Vec::new(); count];
        for (source, row) in records.into_iter().enumerate() {
            for (delay, row_idx, target, weight, plastic) in row {
                if !plastic {
                    continue;
                }
                reverse_rows[target as usize].push(RSynapse {
                    source: source as u32,
                    delay,
                    forward_address: cm.forward_address(source as u32, delay, row_idx),
                    excitatory: weight >= 0.0,
                });
            }
        }

        Ok((cm, ReverseMatrix::build(reverse_rows)))
    }

    /// Advance the simulation one millisecond. `fstim` lists neurons forced
    /// to fire this cycle; the returned list is every neuron that fired,
    /// forced or natural, in ascending index order.
    pub fn step(&mut self, fstim: &[NeuronId]) -> Result<Vec<NeuronId>> {
        // Validate the stimulus up front so an error leaves state untouched.
        let mut stim_locals = Vec::with_capacity(fstim.len());
        for &id in fstim {
            stim_locals.push(self.mapper.local_idx(id)? as usize);
        }

        let cycle = self.timer.elapsed_simulation();
        let count = self.neurons.count();

        // 1. Gather.
        let mut saturations = 0usize;
        let mut streamed = 0usize;
        self.incoming.drain_into(cycle, &mut self.gather_scratch);
        for group in &self.gather_scratch {
            let row = self.cm.get_row(group.source, group.delay);
            streamed += row.len();
            for terminal in row {
                let (acc, sat) = if terminal.weight.is_negative() {
                    let (sum, sat) = self.current_i[terminal.target as usize]
                        .saturating_add(terminal.weight);
                    self.current_i[terminal.target as usize] = sum;
                    (terminal.target as usize, sat)
                } else {
                    let (sum, sat) = self.current_e[terminal.target as usize]
                        .saturating_add(terminal.weight);
                    self.current_e[terminal.target as usize] = sum;
                    (terminal.target as usize, sat)
                };
                if sat {
                    self.overflow[acc] = true;
                    saturations += 1;
                }
            }
        }

        // 2–3. Noise and integration on the backend. The bucket sum cannot
        // overflow: one accumulator is non-negative, the other non-positive.
        for n in 0..count {
            let (sum, _) = self.current_e[n].saturating_add(self.current_i[n]);
            self.current[n] = sum.to_float(self.fbits);
            self.current_e[n] = Fix::ZERO;
            self.current_i[n] = Fix::ZERO;
        }
        self.backend
            .update_neurons(&mut self.neurons, &self.current, &mut self.fired)?;

        // The firing set is the union of natural and forced firings; the
        // history bit below is set once either way.
        for &local in &stim_locals {
            self.fired[local] = true;
        }

        // 4. Reset fired neurons.
        self.neurons.reset_fired(&self.fired);

        // 5. Record history into the write half.
        for n in 0..count {
            self.recent.update(n, self.fired[n]);
        }

        // 6. Scatter into future bins.
        for n in 0..count {
            if !self.fired[n] || self.outgoing.delay_bits(n as u32) == 0 {
                continue;
            }
            let source_partition = self.mapper.partition_of(n as u32);
            for group in self.outgoing.groups(n as u32) {
                self.incoming.enqueue(
                    cycle,
                    SpikeGroup {
                        source: n as u32,
                        source_partition,
                        delay: group.delay,
                    },
                )?;
            }
        }

        // 7. STDP accumulation against the just-written history.
        if let Some(stdp) = &self.stdp {
            self.rcm.accumulate_cycle(&self.recent, stdp, self.fbits);
        }

        // 8. Commit: firing output, counters, history swap.
        let trace_cfg = firing_trace_cfg();
        let mut fired_out = Vec::new();
        for n in 0..count {
            if !self.fired[n] {
                continue;
            }
            let global = self.mapper.global_idx(n as u32);
            if trace_cfg.enabled
                && trace_cfg
                    .neuron_filter
                    .map(|id| id == global.0)
                    .unwrap_or(true)
            {
                trace!(
                    target: "nemo-trace",
                    "cycle={cycle} neuron={} fired (local {n})",
                    global.0
                );
            }
            self.firing.push(cycle, global);
            fired_out.push(global);
        }

        if saturations > 0 {
            warn!(
                "cycle {cycle}: {saturations} current-accumulator saturation(s); \
                 consider fewer fractional bits"
            );
        }

        self.stats = CycleStats {
            neurons_fired: fired_out.len(),
            synapses_streamed: streamed,
            accumulator_saturations: saturations,
        };

        self.timer.step()?;
        self.recent.commit();
        Ok(fired_out)
    }

    /// Everything that fired since the last read, in cycle order.
    pub fn read_firing(&mut self) -> FiredList {
        self.firing.read_firing()
    }

    /// Discard buffered firing output.
    pub fn flush_firing_buffer(&mut self) {
        self.firing.flush();
    }

    /// Flush pending STDP deltas into the live weights with a reward
    /// multiplier. `reward == 0` clears the accumulators without touching
    /// weights.
    pub fn apply_stdp(&mut self, reward: f32) -> Result<()> {
        let Some(stdp) = &self.stdp else {
            return Err(NemoError::Logic(
                "apply_stdp called but no STDP function is configured".into(),
            ));
        };
        if !self.backend.supports_stdp() {
            return Err(NemoError::Unsupported(format!(
                "STDP is not supported on the {} backend",
                self.backend.backend_name()
            )));
        }
        let min_weight = Fix::from_float(stdp.min_weight(), self.fbits);
        let max_weight = Fix::from_float(stdp.max_weight(), self.fbits);
        self.rcm.apply(reward, &mut self.cm, min_weight, max_weight);
        Ok(())
    }

    /// All synapses of `source` in insertion order, weights converted back
    /// to float (so they reflect any STDP updates, quantized).
    pub fn get_synapses_from(&self, source: NeuronId) -> Result<SynapseQuery> {
        let local = self.mapper.local_idx(source)?;
        let (targets, delays, weights, plastic) = self.cm.get_synapses(local)?;
        Ok(SynapseQuery {
            targets: targets
                .into_iter()
                .map(|t| self.mapper.global_idx(t))
                .collect(),
            delays,
            weights,
            plastic,
        })
    }

    /// Resolve a synapse id to `(local target, delay, weight, plastic)`.
    fn synapse(&self, synapse: SynapseId) -> Result<(u32, u32, f32, bool)> {
        let source = self.mapper.local_idx(synapse.source())?;
        self.cm.synapse(source, synapse.ordinal())
    }

    pub fn get_synapse_target(&self, synapse: SynapseId) -> Result<NeuronId> {
        self.synapse(synapse)
            .map(|(target, ..)| self.mapper.global_idx(target))
    }

    pub fn get_synapse_delay(&self, synapse: SynapseId) -> Result<u32> {
        self.synapse(synapse).map(|(_, delay, ..)| delay)
    }

    pub fn get_synapse_weight(&self, synapse: SynapseId) -> Result<f32> {
        self.synapse(synapse).map(|(_, _, weight, _)| weight)
    }

    pub fn get_synapse_plastic(&self, synapse: SynapseId) -> Result<bool> {
        self.synapse(synapse).map(|(.., plastic)| plastic)
    }

    /// Install a whole-vector current stimulus for the next cycle.
    pub fn set_current_stimulus(&mut self, _current: &[Fix]) -> Result<()> {
        Err(NemoError::Unsupported(format!(
            "setting a current stimulus vector is not supported on the {} backend",
            self.backend.backend_name()
        )))
    }

    pub fn get_membrane_potential(&self, neuron: NeuronId) -> Result<f32> {
        let local = self.mapper.local_idx(neuron)?;
        self.neurons.membrane_potential(local as usize)
    }

    pub fn get_neuron(&self, neuron: NeuronId) -> Result<(IzhikevichParams, IzhikevichState)> {
        let local = self.mapper.local_idx(neuron)?;
        self.neurons.get(local as usize)
    }

    /// Per-neuron sticky saturation count, for diagnostics.
    pub fn accumulator_overflow_count(&self) -> usize {
        self.overflow.iter().filter(|&&b| b).count()
    }

    pub fn cycle_stats(&self) -> CycleStats {
        self.stats
    }

    pub fn fractional_bits(&self) -> u32 {
        self.fbits
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.count()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Milliseconds of simulated time since the last timer reset.
    pub fn elapsed_simulation(&self) -> u64 {
        self.timer.elapsed_simulation()
    }

    /// Wall-clock milliseconds since the last timer reset.
    pub fn elapsed_wallclock(&self) -> u64 {
        self.timer.elapsed_wallclock()
    }

    pub fn reset_timer(&mut self) {
        self.timer.reset();
    }
}
