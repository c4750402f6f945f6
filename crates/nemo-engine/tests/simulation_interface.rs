// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulation interface boundaries: degenerate networks, stimulus
//! validation, maximum delays, synapse queries and the unsupported paths.

use nemo_engine::{
    Configuration, Fix, NemoError, Network, NeuronId, Simulation, MAX_DELAY,
};

fn rs_neuron(net: &mut Network, idx: u32) {
    net.add_neuron(NeuronId(idx), 0.02, 0.2, -65.0, 8.0, 0.2 * -65.0, -65.0, 0.0)
        .unwrap();
}

#[test]
fn empty_network_steps_without_firing() {
    let net = Network::new();
    let mut sim = Simulation::new(net, &Configuration::default()).unwrap();
    for _ in 0..10 {
        assert!(sim.step(&[]).unwrap().is_empty());
    }
    assert_eq!(sim.elapsed_simulation(), 10);
    assert!(sim.read_firing().is_empty());
}

#[test]
fn single_neuron_network_handles_forced_firing() {
    let mut net = Network::new();
    rs_neuron(&mut net, 42);
    let mut sim = Simulation::new(net, &Configuration::default()).unwrap();

    assert!(sim.step(&[]).unwrap().is_empty());
    assert_eq!(sim.step(&[NeuronId(42)]).unwrap(), vec![NeuronId(42)]);
    assert!(sim.step(&[]).unwrap().is_empty());
}

#[test]
fn duplicate_stimulus_entries_fire_once() {
    let mut net = Network::new();
    rs_neuron(&mut net, 0);
    let mut sim = Simulation::new(net, &Configuration::default()).unwrap();
    let fired = sim
        .step(&[NeuronId(0), NeuronId(0), NeuronId(0)])
        .unwrap();
    assert_eq!(fired, vec![NeuronId(0)]);
    assert_eq!(sim.read_firing().len(), 1);
}

#[test]
fn unknown_stimulus_index_fails_and_leaves_state_unchanged() {
    let mut net = Network::new();
    rs_neuron(&mut net, 0);
    let mut sim = Simulation::new(net, &Configuration::default()).unwrap();

    let err = sim.step(&[NeuronId(0), NeuronId(7)]).unwrap_err();
    assert!(matches!(err, NemoError::InvalidInput(_)));
    // The failed call consumed no cycle and recorded no firing.
    assert_eq!(sim.elapsed_simulation(), 0);
    assert!(sim.read_firing().is_empty());
    assert_eq!(sim.step(&[NeuronId(0)]).unwrap(), vec![NeuronId(0)]);
}

#[test]
fn max_delay_spike_is_delivered_after_exactly_64_cycles() {
    let mut net = Network::new();
    rs_neuron(&mut net, 0);
    rs_neuron(&mut net, 1);
    net.add_synapse(NeuronId(0), NeuronId(1), MAX_DELAY, 250.0, false)
        .unwrap();
    let mut sim = Simulation::new(net, &Configuration::default()).unwrap();

    assert_eq!(sim.step(&[NeuronId(0)]).unwrap(), vec![NeuronId(0)]);
    for cycle in 1..MAX_DELAY as u64 {
        assert!(sim.step(&[]).unwrap().is_empty(), "cycle {cycle}");
    }
    assert_eq!(sim.step(&[]).unwrap(), vec![NeuronId(1)]);
}

#[test]
fn synapse_to_nonexistent_target_fails_finalization() {
    let mut net = Network::new();
    rs_neuron(&mut net, 0);
    net.add_synapse(NeuronId(0), NeuronId(5), 1, 1.0, false)
        .unwrap();
    assert!(matches!(
        Simulation::new(net, &Configuration::default()),
        Err(NemoError::InvalidInput(_))
    ));
}

#[test]
fn synapse_query_round_trips_insertion_order_and_values() {
    let mut net = Network::new();
    for idx in 0..4 {
        rs_neuron(&mut net, idx);
    }
    let inserted = [
        (NeuronId(3), 7u32, 1.5f32, false),
        (NeuronId(1), 2, -0.75, true),
        (NeuronId(2), 7, 0.25, false),
        (NeuronId(1), 1, 2.5, true),
    ];
    for &(target, delay, weight, plastic) in &inserted {
        net.add_synapse(NeuronId(0), target, delay, weight, plastic)
            .unwrap();
    }

    let sim = Simulation::new(net, &Configuration::default()).unwrap();
    let query = sim.get_synapses_from(NeuronId(0)).unwrap();
    let quantum = 1.0 / (1u64 << sim.fractional_bits()) as f32;
    for (i, &(target, delay, weight, plastic)) in inserted.iter().enumerate() {
        assert_eq!(query.targets[i], target);
        assert_eq!(query.delays[i], delay);
        assert_eq!(query.plastic[i], plastic);
        assert!((query.weights[i] - weight).abs() <= quantum);
    }

    // A neuron with no outgoing synapses queries empty; an unknown one is an
    // input error.
    assert!(sim.get_synapses_from(NeuronId(3)).unwrap().targets.is_empty());
    assert!(sim.get_synapses_from(NeuronId(99)).is_err());
}

#[test]
fn per_synapse_getters_resolve_ids_from_construction() {
    let mut net = Network::new();
    for idx in 0..3 {
        rs_neuron(&mut net, idx);
    }
    let first = net
        .add_synapse(NeuronId(0), NeuronId(2), 6, 1.25, true)
        .unwrap();
    let second = net
        .add_synapse(NeuronId(0), NeuronId(1), 2, -0.5, false)
        .unwrap();

    let sim = Simulation::new(net, &Configuration::default()).unwrap();
    assert_eq!(sim.get_synapse_target(first).unwrap(), NeuronId(2));
    assert_eq!(sim.get_synapse_delay(first).unwrap(), 6);
    assert!(sim.get_synapse_plastic(first).unwrap());
    assert!((sim.get_synapse_weight(first).unwrap() - 1.25).abs() < 1e-4);

    assert_eq!(sim.get_synapse_target(second).unwrap(), NeuronId(1));
    assert!(!sim.get_synapse_plastic(second).unwrap());

    // An ordinal past the source's synapse count is an input error.
    let bogus = nemo_engine::SynapseId::new(NeuronId(0), 2);
    assert!(sim.get_synapse_target(bogus).is_err());
}

#[test]
fn stepping_without_plastic_activity_leaves_weights_unchanged() {
    let mut net = Network::new();
    for idx in 0..3 {
        rs_neuron(&mut net, idx);
    }
    net.add_synapse(NeuronId(0), NeuronId(1), 1, 30.0, false)
        .unwrap();
    net.add_synapse(NeuronId(0), NeuronId(2), 4, -10.0, true)
        .unwrap();
    let mut sim = Simulation::new(net, &Configuration::default()).unwrap();

    let before = sim.get_synapses_from(NeuronId(0)).unwrap();
    sim.step(&[NeuronId(0)]).unwrap();
    for _ in 0..10 {
        sim.step(&[]).unwrap();
    }
    assert_eq!(sim.get_synapses_from(NeuronId(0)).unwrap(), before);
}

#[test]
fn current_stimulus_vector_is_unsupported_on_cpu() {
    let mut net = Network::new();
    rs_neuron(&mut net, 0);
    let mut sim = Simulation::new(net, &Configuration::default()).unwrap();
    let err = sim.set_current_stimulus(&[Fix::ZERO]).unwrap_err();
    assert!(matches!(err, NemoError::Unsupported(_)));
    assert_eq!(err.error_number(), 5);
}

#[test]
fn neuron_state_queries_reflect_simulation() {
    let mut net = Network::new();
    rs_neuron(&mut net, 9);
    let mut sim = Simulation::new(net, &Configuration::default()).unwrap();

    let (params, state) = sim.get_neuron(NeuronId(9)).unwrap();
    assert_eq!(params.c, -65.0);
    assert_eq!(state.v, -65.0);
    assert_eq!(sim.get_membrane_potential(NeuronId(9)).unwrap(), -65.0);

    // Forced firing resets v to c after the cycle.
    sim.step(&[NeuronId(9)]).unwrap();
    assert_eq!(sim.get_membrane_potential(NeuronId(9)).unwrap(), -65.0);
    assert!(sim.get_membrane_potential(NeuronId(10)).is_err());
}

#[test]
fn timers_track_cycles_and_reset() {
    let net = Network::new();
    let mut sim = Simulation::new(net, &Configuration::default()).unwrap();
    for _ in 0..5 {
        sim.step(&[]).unwrap();
    }
    assert_eq!(sim.elapsed_simulation(), 5);
    sim.reset_timer();
    assert_eq!(sim.elapsed_simulation(), 0);
    sim.step(&[]).unwrap();
    assert_eq!(sim.elapsed_simulation(), 1);
}

#[test]
fn backend_reports_its_name() {
    let net = Network::new();
    let mut conf = Configuration::default();
    conf.set_cpu_backend(Some(2));
    let sim = Simulation::new(net, &conf).unwrap();
    assert_eq!(sim.backend_name(), "CPU");
}

#[test]
fn sparse_user_indices_are_preserved_in_output() {
    let mut net = Network::new();
    rs_neuron(&mut net, 1_000_000);
    rs_neuron(&mut net, 5);
    net.add_synapse(NeuronId(5), NeuronId(1_000_000), 1, 250.0, false)
        .unwrap();
    let mut sim = Simulation::new(net, &Configuration::default()).unwrap();

    assert_eq!(sim.step(&[NeuronId(5)]).unwrap(), vec![NeuronId(5)]);
    assert_eq!(sim.step(&[]).unwrap(), vec![NeuronId(1_000_000)]);
}
