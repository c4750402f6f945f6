// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # NeMo Simulation Engine
//!
//! Cycle-driven simulation of spiking neural networks with the Izhikevich
//! neuron model, conductance-delayed synapses and STDP.
//!
//! ## Architecture
//! - Immutable network description built through [`Network`], locked when a
//!   [`Simulation`] is created from it
//! - Forward connectivity streamed by the gather stage, reverse connectivity
//!   indexed by the STDP stage, both materialized into flat buffers at
//!   finalization
//! - A ring of per-future-cycle spike bins connects the scatter stage of one
//!   cycle to the gather stage of a later one
//! - Fixed-point current accumulation so every stage is deterministic under
//!   intra-cycle parallelism

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod config;
pub mod fcm;
pub mod firing_buffer;
pub mod incoming;
pub mod network;
pub mod outgoing;
pub mod rcm;
pub mod simulation;
pub mod timer;

pub use backend::{BackendType, ComputeBackend, CpuBackend};
pub use config::Configuration;
pub use firing_buffer::{FiredList, FiringBuffer};
pub use network::Network;
pub use simulation::{CycleStats, Simulation, SynapseQuery};

pub use nemo_neural::{Fix, NemoError, NeuronId, Result, SynapseId, MAX_DELAY};
