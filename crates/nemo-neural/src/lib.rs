// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # NeMo Neural Computation (Platform-Agnostic)
//!
//! The math layer of the NeMo simulation core, with no storage or engine
//! dependencies:
//! - **Types**: index and error types shared by every crate
//! - **Fixed-point**: Qm.n arithmetic used for deterministic current summation
//! - **Models**: the Izhikevich point-neuron model
//! - **RNG**: per-neuron Gaussian streams for thalamic noise
//! - **STDP**: the 64-bit spike-timing window function

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod fixedpoint;
pub mod models;
pub mod rng;
pub mod stdp;
pub mod types;

pub use fixedpoint::{fractional_bits, Fix};
pub use models::{IzhikevichParams, IzhikevichState};
pub use rng::NeuronRng;
pub use stdp::StdpFunction;
pub use types::{NemoError, NeuronId, Result, SynapseId};

/// Width of the per-neuron recent-firing word, and therefore the hard upper
/// bound on conductance delays and the STDP window.
pub const HISTORY_BITS: u32 = 64;

/// Largest permitted conductance delay, in cycles.
pub const MAX_DELAY: u32 = HISTORY_BITS;
