// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # NeMo Runtime Storage
//!
//! Storage structures behind the cycle pipeline:
//! - **Mapper**: bijection between sparse user indices and dense, partitioned
//!   local indices
//! - **NeuronArray**: structure-of-arrays neuron parameters, state and RNG
//! - **RecentFiring**: double-buffered 64-cycle firing history words

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod mapper;
pub mod neuron_array;
pub mod recent_firing;

pub use mapper::Mapper;
pub use neuron_array::NeuronArray;
pub use recent_firing::RecentFiring;
