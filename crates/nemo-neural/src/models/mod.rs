// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neuron models.
//!
//! The simulation core assumes a single, homogeneous model per network; the
//! Izhikevich quadratic integrate-and-fire model is the one shipped here.

pub mod izhikevich;

pub use izhikevich::{IzhikevichParams, IzhikevichState, FIRING_THRESHOLD_MV};
