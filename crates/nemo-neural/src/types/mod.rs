// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core type definitions shared across the NeMo crates.

pub mod error;
pub mod ids;

pub use error::{NemoError, Result};
pub use ids::{NeuronId, SynapseId};
