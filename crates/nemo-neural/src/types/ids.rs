// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Identity types for neurons and synapses

use core::fmt;

/// User-facing neuron index. These are sparse: the network construction API
/// accepts any `u32` index, and the mapper translates to dense local indices
/// internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeuronId(pub u32);

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Neuron({})", self.0)
    }
}

/// Synapse identifier: the source neuron plus the per-source insertion
/// ordinal. The ordinal follows insertion order, which is what keeps synapse
/// queries stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SynapseId(pub u64);

impl SynapseId {
    pub fn new(source: NeuronId, ordinal: u32) -> Self {
        Self(((source.0 as u64) << 32) | ordinal as u64)
    }

    pub fn source(self) -> NeuronId {
        NeuronId((self.0 >> 32) as u32)
    }

    pub fn ordinal(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for SynapseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Synapse({}:{})", self.source().0, self.ordinal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synapse_id_round_trips_source_and_ordinal() {
        let id = SynapseId::new(NeuronId(901), 17);
        assert_eq!(id.source(), NeuronId(901));
        assert_eq!(id.ordinal(), 17);
    }
}
