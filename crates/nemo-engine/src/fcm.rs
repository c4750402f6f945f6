// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Forward connectivity matrix.
//!
//! For every `(source, delay)` pair, a row of `{target, weight}` terminals
//! in fixed-point. Rows are accumulated in a map during construction and
//! materialized by `finalize` into a single flat terminal buffer with a
//! dense `source * max_delay + (delay − 1)` header table, so the gather
//! stage streams contiguous memory and absent rows cost one empty header.
//!
//! Within a row, terminals keep their insertion order; that is what makes
//! user weight queries stable. Auxiliary per-synapse data (delay, row
//! position, plasticity) lives in a side table keyed by source, off the hot
//! path.

use ahash::AHashMap;
use nemo_neural::{Fix, NemoError, Result, MAX_DELAY};

/// One synapse terminal as streamed by the gather stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FAxonTerminal {
    /// Local target index.
    pub target: u32,
    pub weight: Fix,
}

/// Extent of one `(source, delay)` row inside the flat terminal buffer.
#[derive(Debug, Clone, Copy, Default)]
struct RowRef {
    start: u32,
    len: u32,
}

/// Per-synapse data needed only for user queries: which row the synapse
/// lives in, where, and whether it is plastic.
#[derive(Debug, Clone, Copy)]
struct AxonTerminalAux {
    delay: u32,
    row_idx: u32,
    plastic: bool,
}

/// Forward connectivity, source-and-delay indexed.
#[derive(Debug, Clone)]
pub struct ConnectivityMatrix {
    fbits: u32,
    max_delay: u32,
    neuron_count: u32,
    /// Construction-time accumulator; drained by `finalize`.
    acc: AHashMap<(u32, u32), Vec<FAxonTerminal>>,
    row_refs: Vec<RowRef>,
    terminals: Vec<FAxonTerminal>,
    aux: AHashMap<u32, Vec<AxonTerminalAux>>,
    finalized: bool,
}

impl ConnectivityMatrix {
    pub fn new(fbits: u32) -> Self {
        Self {
            fbits,
            max_delay: 0,
            neuron_count: 0,
            acc: AHashMap::new(),
            row_refs: Vec::new(),
            terminals: Vec::new(),
            aux: AHashMap::new(),
            finalized: false,
        }
    }

    pub fn fractional_bits(&self) -> u32 {
        self.fbits
    }

    /// Largest delay of any inserted row; computed as rows are inserted,
    /// fixed after `finalize`.
    pub fn max_delay(&self) -> u32 {
        self.max_delay
    }

    /// Insert the complete terminal row for one `(source, delay)` pair.
    /// Each pair may be inserted once.
    pub fn set_row(
        &mut self,
        source: u32,
        delay: u32,
        terminals: Vec<FAxonTerminal>,
    ) -> Result<()> {
        if self.finalized {
            return Err(NemoError::Logic(
                "row insertion after connectivity matrix finalization".into(),
            ));
        }
        if delay < 1 || delay > MAX_DELAY {
            return Err(NemoError::InvalidInput(format!(
                "neuron {source} has synapses with delay {delay} outside [1, {MAX_DELAY}]"
            )));
        }
        if self.acc.insert((source, delay), terminals).is_some() {
            return Err(NemoError::InvalidInput(format!(
                "double insertion of connectivity row ({source}, {delay})"
            )));
        }
        self.max_delay = self.max_delay.max(delay);
        Ok(())
    }

    /// Record query-side data for one synapse, in insertion order.
    pub fn push_aux(&mut self, source: u32, delay: u32, row_idx: u32, plastic: bool) {
        self.aux.entry(source).or_default().push(AxonTerminalAux {
            delay,
            row_idx,
            plastic,
        });
    }

    /// Materialize the flat row table for `neuron_count` local sources.
    pub fn finalize(&mut self, neuron_count: u32) -> Result<()> {
        if self.finalized {
            return Err(NemoError::Logic(
                "connectivity matrix finalized twice".into(),
            ));
        }
        self.neuron_count = neuron_count;
        self.row_refs = vec![
            RowRef::default();
            neuron_count as usize * self.max_delay as usize
        ];

        let mut acc = core::mem::take(&mut self.acc);
        let terminal_count: usize = acc.values().map(Vec::len).sum();
        self.terminals = Vec::with_capacity(terminal_count);

        for source in 0..neuron_count {
            for delay in 1..=self.max_delay {
                let Some(row) = acc.remove(&(source, delay)) else {
                    continue; // absent rows stay length 0
                };
                let start = self.terminals.len() as u32;
                let len = row.len() as u32;
                self.terminals.extend(row);
                self.row_refs[Self::address_of(source, delay, self.max_delay)] =
                    RowRef { start, len };
            }
        }

        if let Some((&(source, delay), _)) = acc.iter().next() {
            return Err(NemoError::Logic(format!(
                "connectivity row ({source}, {delay}) outside the mapped neuron range"
            )));
        }

        self.finalized = true;
        Ok(())
    }

    #[inline]
    fn address_of(source: u32, delay: u32, max_delay: u32) -> usize {
        source as usize * max_delay as usize + (delay - 1) as usize
    }

    /// The terminal row of `(source, delay)`; empty for absent rows.
    #[inline]
    pub fn get_row(&self, source: u32, delay: u32) -> &[FAxonTerminal] {
        debug_assert!(self.finalized);
        let r = self.row_refs[Self::address_of(source, delay, self.max_delay)];
        &self.terminals[r.start as usize..(r.start + r.len) as usize]
    }

    /// Flat-buffer address of one terminal, for the reverse matrix.
    pub fn forward_address(&self, source: u32, delay: u32, row_idx: u32) -> u32 {
        debug_assert!(self.finalized);
        let r = self.row_refs[Self::address_of(source, delay, self.max_delay)];
        debug_assert!(row_idx < r.len);
        r.start + row_idx
    }

    #[inline]
    pub fn weight(&self, forward_address: u32) -> Fix {
        self.terminals[forward_address as usize].weight
    }

    #[inline]
    pub fn set_weight(&mut self, forward_address: u32, weight: Fix) {
        self.terminals[forward_address as usize].weight = weight;
    }

    /// Number of non-empty rows, for incoming-queue sizing.
    pub fn row_count(&self) -> usize {
        self.row_refs.iter().filter(|r| r.len > 0).count()
    }

    /// One synapse by its per-source insertion ordinal:
    /// `(local target, delay, weight, plastic)`.
    pub fn synapse(&self, source: u32, ordinal: u32) -> Result<(u32, u32, f32, bool)> {
        let entry = self
            .aux
            .get(&source)
            .and_then(|aux| aux.get(ordinal as usize))
            .ok_or_else(|| {
                NemoError::InvalidInput(format!("unknown synapse {source}:{ordinal}"))
            })?;
        let terminal = self.get_row(source, entry.delay)[entry.row_idx as usize];
        Ok((
            terminal.target,
            entry.delay,
            terminal.weight.to_float(self.fbits),
            entry.plastic,
        ))
    }

    /// All synapses of one source in insertion order, as parallel
    /// `(local targets, delays, weights, plastic)` columns with weights
    /// converted back to float.
    pub fn get_synapses(
        &self,
        source: u32,
    ) -> Result<(Vec<u32>, Vec<u32>, Vec<f32>, Vec<bool>)> {
        if source >= self.neuron_count {
            return Err(NemoError::InvalidInput(format!(
                "invalid source neuron {source}"
            )));
        }
        let Some(aux) = self.aux.get(&source) else {
            return Ok(Default::default());
        };

        let mut targets = Vec::with_capacity(aux.len());
        let mut delays = Vec::with_capacity(aux.len());
        let mut weights = Vec::with_capacity(aux.len());
        let mut plastic = Vec::with_capacity(aux.len());
        for entry in aux {
            let terminal = self.get_row(source, entry.delay)[entry.row_idx as usize];
            targets.push(terminal.target);
            delays.push(entry.delay);
            weights.push(terminal.weight.to_float(self.fbits));
            plastic.push(entry.plastic);
        }
        Ok((targets, delays, weights, plastic))
    }
}
