// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Raw ADC sample sources

use std::collections::VecDeque;

/// Source of raw ADC counts
pub trait Sampler {
    /// Read one raw sample
    fn read_raw(&mut self) -> u32;
}

/// Always returns the same sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedSampler(pub u32);

impl FixedSampler {
    /// Change the value returned by subsequent reads
    pub fn set(&mut self, raw: u32) {
        self.0 = raw;
    }
}

impl Sampler for FixedSampler {
    fn read_raw(&mut self) -> u32 {
        self.0
    }
}

/// Plays back a sequence, then keeps returning its last sample
#[derive(Debug, Clone, Default)]
pub struct SequenceSampler {
    pending: VecDeque<u32>,
    last: u32,
}

impl SequenceSampler {
    /// Create from a list of samples
    pub fn new(samples: impl IntoIterator<Item = u32>) -> Self {
        Self {
            pending: samples.into_iter().collect(),
            last: 0,
        }
    }

    /// Queue more samples
    pub fn push(&mut self, raw: u32) {
        self.pending.push_back(raw);
    }

    /// Samples not yet read
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Sampler for SequenceSampler {
    fn read_raw(&mut self) -> u32 {
        if let Some(raw) = self.pending.pop_front() {
            self.last = raw;
        }
        self.last
    }
}

impl<S: Sampler + ?Sized> Sampler for Box<S> {
    fn read_raw(&mut self) -> u32 {
        (**self).read_raw()
    }
}
