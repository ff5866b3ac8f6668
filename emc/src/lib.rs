// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! The per-worker Exact-Match Cache (EMC): a fixed-size, open-addressed
//! cache mapping a flow key's hash to an installed flow, making repeated
//! lookups of the same flow branch-free.
//!
//! Exactly one worker owns an EMC; the non-worker pseudo-worker's EMC is
//! serialized by the non-worker-mutex rather than by anything in this
//! crate. No operation here can fail, so there is no error type.

use dpcls::FlowKey;

/// Default `log2` of the cache's slot count: `2^EMC_SHIFT` entries.
pub const EMC_SHIFT: u32 = 13;
/// Default number of probe positions tried per key.
pub const EMC_SEGS: u32 = 2;
/// Number of entries in the default-shaped cache (`2^EMC_SHIFT`).
pub const EMC_ENTRIES: usize = 1 << EMC_SHIFT;

/// Something an EMC entry can point at. A flow is "alive" iff its entry's
/// `flow` is present and `is_alive` returns `true`; once a flow dies,
/// stale entries pointing at it are reclaimed lazily by
/// [`Emc::slow_sweep`].
pub trait Liveness {
    /// Whether the referenced flow is still installed.
    fn is_alive(&self) -> bool;
}

#[derive(Clone)]
struct Entry<F: Clone> {
    key: FlowKey,
    flow: F,
}

/// A fixed-size, open-addressed exact-match cache.
pub struct Emc<F: Clone + Liveness> {
    entries: Vec<Option<Entry<F>>>,
    shift: u32,
    segs: u32,
    mask: u32,
    sweep_cursor: usize,
}

impl<F: Clone + Liveness> Emc<F> {
    /// Construct a new, empty EMC with [`EMC_ENTRIES`] slots and
    /// [`EMC_SEGS`] probe segments.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shape(EMC_SHIFT, EMC_SEGS)
    }

    /// Construct a new, empty EMC with `2^shift` slots and `segs` probe
    /// segments, as configured by the running datapath's `emc_shift` and
    /// `emc_segs` settings.
    #[must_use]
    pub fn with_shape(shift: u32, segs: u32) -> Self {
        Emc {
            entries: vec![None; 1 << shift],
            shift,
            segs,
            mask: (1u32 << shift) - 1,
            sweep_cursor: 0,
        }
    }

    fn probe_positions(&self, hash: u32) -> Vec<usize> {
        (0..self.segs)
            .map(|i| {
                let shifted = hash >> (i * self.shift);
                (shifted & self.mask) as usize
            })
            .collect()
    }

    fn entry_is_alive(entry: &Entry<F>) -> bool {
        entry.flow.is_alive()
    }

    /// Probe the cache for `key`. Returns the first alive entry whose hash
    /// matches and whose key is byte-identical to `key`.
    pub fn lookup(&self, key: &FlowKey) -> Option<F> {
        for pos in self.probe_positions(key.hash()) {
            if let Some(entry) = &self.entries[pos] {
                if entry.key.hash() == key.hash()
                    && Self::entry_is_alive(entry)
                    && entry.key == *key
                {
                    return Some(entry.flow.clone());
                }
            }
        }
        None
    }

    /// Install `flow` under `key`. If a probed slot already holds `key`,
    /// its flow pointer is replaced; otherwise the first empty slot is
    /// used, or (failing that) the alive slot with the smallest stored
    /// hash among the probed positions, with ties broken by probe order.
    pub fn insert(&mut self, key: FlowKey, flow: F) {
        let positions = self.probe_positions(key.hash());

        for &pos in &positions {
            if let Some(entry) = &self.entries[pos] {
                if entry.key == key {
                    self.entries[pos] = Some(Entry { key, flow });
                    return;
                }
            }
        }

        if let Some(&empty) = positions.iter().find(|&&pos| self.entries[pos].is_none()) {
            self.entries[empty] = Some(Entry { key, flow });
            return;
        }

        let victim = positions
            .iter()
            .copied()
            .min_by_key(|&pos| self.entries[pos].as_ref().map(|e| e.key.hash()))
            .unwrap_or(positions[0]);
        self.entries[victim] = Some(Entry { key, flow });
    }

    /// Visit one entry per invocation (cursor advances modulo
    /// [`EMC_ENTRIES`]); clears it if it is occupied by a now-dead flow.
    /// Bounds the memory held by stale entries without a global scan.
    pub fn slow_sweep(&mut self) {
        let pos = self.sweep_cursor;
        self.sweep_cursor = (self.sweep_cursor + 1) % self.entries.len();
        if let Some(entry) = &self.entries[pos] {
            if !Self::entry_is_alive(entry) {
                self.entries[pos] = None;
            }
        }
    }
}

impl<F: Clone + Liveness> Default for Emc<F> {
    fn default() -> Self {
        Self::new()
    }
}
