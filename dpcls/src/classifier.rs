// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The tuple-space classifier (DPCLS): an ordered, hash-indexed collection
//! of subtables, readable lock-free under epoch protection while a single
//! writer installs or removes rules.
//!
//! Concurrency is built the same way the VPC map in the example corpus
//! wraps a plain `HashMap` with `left_right`: the writer mutates one copy
//! directly and the reader copy is brought up to date by cloning, not by
//! replaying the change log. This keeps the classifier's invariants (at
//! most one subtable per mask, insertion order preserved) trivially true on
//! both sides of the left-right split.

use crate::key::{FlowKey, Mask};
use crate::rule::Rule;
use crate::subtable::Subtable;
use ahash::RandomState;
use left_right::{Absorb, ReadHandle, WriteHandle, new_from_empty};
use std::collections::HashMap;
use std::sync::Arc;

/// The number of probes a batched bucket lookup processes together. This is
/// a hot-path tuning constant, not a correctness requirement: the lookup
/// algorithm behaves identically at any group size.
pub const LOOKUP_GROUP_SIZE: usize = 16;

#[derive(Clone)]
struct ClassifierState<F: Clone> {
    /// Subtables in insertion order. Order is never observable by callers
    /// (the classifier has no priority scheme) but must be stable so that
    /// concurrent lookups see a consistent traversal.
    subtables: Vec<Subtable<F>>,
    /// mask-hash -> candidate positions in `subtables` sharing that hash
    /// (a plain `Vec` guards against hash collisions between genuinely
    /// different masks; equality is still settled by comparing the masks
    /// themselves).
    index: HashMap<u64, Vec<usize>, RandomState>,
}

impl<F: Clone> Default for ClassifierState<F> {
    fn default() -> Self {
        ClassifierState {
            subtables: Vec::new(),
            index: HashMap::with_hasher(RandomState::with_seed(0)),
        }
    }
}

impl<F: Clone> ClassifierState<F> {
    fn find_subtable_pos(&self, mask: &Mask) -> Option<usize> {
        let hash = mask.subtable_hash();
        self.index
            .get(&hash)?
            .iter()
            .copied()
            .find(|&pos| self.subtables[pos].mask().as_ref() == mask)
    }

    fn find_subtable_mut(&mut self, mask: &Mask) -> Option<&mut Subtable<F>> {
        let pos = self.find_subtable_pos(mask)?;
        self.subtables.get_mut(pos)
    }
}

enum ClassifierChange<F: Clone> {
    Insert(Arc<Mask>, Rule<F>),
    Remove(Arc<Mask>, FlowKey),
}

impl<F: Clone> Absorb<ClassifierChange<F>> for ClassifierState<F> {
    fn absorb_first(&mut self, change: &mut ClassifierChange<F>, _other: &Self) {
        match change {
            ClassifierChange::Insert(mask, rule) => {
                if let Some(subtable) = self.find_subtable_mut(mask) {
                    subtable.insert(rule.clone());
                } else {
                    let mut subtable = Subtable::new(Arc::clone(mask));
                    subtable.insert(rule.clone());
                    let pos = self.subtables.len();
                    self.index.entry(mask.subtable_hash()).or_default().push(pos);
                    self.subtables.push(subtable);
                }
            }
            ClassifierChange::Remove(mask, masked_key) => {
                let Some(pos) = self.find_subtable_pos(mask) else {
                    return;
                };
                let hash = mask.subtable_hash();
                let Some(subtable) = self.subtables.get_mut(pos) else {
                    return;
                };
                subtable.remove(masked_key);
                if subtable.is_empty() {
                    self.subtables.remove(pos);
                    if let Some(slots) = self.index.get_mut(&hash) {
                        slots.retain(|&p| p != pos);
                        if slots.is_empty() {
                            self.index.remove(&hash);
                        }
                    }
                    // positions after `pos` shifted down by one
                    for slots in self.index.values_mut() {
                        for v in slots.iter_mut() {
                            if *v > pos {
                                *v -= 1;
                            }
                        }
                    }
                }
            }
        }
    }

    fn drop_first(self: Box<Self>) {}

    fn sync_with(&mut self, first: &Self) {
        self.clone_from(first);
    }
}

/// The write side of a classifier: locate-or-create subtables, insert and
/// remove rules, and publish changes so readers observe them.
pub struct ClassifierWriter<F: Clone>(WriteHandle<ClassifierState<F>, ClassifierChange<F>>);

/// The read side of a classifier: a cheaply cloneable handle usable from
/// any thread to perform lock-free lookups.
#[derive(Clone)]
pub struct ClassifierReader<F: Clone>(ReadHandle<ClassifierState<F>>);

impl<F: Clone> ClassifierWriter<F> {
    /// Create a new, empty classifier.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let (w, _) = new_from_empty::<ClassifierState<F>, ClassifierChange<F>>(
            ClassifierState::default(),
        );
        ClassifierWriter(w)
    }

    /// Obtain a reader handle.
    #[must_use]
    pub fn reader(&self) -> ClassifierReader<F> {
        ClassifierReader(self.0.clone())
    }

    /// Insert `rule` (already masked) under `mask`, creating the subtable
    /// if one does not already exist for this exact mask.
    pub fn insert(&mut self, mask: Arc<Mask>, rule: Rule<F>) {
        self.0.append(ClassifierChange::Insert(mask, rule));
        self.0.publish();
    }

    /// Remove the rule with masked key `masked_key` from the subtable for
    /// `mask`. If that empties the subtable, the subtable itself is
    /// removed.
    pub fn remove(&mut self, mask: Arc<Mask>, masked_key: FlowKey) {
        self.0.append(ClassifierChange::Remove(mask, masked_key));
        self.0.publish();
    }

    /// The number of subtables currently installed.
    #[must_use]
    pub fn subtable_count(&self) -> usize {
        self.0
            .enter()
            .map(|guard| guard.subtables.len())
            .unwrap_or(0)
    }
}

impl<F: Clone> ClassifierReader<F> {
    /// `Lookup(batch-of-keys) -> (rules, all-found)`, grouping probes
    /// [`LOOKUP_GROUP_SIZE`] at a time. See
    /// [`lookup_batch_with_group_size`][Self::lookup_batch_with_group_size]
    /// for a caller-supplied group size.
    #[must_use]
    pub fn lookup_batch(&self, keys: &[FlowKey]) -> (Vec<Option<F>>, bool) {
        self.lookup_batch_with_group_size(keys, LOOKUP_GROUP_SIZE)
    }

    /// `Lookup(batch-of-keys) -> (rules, all-found)`.
    ///
    /// Maintains a bitmap of unresolved probes and, for each subtable in
    /// insertion order, issues a batched bucket lookup over groups of
    /// `group_size` still-unresolved probes. The function performs no
    /// priority resolution: the first matching rule in subtable order wins,
    /// and that order is not meant to be observed by callers.
    #[must_use]
    pub fn lookup_batch_with_group_size(&self, keys: &[FlowKey], group_size: usize) -> (Vec<Option<F>>, bool) {
        let mut results: Vec<Option<F>> = vec![None; keys.len()];
        let mut unresolved: Vec<usize> = (0..keys.len()).collect();
        let group_size = group_size.max(1);

        let Some(guard) = self.0.enter() else {
            return (results, keys.is_empty());
        };

        for subtable in &guard.subtables {
            if unresolved.is_empty() {
                break;
            }
            let mut still_unresolved = Vec::with_capacity(unresolved.len());
            for group in unresolved.chunks(group_size) {
                for &i in group {
                    match subtable.lookup(&keys[i]) {
                        Some(handle) => results[i] = Some(handle),
                        None => still_unresolved.push(i),
                    }
                }
            }
            unresolved = still_unresolved;
        }

        (results, unresolved.is_empty())
    }

    /// Single-key convenience wrapper over [`ClassifierReader::lookup_batch`].
    #[must_use]
    pub fn lookup(&self, key: &FlowKey) -> Option<F> {
        self.lookup_batch(std::slice::from_ref(key)).0.into_iter().next().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::word;

    fn mask_on(idx: usize) -> Arc<Mask> {
        let mut mask = Mask::new();
        mask.set_word(idx, u64::MAX);
        Arc::new(mask)
    }

    #[test]
    fn insert_and_lookup_across_subtables() {
        let mut writer = ClassifierWriter::<u32>::new();
        let reader = writer.reader();

        let mask_a = mask_on(word::IN_PORT);
        let mut key_a = FlowKey::new();
        key_a.set_word(word::IN_PORT, 1);
        writer.insert(Arc::clone(&mask_a), Rule::new(&key_a, Arc::clone(&mask_a), 100));

        let mask_b = mask_on(word::IP_PROTO);
        let mut key_b = FlowKey::new();
        key_b.set_word(word::IP_PROTO, 6);
        writer.insert(Arc::clone(&mask_b), Rule::new(&key_b, Arc::clone(&mask_b), 200));

        assert_eq!(writer.subtable_count(), 2);
        assert_eq!(reader.lookup(&key_a), Some(100));
        assert_eq!(reader.lookup(&key_b), Some(200));

        let mut miss_key = FlowKey::new();
        miss_key.set_word(word::IN_PORT, 2);
        assert_eq!(reader.lookup(&miss_key), None);
    }

    #[test]
    fn remove_empties_and_drops_subtable() {
        let mut writer = ClassifierWriter::<u32>::new();
        let reader = writer.reader();
        let mask = mask_on(word::IN_PORT);
        let mut key = FlowKey::new();
        key.set_word(word::IN_PORT, 9);
        writer.insert(Arc::clone(&mask), Rule::new(&key, Arc::clone(&mask), 1));
        assert_eq!(writer.subtable_count(), 1);

        let masked = key.and_mask(&mask);
        writer.remove(Arc::clone(&mask), masked);
        assert_eq!(writer.subtable_count(), 0);
        assert_eq!(reader.lookup(&key), None);
    }

    #[test]
    fn lookup_batch_reports_all_found() {
        let mut writer = ClassifierWriter::<u32>::new();
        let reader = writer.reader();
        let mask = mask_on(word::IN_PORT);
        let mut key1 = FlowKey::new();
        key1.set_word(word::IN_PORT, 1);
        writer.insert(Arc::clone(&mask), Rule::new(&key1, Arc::clone(&mask), 11));

        let mut key2 = FlowKey::new();
        key2.set_word(word::IN_PORT, 2);

        let (results, all_found) = reader.lookup_batch(&[key1, key2]);
        assert_eq!(results[0], Some(11));
        assert_eq!(results[1], None);
        assert!(!all_found);
    }
}
