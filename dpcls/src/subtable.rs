// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A subtable: all installed rules sharing one mask, bucketed by
//! `HashInMask`.

use crate::key::{FlowKey, Mask};
use crate::rule::Rule;
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::Arc;

/// `(mask, bucket-map)`. Every rule in a subtable shares `mask` by
/// construction; an empty subtable is meant to be destroyed by its owner
/// (the classifier), not kept around.
#[derive(Debug, Clone)]
pub struct Subtable<F: Clone> {
    mask: Arc<Mask>,
    buckets: HashMap<u32, Vec<Rule<F>>, RandomState>,
    rule_count: usize,
}

impl<F: Clone> Subtable<F> {
    #[must_use]
    pub(crate) fn new(mask: Arc<Mask>) -> Self {
        Subtable {
            mask,
            buckets: HashMap::with_hasher(RandomState::with_seed(0)),
            rule_count: 0,
        }
    }

    /// The mask all rules in this subtable share.
    #[must_use]
    pub fn mask(&self) -> &Arc<Mask> {
        &self.mask
    }

    /// Number of rules currently installed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rule_count
    }

    /// Whether this subtable has no rules left (a signal to its owner that
    /// it should be removed from the classifier).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rule_count == 0
    }

    pub(crate) fn insert(&mut self, rule: Rule<F>) {
        let bucket_hash = rule.masked_key().hash_in_mask(&self.mask);
        self.buckets.entry(bucket_hash).or_default().push(rule);
        self.rule_count += 1;
    }

    /// Remove the rule whose masked key equals `masked_key`, if any.
    pub(crate) fn remove(&mut self, masked_key: &FlowKey) -> bool {
        let bucket_hash = masked_key.hash_in_mask(&self.mask);
        let Some(bucket) = self.buckets.get_mut(&bucket_hash) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|r| r.masked_key() != masked_key);
        let removed = bucket.len() != before;
        if removed {
            self.rule_count -= 1;
        }
        if bucket.is_empty() {
            self.buckets.remove(&bucket_hash);
        }
        removed
    }

    /// Look up `probe` against this subtable, returning the first matching
    /// rule's handle.
    #[must_use]
    pub(crate) fn lookup(&self, probe: &FlowKey) -> Option<F> {
        let bucket_hash = probe.hash_in_mask(&self.mask);
        let bucket = self.buckets.get(&bucket_hash)?;
        for rule in bucket {
            if rule.masked_key().matches_in_mask(&self.mask, probe) {
                return Some(rule.handle.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::word;

    fn mask_on_in_port() -> Arc<Mask> {
        let mut mask = Mask::new();
        mask.set_word(word::IN_PORT, u64::MAX);
        Arc::new(mask)
    }

    #[test]
    fn insert_lookup_remove_roundtrip() {
        let mask = mask_on_in_port();
        let mut subtable = Subtable::<u32>::new(Arc::clone(&mask));

        let mut key = FlowKey::new();
        key.set_word(word::IN_PORT, 5);
        let rule = Rule::new(&key, Arc::clone(&mask), 42u32);
        subtable.insert(rule);

        assert_eq!(subtable.lookup(&key), Some(42));
        assert!(!subtable.is_empty());

        let masked = key.and_mask(&mask);
        assert!(subtable.remove(&masked));
        assert!(subtable.is_empty());
        assert_eq!(subtable.lookup(&key), None);
    }
}
