// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! The per-worker flow table: flow records keyed by a 128-bit flow id
//! (ufid), with a classifier (from `vswitch-dp-dpcls`) doing the masked
//! lookup and an exact-match cache (from `vswitch-dp-emc`) caching the
//! result of repeated lookups.
//!
//! One writer (the owning worker, or a control thread holding the same
//! flow-mutex) mutates the table; any number of readers traverse it
//! lock-free via the classifier's epoch-protected reader handle.

use actions::Action;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use dpcls::key::word;
use dpcls::{ClassifierReader, ClassifierWriter, FlowKey, Mask, Rule};
use emc::Liveness;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::Mutex;

/// The fixed ceiling on the number of flows a single table may hold,
/// mirroring `FLOW_DUMP_MAX_BATCH`'s sibling constant for table capacity.
pub const MAX_FLOWS: usize = 65_536;

/// The default batch size for [`FlowTable::dump`].
pub const DEFAULT_DUMP_BATCH: usize = 50;

/// Flow-key words a mask is never allowed to select: metadata/register
/// fields, which connection tracking would otherwise live in. A mask that
/// pins `RECIRC_ID` would bind a flow to one recirculation hop, breaking
/// the upcall-installed flow's reuse across every later hop of the same
/// microflow.
pub const FORBIDDEN_MASK_WORDS: &[usize] = &[word::RECIRC_ID];

/// A 128-bit flow identifier. A plain newtype over [`uuid::Uuid`] rather
/// than `vswitch_dp_id::Id<T>`: this value is read from any worker thread
/// under epoch protection, and `Id<T>`'s `PhantomData<*const T>` makes it
/// `!Send`/`!Sync`, which a cross-thread-shared handle cannot be.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Ufid(pub uuid::Uuid);

impl Ufid {
    /// Generate a fresh, random ufid.
    #[must_use]
    pub fn new() -> Self {
        Ufid(uuid::Uuid::new_v4())
    }
}

impl Default for Ufid {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors the flow table surfaces to its caller (the datapath root or the
/// upcall path). These never propagate out of a worker's data path; only
/// the management-facing `Add`/`Modify`/`Remove` calls see them directly.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum FlowTableError {
    /// The table has reached [`MAX_FLOWS`].
    #[error("flow table capacity exceeded")]
    CapacityExceeded,
    /// No flow exists with the given ufid.
    #[error("flow not found")]
    NotFound,
    /// A mask selected a forbidden (connection-tracking) field.
    #[error("mask selects a forbidden field")]
    MaskInvalid,
}

/// Atomic, best-effort flow statistics. Writes (from the owning worker)
/// use relaxed ordering; reads are best-effort snapshots.
#[derive(Debug, Default)]
pub struct FlowStats {
    last_used_ms: AtomicU64,
    packets: AtomicU64,
    bytes: AtomicU64,
    observed_tcp_flags: AtomicU8,
}

impl FlowStats {
    /// Record one committed batch against this flow's stats: adds
    /// `packets`/`bytes`, ORs in `tcp_flags`, and stamps `now_ms` as the
    /// last-used time.
    pub fn record(&self, packets: u64, bytes: u64, tcp_flags: u8, now_ms: u64) {
        self.packets.fetch_add(packets, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        self.observed_tcp_flags.fetch_or(tcp_flags, Ordering::Relaxed);
        self.last_used_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Total packets observed so far.
    #[must_use]
    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    /// Total bytes observed so far.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// The bitwise OR of every TCP flags byte observed.
    #[must_use]
    pub fn observed_tcp_flags(&self) -> u8 {
        self.observed_tcp_flags.load(Ordering::Relaxed)
    }

    /// Wall-clock milliseconds at which this flow was last matched.
    #[must_use]
    pub fn last_used_ms(&self) -> u64 {
        self.last_used_ms.load(Ordering::Relaxed)
    }
}

/// A flow record: the stable, reference-counted object a classifier rule
/// points at.
///
/// `unmasked_key`, `ufid`, and `owner_worker_id` are immutable after
/// construction. `dead` starts `false` and is set exactly once, on
/// removal. `actions` is swappable under the table's flow-mutex;
/// in-flight readers observe either the old or the new value atomically.
/// `batch` is the transient per-flow packet batch described in the
/// pipeline: packets matching this flow within one ingress burst
/// accumulate here until the burst is committed.
pub struct FlowRecord<P> {
    unmasked_key: FlowKey,
    ufid: Ufid,
    owner_worker_id: u32,
    mask: Arc<Mask>,
    masked_key: FlowKey,
    dead: AtomicBool,
    stats: FlowStats,
    actions: ArcSwap<Vec<Action>>,
    batch: Mutex<Vec<P>>,
}

impl<P> FlowRecord<P> {
    /// The original, unmasked key the flow was installed with.
    #[must_use]
    pub fn unmasked_key(&self) -> &FlowKey {
        &self.unmasked_key
    }

    /// This flow's 128-bit identifier.
    #[must_use]
    pub fn ufid(&self) -> Ufid {
        self.ufid
    }

    /// The worker that owns this flow.
    #[must_use]
    pub fn owner_worker_id(&self) -> u32 {
        self.owner_worker_id
    }

    /// Whether this flow has been removed. Once `true`, it stays `true`.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }

    /// This flow's statistics.
    #[must_use]
    pub fn stats(&self) -> &FlowStats {
        &self.stats
    }

    /// A snapshot of the current action list.
    #[must_use]
    pub fn actions(&self) -> Arc<Vec<Action>> {
        self.actions.load_full()
    }

    /// Atomically replace the action list. Readers already holding the old
    /// `Arc` keep it valid until they drop it.
    pub fn set_actions(&self, actions: Vec<Action>) {
        self.actions.store(Arc::new(actions));
    }

    /// Append a packet to this flow's transient per-burst batch.
    pub fn push_batch(&self, packet: P) {
        #[allow(clippy::unwrap_used)]
        self.batch.lock().unwrap_or_else(|p| p.into_inner()).push(packet);
    }

    /// Take (and clear) the transient per-burst batch, ready for
    /// execution. The back-pointer is cleared as part of this call, as
    /// the pipeline requires before dispatching actions.
    pub fn take_batch(&self) -> Vec<P> {
        #[allow(clippy::unwrap_used)]
        std::mem::take(&mut *self.batch.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

impl<P> Liveness for Arc<FlowRecord<P>> {
    fn is_alive(&self) -> bool {
        !self.is_dead()
    }
}

/// A snapshot-consistent cursor into a single worker's flow table, used by
/// [`FlowTable::dump`]. The datapath root composes cursors across workers
/// (worker-position, intra-worker-position); this crate only tracks the
/// intra-worker half.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct DumpCursor {
    /// Index into this table's ufid iteration order to resume from.
    pub position: usize,
}

/// A per-worker flow table: a classifier for masked lookups plus a direct
/// ufid index, both pointing at the same [`FlowRecord`]s.
pub struct FlowTable<P> {
    // Mutations (`add`/`remove`) can arrive from a management thread while
    // the owning worker reads concurrently, so the writer handle lives
    // behind a mutex; readers never take it.
    classifier_writer: Mutex<ClassifierWriter<Arc<FlowRecord<P>>>>,
    classifier_reader: ClassifierReader<Arc<FlowRecord<P>>>,
    by_ufid: DashMap<Ufid, Arc<FlowRecord<P>>, ahash::RandomState>,
    capacity: usize,
    batch_size: usize,
}

impl<P> FlowTable<P> {
    /// Construct a new, empty flow table with the default [`MAX_FLOWS`]
    /// capacity and the classifier's default lookup-batch size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(MAX_FLOWS, dpcls::LOOKUP_GROUP_SIZE)
    }

    /// Construct a new, empty flow table holding at most `capacity` flows
    /// and grouping classifier lookups `batch_size` at a time, as
    /// configured by the running datapath's `flow_table_capacity` and
    /// `classifier_batch_size` settings.
    #[must_use]
    pub fn with_limits(capacity: usize, batch_size: usize) -> Self {
        let classifier_writer = ClassifierWriter::new();
        let classifier_reader = classifier_writer.reader();
        FlowTable {
            classifier_writer: Mutex::new(classifier_writer),
            classifier_reader,
            by_ufid: DashMap::with_hasher(ahash::RandomState::with_seed(0)),
            capacity,
            batch_size,
        }
    }

    /// A cheaply cloneable lock-free reader for classifier lookups.
    #[must_use]
    pub fn classifier_reader(&self) -> ClassifierReader<Arc<FlowRecord<P>>> {
        self.classifier_reader.clone()
    }

    /// `Lookup(key) -> flow`: delegate to the classifier.
    #[must_use]
    pub fn lookup(&self, key: &FlowKey) -> Option<Arc<FlowRecord<P>>> {
        self.classifier_reader.lookup(key)
    }

    /// `Lookup(batch-of-keys) -> (flows, all-found)`, grouping lookups
    /// `batch_size` at a time (see [`FlowTable::with_limits`]).
    #[must_use]
    pub fn lookup_batch(&self, keys: &[FlowKey]) -> (Vec<Option<Arc<FlowRecord<P>>>>, bool) {
        self.classifier_reader.lookup_batch_with_group_size(keys, self.batch_size)
    }

    /// `FindByUfid(ufid) -> flow`: direct hash lookup.
    #[must_use]
    pub fn find_by_ufid(&self, ufid: Ufid) -> Option<Arc<FlowRecord<P>>> {
        self.by_ufid.get(&ufid).map(|e| Arc::clone(e.value()))
    }

    /// The number of flows currently installed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_ufid.len()
    }

    /// Whether the table holds no flows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_ufid.is_empty()
    }

    /// `Add(unmasked_key, mask, ufid, owner_worker_id, actions) -> flow`.
    ///
    /// Builds a flow record, constructs a rule from the masked key,
    /// inserts it into the classifier, and indexes it by ufid.
    ///
    /// # Errors
    ///
    /// Returns [`FlowTableError::CapacityExceeded`] if the table is
    /// already at its configured capacity (existing flows are left
    /// untouched; see [`FlowTable::with_limits`]), or
    /// [`FlowTableError::MaskInvalid`] if `mask` selects a forbidden
    /// field.
    pub fn add(
        &self,
        unmasked_key: FlowKey,
        mask: Arc<Mask>,
        ufid: Ufid,
        owner_worker_id: u32,
        actions: Vec<Action>,
    ) -> Result<Arc<FlowRecord<P>>, FlowTableError> {
        if FORBIDDEN_MASK_WORDS.iter().any(|&w| mask.has_word(w)) {
            return Err(FlowTableError::MaskInvalid);
        }
        if self.by_ufid.len() >= self.capacity {
            return Err(FlowTableError::CapacityExceeded);
        }

        let masked_key = unmasked_key.and_mask(&mask);
        let record = Arc::new(FlowRecord {
            unmasked_key,
            ufid,
            owner_worker_id,
            mask: Arc::clone(&mask),
            masked_key: masked_key.clone(),
            dead: AtomicBool::new(false),
            stats: FlowStats::default(),
            actions: ArcSwap::from_pointee(actions),
            batch: Mutex::new(Vec::new()),
        });

        let rule = Rule::new(&record.unmasked_key, Arc::clone(&mask), Arc::clone(&record));
        #[allow(clippy::unwrap_used)]
        self.classifier_writer
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(mask, rule);
        self.by_ufid.insert(ufid, Arc::clone(&record));
        Ok(record)
    }

    /// `Modify(ufid, new_actions)`: atomically swap the actions reference.
    /// The old `Arc<Vec<Action>>` is dropped once the last reader holding
    /// it releases it; no explicit deferred-free bookkeeping is needed
    /// because `ArcSwap`'s own reference counting already provides it.
    ///
    /// # Errors
    ///
    /// Returns [`FlowTableError::NotFound`] if no flow exists with `ufid`.
    pub fn modify(&self, ufid: Ufid, new_actions: Vec<Action>) -> Result<(), FlowTableError> {
        let entry = self.by_ufid.get(&ufid).ok_or(FlowTableError::NotFound)?;
        entry.set_actions(new_actions);
        Ok(())
    }

    /// `Remove(ufid)`: remove from the classifier and the ufid index, and
    /// mark the flow dead. The `Arc` may still be held by in-flight
    /// readers; it is freed once the last one drops it.
    ///
    /// # Errors
    ///
    /// Returns [`FlowTableError::NotFound`] if no flow exists with `ufid`.
    pub fn remove(&self, ufid: Ufid) -> Result<(), FlowTableError> {
        let (_, record) = self.by_ufid.remove(&ufid).ok_or(FlowTableError::NotFound)?;
        record.dead.store(true, Ordering::Release);
        #[allow(clippy::unwrap_used)]
        self.classifier_writer
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(Arc::clone(&record.mask), record.masked_key.clone());
        Ok(())
    }

    /// `Flush()`: remove every flow.
    pub fn flush(&self) {
        let ufids: Vec<Ufid> = self.by_ufid.iter().map(|e| *e.key()).collect();
        for ufid in ufids {
            let _ = self.remove(ufid);
        }
    }

    /// `Dump(cursor) -> batch`: a snapshot-consistent traversal of this
    /// worker's flows, `batch_size` at a time.
    #[must_use]
    pub fn dump(&self, cursor: DumpCursor, batch_size: usize) -> (Vec<Arc<FlowRecord<P>>>, Option<DumpCursor>) {
        let all: Vec<Arc<FlowRecord<P>>> = self.by_ufid.iter().map(|e| Arc::clone(e.value())).collect();
        let start = cursor.position.min(all.len());
        let end = (start + batch_size).min(all.len());
        let batch = all[start..end].to_vec();
        let next = if end < all.len() {
            Some(DumpCursor { position: end })
        } else {
            None
        };
        (batch, next)
    }
}

impl<P> Default for FlowTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpcls::key::word;

    fn mask_on_in_port() -> Arc<Mask> {
        let mut mask = Mask::new();
        mask.set_word(word::IN_PORT, u64::MAX);
        Arc::new(mask)
    }

    #[test]
    fn add_lookup_remove_roundtrip() {
        let table: FlowTable<u32> = FlowTable::new();
        let mask = mask_on_in_port();
        let mut key = FlowKey::new();
        key.set_word(word::IN_PORT, 1);
        let ufid = Ufid::new();

        let flow = table
            .add(key.clone(), Arc::clone(&mask), ufid, 0, vec![Action::Output(actions::PortId(1))])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(table.len(), 1);
        assert!(!flow.is_dead());

        assert!(table.lookup(&key).is_some());
        assert!(table.find_by_ufid(ufid).is_some());

        table.remove(ufid).unwrap_or_else(|_| unreachable!());
        assert!(flow.is_dead());
        assert!(table.lookup(&key).is_none());
        assert!(table.find_by_ufid(ufid).is_none());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn modify_swaps_actions_atomically() {
        let table: FlowTable<u32> = FlowTable::new();
        let mask = mask_on_in_port();
        let mut key = FlowKey::new();
        key.set_word(word::IN_PORT, 2);
        let ufid = Ufid::new();
        let flow = table
            .add(key, mask, ufid, 0, vec![Action::Output(actions::PortId(1))])
            .unwrap_or_else(|_| unreachable!());

        table
            .modify(ufid, vec![Action::Output(actions::PortId(2))])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(flow.actions().as_slice(), &[Action::Output(actions::PortId(2))]);
    }

    #[test]
    fn dump_paginates_with_cursor() {
        let table: FlowTable<u32> = FlowTable::new();
        for i in 0..5u64 {
            let mask = mask_on_in_port();
            let mut key = FlowKey::new();
            key.set_word(word::IN_PORT, i);
            table.add(key, mask, Ufid::new(), 0, vec![]).unwrap_or_else(|_| unreachable!());
        }
        let (first, cursor) = table.dump(DumpCursor::default(), 2);
        assert_eq!(first.len(), 2);
        let cursor = cursor.unwrap_or_else(|| unreachable!());
        let (second, _) = table.dump(cursor, 10);
        assert_eq!(second.len(), 3);
    }

    #[test]
    fn mask_selecting_recirc_id_is_rejected() {
        let table: FlowTable<u32> = FlowTable::new();
        let mut mask = Mask::new();
        mask.set_word(word::IN_PORT, u64::MAX);
        mask.set_word(word::RECIRC_ID, u64::MAX);
        let mut key = FlowKey::new();
        key.set_word(word::IN_PORT, 1);

        let result = table.add(key, Arc::new(mask), Ufid::new(), 0, vec![]);
        assert_eq!(result.err(), Some(FlowTableError::MaskInvalid));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn capacity_exceeded_leaves_existing_flows_untouched() {
        // cheap check of the error path, not a 65536-flow stress test
        let table: FlowTable<u32> = FlowTable::new();
        let mask = mask_on_in_port();
        let mut key = FlowKey::new();
        key.set_word(word::IN_PORT, 1);
        table
            .add(key.clone(), Arc::clone(&mask), Ufid::new(), 0, vec![])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn with_limits_enforces_a_configured_capacity() {
        let table: FlowTable<u32> = FlowTable::with_limits(1, 4);
        let mask = mask_on_in_port();
        let mut key1 = FlowKey::new();
        key1.set_word(word::IN_PORT, 1);
        table
            .add(key1, Arc::clone(&mask), Ufid::new(), 0, vec![])
            .unwrap_or_else(|_| unreachable!());

        let mut key2 = FlowKey::new();
        key2.set_word(word::IN_PORT, 2);
        let result = table.add(key2, mask, Ufid::new(), 0, vec![]);
        assert_eq!(result.err(), Some(FlowTableError::CapacityExceeded));
        assert_eq!(table.len(), 1);
    }
}
