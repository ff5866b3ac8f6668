// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use ahash::RandomState;
use dashmap::DashMap;
use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;
use tracing::{debug, error};

use concurrency::sync::{Arc, RwLock, RwLockReadGuard, Weak};

use crate::flow_table::thread_local_pq::{PQAction, ThreadLocalPriorityQueue};
use crate::flow_table::{FlowInfo, FlowKey, FlowStatus};

#[derive(Debug, thiserror::Error)]
pub enum FlowTableError {
    #[error("Invalid number of shards: {0}. Must be a power of two.")]
    InvalidShardCount(usize),
}

type PriorityQueue = ThreadLocalPriorityQueue<FlowKey, Arc<FlowInfo>>;
type Table = DashMap<FlowKey, Weak<FlowInfo>, RandomState>;

pub struct FlowTable {
    // TODO(mvachhar) move this to a cross beam sharded lock
    pub(crate) table: RwLock<Table>,
    pub(crate) priority_queue: PriorityQueue,
}

impl Default for FlowTable {
    fn default() -> Self {
        Self::new(1024)
    }
}

fn hasher_state() -> &'static RandomState {
    use std::sync::OnceLock;
    static HASHER_STATE: OnceLock<RandomState> = OnceLock::new();
    HASHER_STATE.get_or_init(|| RandomState::with_seeds(0, 0, 0, 0))
}

impl FlowTable {
    #[must_use]
    pub fn new(num_shards: usize) -> Self {
        Self {
            table: RwLock::new(Table::with_hasher_and_shard_amount(
                hasher_state().clone(),
                num_shards,
            )),
            priority_queue: PriorityQueue::new(),
        }
    }

    /// Reshard the flow table into the given number of shards.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of shards is not a power of two.
    ///
    /// # Panics
    ///
    /// Panics if this thread already holds the read lock on the table or
    /// if the table lock is poisoned.
    pub fn reshard(&self, num_shards: usize) -> Result<(), FlowTableError> {
        if !num_shards.is_power_of_two() {
            return Err(FlowTableError::InvalidShardCount(num_shards));
        }
        debug!(
            "reshard: Resharding flow table from {} shards into {} shards",
            self.table.read().unwrap().shards().len(),
            num_shards
        );
        let mut locked_table = self.table.write().unwrap();
        let new_table =
            DashMap::with_hasher_and_shard_amount(locked_table.hasher().clone(), num_shards);
        let old_table = std::mem::replace(&mut *locked_table, new_table);

        // Move all entries from the old table to the new table using raw_api
        for shard_lock in old_table.into_shards() {
            let mut shard = shard_lock.write();
            let drain_iter = shard.drain();
            for (k, v) in drain_iter {
                locked_table.insert(k, v.into_inner());
            }
        }
        Ok(())
    }

    /// Add a flow to the table.
    ///
    /// # Returns
    ///
    /// Returns the old `Arc<FlowInfo>` associated with the flow key, if any.
    ///
    /// # Panics
    ///
    /// Panics if this thread already holds the read lock on the table or
    /// if the table lock is poisoned.
    pub fn insert(&self, flow_key: FlowKey, flow_info: FlowInfo) -> Option<Arc<FlowInfo>> {
        debug!("insert: Inserting flow key {:?}", flow_key);
        let val = Arc::new(flow_info);
        self.insert_common(flow_key, &val)
    }

    /// Add a flow to the table via an Arc
    ///
    /// This is intended to re-add a flow to the flow table via the Arc returned from
    /// lookup, but it can be used with a fresh Arc as well.
    ///
    /// # Returns
    ///
    /// Returns the old `Arc<FlowInfo>` associated with the flow key, if any.
    ///
    /// # Panics
    ///
    /// Panics if this thread already holds the read lock on the table or
    /// if the table lock is poisoned.
    pub fn reinsert(&self, flow_key: FlowKey, flow_info: &Arc<FlowInfo>) -> Option<Arc<FlowInfo>> {
        debug!("reinsert: Re-inserting flow key {:?}", flow_key);
        self.insert_common(flow_key, flow_info)
    }

    fn insert_common(&self, flow_key: FlowKey, val: &Arc<FlowInfo>) -> Option<Arc<FlowInfo>> {
        let table = self.table.read().unwrap();
        let expires_at = val.expires_at();
        let result = table.insert(flow_key, Arc::downgrade(val));
        self.priority_queue.push(flow_key, val.clone(), expires_at);
        let ret = match result {
            Some(w) => w.upgrade(),
            None => None,
        };

        let Some(ret) = ret else {
            return ret;
        };

        if ret.status() == FlowStatus::Expired {
            return None;
        }

        Some(ret)
    }

    /// Lookup a flow in the table.
    ///
    /// # Panics
    ///
    /// Panics if this thread already holds the read lock on the table or
    /// if the table lock is poisoned.
    pub fn lookup<Q>(&self, flow_key: &Q) -> Option<Arc<FlowInfo>>
    where
        FlowKey: Borrow<Q>,
        Q: Hash + Eq + ?Sized + Debug,
    {
        debug!("lookup: Looking up flow key {:?}", flow_key);
        let table = self.table.read().unwrap();
        let item = table.get(flow_key)?.upgrade();
        let Some(item) = item else {
            debug!(
                "lookup: Removing flow key {:?}, found empty weak reference",
                flow_key
            );
            Self::remove_with_read_lock(&table, flow_key);
            return None;
        };
        if item.status() == FlowStatus::Expired {
            debug!("lookup: Flow key {:?} is expired, removing", flow_key);
            Self::remove_with_read_lock(&table, flow_key);
            return None;
        }
        Some(item)
    }

    /// Remove a flow from the table.
    ///
    /// # Panics
    ///
    /// Panics if this thread already holds the read lock on the table or
    /// if the table lock is poisoned.
    pub fn remove<Q>(&self, flow_key: &Q) -> Option<(FlowKey, Arc<FlowInfo>)>
    where
        FlowKey: Borrow<Q>,
        Q: Hash + Eq + ?Sized + Debug,
    {
        debug!("remove: Removing flow key {:?}", flow_key);
        let table = self.table.read().unwrap();
        Self::remove_with_read_lock(&table, flow_key)
    }

    fn remove_with_read_lock<Q>(
        table: &RwLockReadGuard<DashMap<FlowKey, Weak<FlowInfo>, RandomState>>,
        flow_key: &Q,
    ) -> Option<(FlowKey, Arc<FlowInfo>)>
    where
        FlowKey: Borrow<Q>,
        Q: Hash + Eq + ?Sized + Debug,
    {
        let result = table.remove(flow_key);
        let (k, w) = result?;
        let old_val = w.upgrade()?;
        if old_val.status() == FlowStatus::Expired {
            return None;
        }
        Some((k, old_val))
    }

    fn decide_expiry(now: &Instant, k: &FlowKey, v: &Arc<FlowInfo>) -> PQAction {
        // Note(mvachhar)
        //
        //I'm not sure if marking the entry as expired is worthwhile here
        // nor am I sure of the performance cost of doing this.
        // It isn't strictly needed, though it means other holders of the Arc may
        // be able to read stale data and wouldn't know the entry is expired.
        //
        // If the common case is that the entry has no other references here,
        // then this operation should be cheap, though not free due to the
        // dereference of the value and the lock acquisition.
        #[allow(unused_must_use)]
        let expires_at = v.expires_at();
        if now >= &expires_at {
            debug!("decide_expiry: Reap for flow key {k:?} with expires_at {expires_at:?}");
            PQAction::Reap
        } else {
            debug!("decide_expiry: Update for flow key {k:?} with time {expires_at:?}");
            PQAction::Update(expires_at)
        }
    }

    // Pass by value here since the PQ doesn't know the value is an Arc
    // and we get ownership of the value here
    #[allow(clippy::needless_pass_by_value)]
    fn do_reap(k: FlowKey, v: Arc<FlowInfo>) {
        match v.update_status(FlowStatus::Expired) {
            Ok(()) => {
                debug!("do_reap: Updated flow status for {k:?} to expired");
            }
            Err(e) => {
                error!("do_reap: Failed to update flow status for {k:?}: {e:?}",);
            }
        }
    }

    /// Reap expired entries from the priority queue for the current thread.
    ///
    /// # Thread Safety
    ///
    /// This method is thread-safe but should not be called if the current thread is
    /// holding a lock on any element in the flow table.
    ///
    /// # Panics
    ///
    /// Panics if any lock acquired by this method is poisoned.
    pub fn reap_expired(&self) -> usize {
        self.priority_queue
            .reap_expired(Self::decide_expiry, Self::do_reap)
    }

    pub fn reap_all_expired(&self) -> usize {
        self.priority_queue
            .reap_all_expired(Self::decide_expiry, Self::do_reap)
    }

    #[cfg(all(test, feature = "shuttle"))]
    pub fn reap_all_expired_with_time(&self, time: &Instant) -> usize {
        self.priority_queue
            .reap_all_expired_with_time(time, Self::decide_expiry, Self::do_reap)
    }
}
