// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! NUMA node and core topology, used to place worker threads.
//!
//! The datapath pins one worker thread per core. When a port's receive
//! queues need workers, the placement policy asks this crate how many
//! unpinned cores exist on a given NUMA node (and, when an explicit core
//! mask is configured, how many of the masked cores live on that node).

use std::collections::{BTreeMap, BTreeSet};

/// A NUMA node identifier, as reported by the topology.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumaNodeId(pub u32);

/// A logical CPU core identifier (an OS-visible core number, suitable for
/// thread pinning).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoreId(pub u32);

/// Errors that can occur while detecting hardware topology.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TopologyError {
    /// The underlying topology library failed to build an object.
    #[cfg(feature = "scan")]
    #[error("failed to load hardware topology: {0}")]
    Hwloc(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// No NUMA nodes were found at all, which would make worker placement
    /// impossible.
    #[error("no NUMA nodes found in topology")]
    Empty,
}

/// The system's NUMA/core topology, as much of it as worker placement needs:
/// which cores exist and which NUMA node each belongs to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Topology {
    /// Cores grouped by the NUMA node that owns them.
    nodes: BTreeMap<NumaNodeId, BTreeSet<CoreId>>,
    /// Reverse index: which node a given core belongs to.
    core_node: BTreeMap<CoreId, NumaNodeId>,
    /// Cores currently pinned to some worker (or otherwise unavailable).
    pinned: BTreeSet<CoreId>,
}

impl Topology {
    /// Build a topology directly from a NUMA-node-to-cores mapping.
    ///
    /// Used in tests and in deployments where a topology file or a single
    /// flat node is configured rather than detected live.
    #[must_use]
    pub fn from_parts(nodes: BTreeMap<NumaNodeId, BTreeSet<CoreId>>) -> Self {
        let mut core_node = BTreeMap::new();
        for (&node, cores) in &nodes {
            for &core in cores {
                core_node.insert(core, node);
            }
        }
        Topology {
            nodes,
            core_node,
            pinned: BTreeSet::new(),
        }
    }

    /// Detect the live hardware topology using `hwlocality`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] if the topology cannot be loaded or
    /// contains no NUMA nodes.
    #[cfg(feature = "scan")]
    pub fn detect() -> Result<Self, TopologyError> {
        use hwlocality::Topology as HwTopology;
        use hwlocality::object::types::ObjectType;

        let topo = HwTopology::new().map_err(|e| TopologyError::Hwloc(Box::new(e)))?;
        let mut nodes: BTreeMap<NumaNodeId, BTreeSet<CoreId>> = BTreeMap::new();

        for numa in topo.objects_with_type(ObjectType::NUMANode) {
            let Some(os_index) = numa.os_index() else {
                continue;
            };
            let node_id = NumaNodeId(os_index);
            let entry = nodes.entry(node_id).or_default();
            if let Some(cpuset) = numa.cpuset() {
                for core in cpuset.iter_set() {
                    entry.insert(CoreId(core.0 as u32));
                }
            }
        }

        if nodes.is_empty() {
            return Err(TopologyError::Empty);
        }
        Ok(Self::from_parts(nodes))
    }

    /// All NUMA node ids present in this topology.
    pub fn nodes(&self) -> impl Iterator<Item = NumaNodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// The NUMA node a core belongs to, if the core is known.
    #[must_use]
    pub fn node_of(&self, core: CoreId) -> Option<NumaNodeId> {
        self.core_node.get(&core).copied()
    }

    /// All cores belonging to `node`.
    #[must_use]
    pub fn cores_on_node(&self, node: NumaNodeId) -> BTreeSet<CoreId> {
        self.nodes.get(&node).cloned().unwrap_or_default()
    }

    /// Mark `core` as pinned to a worker (removing it from the unpinned
    /// pool used by future placement decisions).
    pub fn pin(&mut self, core: CoreId) {
        self.pinned.insert(core);
    }

    /// Release a previously pinned core back to the unpinned pool.
    pub fn unpin(&mut self, core: CoreId) {
        self.pinned.remove(&core);
    }

    /// The number of cores on `node` that are not currently pinned to a
    /// worker.
    #[must_use]
    pub fn unpinned_cores_on_node(&self, node: NumaNodeId) -> usize {
        self.nodes
            .get(&node)
            .map(|cores| cores.iter().filter(|c| !self.pinned.contains(c)).count())
            .unwrap_or(0)
    }

    /// The number of unpinned cores on `node` that are also selected by
    /// `mask` (a bitmask of core numbers, bit `i` selecting `CoreId(i)`).
    #[must_use]
    pub fn unpinned_cores_on_node_in_mask(&self, node: NumaNodeId, mask: u64) -> usize {
        self.nodes
            .get(&node)
            .map(|cores| {
                cores
                    .iter()
                    .filter(|c| !self.pinned.contains(c))
                    .filter(|c| c.0 < 64 && (mask & (1u64 << c.0)) != 0)
                    .count()
            })
            .unwrap_or(0)
    }

    /// The number of workers to place on `node`, given an optional explicit
    /// core mask and a configured per-node worker count.
    ///
    /// Without an explicit mask this is
    /// `min(unpinned-cores-on-node, configured-per-node-count)`; with a mask
    /// it is `popcount(mask & unpinned-cores-on-node)`.
    #[must_use]
    pub fn workers_for_node(
        &self,
        node: NumaNodeId,
        core_mask: Option<u64>,
        configured_per_node_count: usize,
    ) -> usize {
        match core_mask {
            Some(mask) => self.unpinned_cores_on_node_in_mask(node, mask),
            None => self.unpinned_cores_on_node(node).min(configured_per_node_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_topology() -> Topology {
        let mut nodes = BTreeMap::new();
        nodes.insert(NumaNodeId(0), BTreeSet::from([CoreId(0), CoreId(1), CoreId(2), CoreId(3)]));
        nodes.insert(NumaNodeId(1), BTreeSet::from([CoreId(4), CoreId(5)]));
        Topology::from_parts(nodes)
    }

    #[test]
    fn unpinned_counts_respect_pinning() {
        let mut topo = two_node_topology();
        assert_eq!(topo.unpinned_cores_on_node(NumaNodeId(0)), 4);
        topo.pin(CoreId(0));
        topo.pin(CoreId(1));
        assert_eq!(topo.unpinned_cores_on_node(NumaNodeId(0)), 2);
        topo.unpin(CoreId(0));
        assert_eq!(topo.unpinned_cores_on_node(NumaNodeId(0)), 3);
    }

    #[test]
    fn workers_for_node_without_mask_is_capped() {
        let topo = two_node_topology();
        assert_eq!(topo.workers_for_node(NumaNodeId(0), None, 2), 2);
        assert_eq!(topo.workers_for_node(NumaNodeId(1), None, 8), 2);
    }

    #[test]
    fn workers_for_node_with_mask_is_popcount() {
        let topo = two_node_topology();
        // mask selects cores 0 and 2 on node 0
        let mask = (1u64 << 0) | (1u64 << 2);
        assert_eq!(topo.workers_for_node(NumaNodeId(0), Some(mask), 99), 2);
        // node 1's cores (4,5) are not in the mask at all
        assert_eq!(topo.workers_for_node(NumaNodeId(1), Some(mask), 99), 0);
    }

    #[test]
    fn node_of_looks_up_reverse_index() {
        let topo = two_node_topology();
        assert_eq!(topo.node_of(CoreId(4)), Some(NumaNodeId(1)));
        assert_eq!(topo.node_of(CoreId(99)), None);
    }
}
