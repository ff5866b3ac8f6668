// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The port/queue registry (C8): per-port driver ownership, RX-queue-to-
//! worker assignment, and the NUMA/poll-mode facts worker placement needs.

use driver::{Driver, QueueId};
use hardware::NumaNodeId;
use worker::WorkerId;

/// Caller-supplied facts about a port at `add_port` time. A real deployment
/// reads these from its own port configuration surface (a name, a driver
/// type string, a requested queue count); this crate only needs the
/// resulting [`Driver`] instance and a human-readable name.
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// The name this port is registered and addressed by.
    pub name: String,
}

/// A live port entry: the driver handle, and which worker (if any) each of
/// its RX queues is assigned to.
pub(crate) struct PortEntry<D: Driver> {
    pub(crate) name: String,
    pub(crate) driver: D,
    pub(crate) numa: NumaNodeId,
    pub(crate) rx_assignment: Vec<Option<WorkerId>>,
    pub(crate) is_local: bool,
}

impl<D: Driver> PortEntry<D> {
    pub(crate) fn new(name: String, driver: D, is_local: bool) -> Self {
        let numa = driver.numa_id();
        #[allow(clippy::cast_lossless)]
        let n = driver.num_rx_queues() as usize;
        PortEntry {
            name,
            driver,
            numa,
            rx_assignment: vec![None; n],
            is_local,
        }
    }

    /// Queues not yet bound to a worker.
    pub(crate) fn unassigned_queues(&self) -> impl Iterator<Item = QueueId> + '_ {
        self.rx_assignment
            .iter()
            .enumerate()
            .filter(|(_, w)| w.is_none())
            .map(|(i, _)| QueueId(u16::try_from(i).unwrap_or(u16::MAX)))
    }
}

/// A stable handle identifying a registered port, returned by
/// [`crate::DatapathRoot::add_port`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct PortHandle(pub(crate) u32);

/// A read-only snapshot of one port's registry state, for the management
/// surface's "show queue assignments" operation.
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// The port's name.
    pub name: String,
    /// The port's `PortId` as known to the action executor.
    pub port_id: u32,
    /// The NUMA node the port's driver is attached to.
    pub numa: NumaNodeId,
    /// Whether this is the protected local port.
    pub is_local: bool,
    /// Per-RX-queue worker assignment (`None` for an unassigned or
    /// non-poll-mode port).
    pub queue_assignment: Vec<Option<WorkerId>>,
}
