// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! The datapath root: the port/queue registry, worker placement across
//! NUMA nodes, the upcall gate, and the management operations (flow and
//! port CRUD, core-mask reconfiguration, statistics) a CLI or management
//! protocol drives.
//!
//! This crate is the only one in the workspace that owns a [`Driver`] and
//! spawns worker threads; [`vswitch_dp_worker`] (aliased here as `worker`)
//! knows nothing about threads, drivers, or NUMA placement, and
//! [`vswitch_dp_hardware`] (`hardware`) knows nothing about packets. This
//! crate is the glue.

mod registry;
mod root;

pub use registry::{PortConfig, PortHandle, PortInfo};
pub use root::{DatapathRoot, EngineLimits, FlowDescriptor, FlowView};

use std::sync::Arc;

/// Errors the management surface can return, covering every error kind
/// listed for the datapath's external interfaces: port and flow CRUD,
/// core-mask reconfiguration, and upcall delivery.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum DatapathError {
    /// A port with this name already exists.
    #[error("port {0:?} already exists")]
    PortExists(String),
    /// No port with this name is registered.
    #[error("port {0:?} not found")]
    PortNotFound(String),
    /// The local port cannot be removed or renumbered.
    #[error("port {0:?} is the protected local port")]
    PortLocalProtected(String),
    /// No flow with this ufid exists on the targeted worker.
    #[error("flow not found")]
    FlowNotFound,
    /// A mask selected a field the flow table forbids.
    #[error("mask is invalid: {0}")]
    MaskInvalid(flowtable::FlowTableError),
    /// The flow table (or some other fixed-size resource) is full.
    #[error("capacity exceeded")]
    CapacityExceeded,
    /// The requested worker id does not exist.
    #[error("worker {0} not found")]
    WorkerNotFound(u32),
    /// The underlying driver reported an error.
    #[error("driver error: {0}")]
    Driver(#[from] driver::DriverError),
    /// The upcall gate is closed (a reconfiguration is in flight).
    #[error("upcall gate is closed")]
    GateClosed,
    /// No NUMA node had room for another worker under the current core
    /// mask and per-node worker count.
    #[error("no placement available on numa node {0:?}")]
    NoPlacement(hardware::NumaNodeId),
}

/// The callback shape a controller registers to resolve upcalls: given the
/// escalated packet's bytes, its extracted key, why it escalated, and
/// which worker saw it, decide what to do.
pub type UpcallCallback =
    dyn Fn(&[u8], &dpcls::FlowKey, worker::UpcallKind, worker::WorkerId) -> Result<worker::UpcallOutcome, worker::UpcallError> + Send + Sync;

/// The callback shape a controller registers to learn about flows the
/// datapath evicted on its own (e.g. an `idle_timeout`-style policy; this
/// crate does not implement eviction itself, only the notification path
/// a future policy would use).
pub type PurgeCallback = dyn Fn(flowtable::Ufid) + Send + Sync;

/// Adapts a registered [`UpcallCallback`] to the [`worker::Upcall`] trait
/// each worker is generic over. Holds no state beyond the callback slot
/// itself; every worker thread shares one `Arc<ManagementUpcall<Buf>>`.
///
/// The callback is given the packet's raw bytes rather than
/// `net::Packet<Buf>` directly, so this type does not need to be generic
/// over a concrete buffer beyond what `worker::Upcall::Buf` already pins
/// down; the worker crate is the only place that needs the parsed
/// representation.
pub struct ManagementUpcall<Buf> {
    callback: arc_swap::ArcSwapOption<UpcallCallback>,
    _buf: std::marker::PhantomData<fn() -> Buf>,
}

impl<Buf: net::buffer::PacketBufferMut> ManagementUpcall<Buf> {
    /// An upcall adapter with no controller attached yet; every upcall
    /// fails with [`worker::UpcallError::Failed`] until one is registered.
    #[must_use]
    pub fn new() -> Self {
        ManagementUpcall {
            callback: arc_swap::ArcSwapOption::empty(),
            _buf: std::marker::PhantomData,
        }
    }

    /// Install (or replace) the controller callback.
    pub fn set(&self, callback: Arc<UpcallCallback>) {
        self.callback.store(Some(callback));
    }

    /// Remove the controller callback; subsequent upcalls fail.
    pub fn clear(&self) {
        self.callback.store(None);
    }
}

impl<Buf: net::buffer::PacketBufferMut> Default for ManagementUpcall<Buf> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Buf: net::buffer::PacketBufferMut> worker::Upcall for ManagementUpcall<Buf> {
    type Buf = Buf;

    fn upcall(
        &self,
        packet: &net::Packet<Self::Buf>,
        key: &dpcls::FlowKey,
        kind: worker::UpcallKind,
        worker_id: worker::WorkerId,
    ) -> Result<worker::UpcallOutcome, worker::UpcallError> {
        let Some(callback) = self.callback.load_full() else {
            return Err(worker::UpcallError::Failed);
        };
        callback(packet.buf().as_ref(), key, kind, worker_id)
    }
}
