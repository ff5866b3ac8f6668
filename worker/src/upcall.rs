// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The upcall contract: what a worker does with a packet that neither the
//! EMC nor the classifier could resolve.

use crate::WorkerId;
use actions::Action;
use dpcls::{FlowKey, Mask};
use net::Packet;
use net::buffer::PacketBufferMut;
use std::sync::Arc;
use std::sync::RwLock;

/// Why a worker is escalating a packet to the upcall handler.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UpcallKind {
    /// Neither the EMC nor the classifier matched.
    Miss,
    /// A flow's `Userspace` action explicitly escalated this packet.
    Action,
}

/// A mask and action list an upcall handler wants installed as a new flow,
/// alongside the actions to execute against the packet(s) that triggered it.
#[derive(Debug, Clone)]
pub struct InstallActions {
    /// The mask the new rule should be installed under.
    pub mask: Arc<Mask>,
    /// The new flow's action list.
    pub actions: Vec<Action>,
}

/// What an upcall handler decided for one escalated packet.
#[derive(Debug, Clone, Default)]
pub struct UpcallOutcome {
    /// Actions to execute against the packet that triggered the upcall.
    pub actions: Vec<Action>,
    /// A flow to install so future packets in the same microflow skip the
    /// upcall path. `None` means "handle this packet only, install
    /// nothing" (used for one-off `Userspace` escalations).
    pub install: Option<InstallActions>,
}

/// Errors an upcall handler can return. These never propagate past a
/// worker: a failed upcall becomes a `lost` packet.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum UpcallError {
    /// The handler has no room to install another flow right now.
    #[error("no space to install a new flow")]
    NoSpace,
    /// The handler failed for any other reason.
    #[error("upcall handler failed")]
    Failed,
    /// The upcall gate was closed (see [`UpcallGate`]).
    #[error("upcall gate is closed")]
    GateClosed,
}

/// Resolves a miss or a `Userspace` escalation into actions (and optionally
/// a new flow to install). Implemented by the datapath root, which owns the
/// management-plane connection a real controller would speak to.
pub trait Upcall {
    /// The packet buffer type this handler's caller uses.
    type Buf: PacketBufferMut;

    /// Resolve one escalated packet.
    ///
    /// # Errors
    ///
    /// Returns [`UpcallError`] if no outcome can be produced; the caller
    /// counts the packet as `lost` and drops it.
    fn upcall(
        &self,
        packet: &Packet<Self::Buf>,
        key: &FlowKey,
        kind: UpcallKind,
        worker_id: WorkerId,
    ) -> Result<UpcallOutcome, UpcallError>;
}

/// Gates whether upcalls may proceed at all.
///
/// Held open (read-locked, briefly, per upcall) during normal operation;
/// held closed (write-locked) by the datapath root while a revalidator pass
/// or a core-mask reconfiguration is in flight, per the lock ordering in
/// spec's concurrency model. A worker that cannot acquire a read lock
/// treats the packet as [`UpcallError::GateClosed`] rather than blocking.
#[derive(Default)]
pub struct UpcallGate(RwLock<()>);

impl UpcallGate {
    /// Construct an open gate.
    #[must_use]
    pub fn new() -> Self {
        UpcallGate::default()
    }

    /// Try to take a read slot; `None` means the gate is currently closed.
    #[must_use]
    pub fn try_enter(&self) -> Option<std::sync::RwLockReadGuard<'_, ()>> {
        self.0.try_read().ok()
    }

    /// Close the gate for the duration of the returned guard, blocking
    /// until in-flight upcalls drain.
    #[must_use]
    pub fn close(&self) -> std::sync::RwLockWriteGuard<'_, ()> {
        #[allow(clippy::unwrap_used)]
        self.0.write().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_starts_open() {
        let gate = UpcallGate::new();
        assert!(gate.try_enter().is_some());
    }

    #[test]
    fn closing_the_gate_blocks_new_entries() {
        let gate = UpcallGate::new();
        let _closed = gate.close();
        assert!(gate.try_enter().is_none());
    }
}
