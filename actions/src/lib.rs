// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! The ordered action list a flow carries, and the executor that applies
//! it to a batch of packets all mapped to that flow.
//!
//! This crate knows nothing about flow records or packet buffers: it is
//! generic over whatever type the caller batches (`ActionSink::Packet`),
//! so the worker and flow-table crates can each use their own packet
//! representation without a dependency cycle.

use std::cell::Cell;

/// A switch port number.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct PortId(pub u32);

/// Parameters for pushing a tunnel header (currently VXLAN only).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct TunnelData {
    /// VXLAN network identifier to stamp on the pushed header.
    pub vni: u32,
}

/// A single field overwrite, as used by `Set`/`SetMasked`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct FieldWrite {
    /// Which flow-key word this write targets (see `vswitch-dp-dpcls::key::word`).
    pub word: usize,
    /// The value to write.
    pub value: u64,
    /// For `SetMasked`, which bits of `value` to apply; `None` for a plain
    /// `Set` (all bits apply).
    pub mask: Option<u64>,
}

/// One action in a flow's ordered action list.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum Action {
    /// Enqueue the batch on `port`'s transmit queue.
    Output(PortId),
    /// Prepend a tunnel header and recirculate.
    TunnelPush(TunnelData),
    /// Strip a tunnel header, set the ingress port, and recirculate.
    TunnelPop(PortId),
    /// Push an 802.1Q/802.1ad VLAN tag.
    PushVlan {
        /// Raw tag control information to push.
        tci: u16,
    },
    /// Pop the outermost VLAN tag.
    PopVlan,
    /// Push an MPLS label.
    PushMpls {
        /// MPLS label value.
        label: u32,
    },
    /// Pop the outermost MPLS label.
    PopMpls,
    /// Overwrite a field unconditionally.
    Set(FieldWrite),
    /// Overwrite only the masked bits of a field.
    SetMasked(FieldWrite),
    /// Stamp packets with a recirculation id and recirculate.
    Recirculate(u32),
    /// Escalate each packet to the upcall handler; execute the actions it
    /// returns.
    Userspace {
        /// Opaque data forwarded to the upcall handler.
        userdata: Vec<u8>,
    },
    /// Compute and record a hash (statistical side effect, no packet
    /// mutation).
    Hash,
    /// Probabilistically execute nested actions (statistical side effect).
    Sample {
        /// Probability in `[0, u32::MAX]` that the sample fires.
        probability: u32,
    },
    /// Connection-tracking action. Userspace conntrack is out of scope;
    /// always rejected with [`ActionError::Unsupported`].
    ConntrackAction,
}

/// Errors the executor can raise. These never escape a worker: they
/// become a packet drop plus a typed counter increment.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ActionError {
    /// Recirculation depth exceeded [`MAX_RECIRC_DEPTH`].
    #[error("recirculation depth exceeded")]
    RecircTooDeep,
    /// The action is not implemented in userspace (conntrack).
    #[error("unsupported action: {0}")]
    Unsupported(&'static str),
}

/// Default maximum recirculation depth before packets are dropped.
pub const MAX_RECIRC_DEPTH: u8 = 5;

thread_local! {
    static RECIRC_DEPTH: Cell<u8> = const { Cell::new(0) };
}

/// RAII guard bumping the per-thread recirculation depth counter for the
/// duration of one recirculating action, and decrementing it on drop
/// (including on panic unwind) so a dropped/failed recirculation never
/// leaks depth.
struct RecircGuard;

impl RecircGuard {
    /// Enter one more level of recirculation, failing if that would reach
    /// `max_depth`.
    fn enter(max_depth: u8) -> Result<Self, ActionError> {
        let depth = RECIRC_DEPTH.with(Cell::get);
        if depth >= max_depth {
            return Err(ActionError::RecircTooDeep);
        }
        RECIRC_DEPTH.with(|d| d.set(depth + 1));
        Ok(RecircGuard)
    }
}

impl Drop for RecircGuard {
    fn drop(&mut self) {
        RECIRC_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// The current thread's recirculation depth, for diagnostics and tests.
#[must_use]
pub fn current_recirc_depth() -> u8 {
    RECIRC_DEPTH.with(Cell::get)
}

/// The operations a flow's actions can trigger, implemented by whatever
/// owns the worker's transmit/recirculation/upcall machinery.
pub trait ActionSink {
    /// The packet representation this sink batches.
    type Packet;

    /// Enqueue `packets` on `port`'s transmit queue.
    fn output(&mut self, port: PortId, packets: Vec<Self::Packet>);
    /// Prepend a tunnel header and feed `packets` back into the pipeline.
    fn tunnel_push(&mut self, data: TunnelData, packets: Vec<Self::Packet>);
    /// Strip a tunnel header, set the ingress port, and feed `packets`
    /// back into the pipeline.
    fn tunnel_pop(&mut self, port: PortId, packets: Vec<Self::Packet>);
    /// Apply an in-place header edit to every packet (VLAN/MPLS push/pop,
    /// `Set`/`SetMasked`).
    fn edit(&mut self, packets: &mut [Self::Packet], action: &Action);
    /// Stamp `packets` with `recirc_id` and feed them back into the
    /// pipeline.
    fn recirculate(&mut self, recirc_id: u32, packets: Vec<Self::Packet>);
    /// Escalate `packets` to the upcall handler.
    fn userspace(&mut self, userdata: &[u8], packets: Vec<Self::Packet>);
    /// Record a hash side effect (no packet mutation).
    fn hash(&mut self, packets: &[Self::Packet]);
}

/// Apply `actions`, in order, to `packets` via `sink`, using the default
/// [`MAX_RECIRC_DEPTH`] recirculation bound. See [`execute_with_limit`] for
/// a caller-supplied bound; a worker sizes this from its running
/// configuration and otherwise this default only applies in this crate's
/// own tests.
///
/// # Errors
///
/// See [`execute_with_limit`].
pub fn execute<S: ActionSink>(actions: &[Action], packets: Vec<S::Packet>, sink: &mut S) -> Result<(), ActionError> {
    execute_with_limit(actions, packets, sink, MAX_RECIRC_DEPTH)
}

/// Apply `actions`, in order, to `packets` via `sink`.
///
/// Recirculating actions (`TunnelPush`, `TunnelPop`, `Recirculate`) are
/// guarded by the per-thread recirculation depth: reaching `max_recirc_depth`
/// drops the batch and returns [`ActionError::RecircTooDeep`] without
/// executing the remaining actions. This only bounds nesting within this one
/// call; a caller that recirculates packets back through `execute` across
/// multiple calls (a worker re-entering its pipeline) must track depth
/// itself and stop requeueing before calling back in.
///
/// # Errors
///
/// Returns [`ActionError::RecircTooDeep`] or [`ActionError::Unsupported`]
/// if execution cannot proceed; the caller is expected to count the drop
/// and move on, not to propagate the error further.
pub fn execute_with_limit<S: ActionSink>(
    actions: &[Action],
    mut packets: Vec<S::Packet>,
    sink: &mut S,
    max_recirc_depth: u8,
) -> Result<(), ActionError> {
    for action in actions {
        if packets.is_empty() {
            return Ok(());
        }
        match action {
            Action::Output(port) => sink.output(*port, std::mem::take(&mut packets)),
            Action::TunnelPush(data) => {
                let _guard = RecircGuard::enter(max_recirc_depth)?;
                sink.tunnel_push(*data, std::mem::take(&mut packets));
            }
            Action::TunnelPop(port) => {
                let _guard = RecircGuard::enter(max_recirc_depth)?;
                sink.tunnel_pop(*port, std::mem::take(&mut packets));
            }
            Action::Recirculate(recirc_id) => {
                let _guard = RecircGuard::enter(max_recirc_depth)?;
                sink.recirculate(*recirc_id, std::mem::take(&mut packets));
            }
            Action::Userspace { userdata } => sink.userspace(userdata, std::mem::take(&mut packets)),
            Action::Hash => sink.hash(&packets),
            Action::Sample { .. }
            | Action::PushVlan { .. }
            | Action::PopVlan
            | Action::PushMpls { .. }
            | Action::PopMpls
            | Action::Set(_)
            | Action::SetMasked(_) => sink.edit(&mut packets, action),
            Action::ConntrackAction => {
                tracing::warn!("rejecting ConntrackAction: userspace conntrack is not implemented");
                return Err(ActionError::Unsupported("conntrack"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        outputs: Vec<(PortId, usize)>,
        recircs: usize,
    }

    impl ActionSink for RecordingSink {
        type Packet = u32;

        fn output(&mut self, port: PortId, packets: Vec<Self::Packet>) {
            self.outputs.push((port, packets.len()));
        }
        fn tunnel_push(&mut self, _data: TunnelData, _packets: Vec<Self::Packet>) {
            self.recircs += 1;
        }
        fn tunnel_pop(&mut self, _port: PortId, _packets: Vec<Self::Packet>) {
            self.recircs += 1;
        }
        fn edit(&mut self, _packets: &mut [Self::Packet], _action: &Action) {}
        fn recirculate(&mut self, _recirc_id: u32, _packets: Vec<Self::Packet>) {
            self.recircs += 1;
        }
        fn userspace(&mut self, _userdata: &[u8], _packets: Vec<Self::Packet>) {}
        fn hash(&mut self, _packets: &[Self::Packet]) {}
    }

    #[test]
    fn output_reaches_sink() {
        let mut sink = RecordingSink::default();
        execute(&[Action::Output(PortId(3))], vec![1, 2, 3], &mut sink).unwrap_or_else(|_| unreachable!());
        assert_eq!(sink.outputs, vec![(PortId(3), 3)]);
    }

    #[test]
    fn conntrack_is_rejected() {
        let mut sink = RecordingSink::default();
        let err = execute(&[Action::ConntrackAction], vec![1], &mut sink).unwrap_err();
        assert_eq!(err, ActionError::Unsupported("conntrack"));
    }

    #[test]
    fn recirculation_depth_is_bounded() {
        let mut sink = RecordingSink::default();
        let actions = [Action::Recirculate(1)];
        for _ in 0..MAX_RECIRC_DEPTH {
            let _guard = RecircGuard::enter(MAX_RECIRC_DEPTH).unwrap_or_else(|_| unreachable!());
            std::mem::forget(_guard);
        }
        let err = execute(&actions, vec![1], &mut sink).unwrap_err();
        assert_eq!(err, ActionError::RecircTooDeep);
        // undo the manual depth bump from the test itself
        for _ in 0..MAX_RECIRC_DEPTH {
            RECIRC_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
        }
        assert_eq!(current_recirc_depth(), 0);
    }

    #[test]
    fn execute_with_limit_honors_a_caller_supplied_bound() {
        let mut sink = RecordingSink::default();
        let err = execute_with_limit(&[Action::Recirculate(1)], vec![1], &mut sink, 0).unwrap_err();
        assert_eq!(err, ActionError::RecircTooDeep);
        assert_eq!(sink.recircs, 0);
    }

    #[test]
    fn guard_decrements_on_drop() {
        assert_eq!(current_recirc_depth(), 0);
        {
            let _guard = RecircGuard::enter(MAX_RECIRC_DEPTH).unwrap_or_else(|_| unreachable!());
            assert_eq!(current_recirc_depth(), 1);
        }
        assert_eq!(current_recirc_depth(), 0);
    }
}
