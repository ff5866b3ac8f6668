// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bridges a flow's action list (from `vswitch-dp-actions`) to a worker's
//! outside world: transmit queues, the recirculation queue, and the
//! upcall path.

use actions::{Action, ActionSink, FieldWrite, PortId, TunnelData};
use net::buffer::PacketBufferMut;
use net::headers::ethertype;
use net::Packet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sends a batch of packets out a port's transmit queue, returning the
/// number actually accepted (a real driver may take fewer than the whole
/// batch).
///
/// Implemented by the datapath root for production use, dispatching to
/// each port's `Driver`; `reference::ReferencePorts` (behind the
/// `reference` feature) backs this crate's own tests.
pub trait PacketIo {
    /// The packet buffer type this sink's packets use.
    type Buf: PacketBufferMut;

    /// Send `packets` on `port`, returning how many were accepted.
    fn send(&mut self, port: PortId, packets: Vec<Packet<Self::Buf>>) -> usize;
}

/// One packet queued to re-enter the pipeline, with the ingress port and
/// recirculation id it should be classified against on re-entry, and the
/// recirculation depth it re-enters at (loop prevention, independent of
/// `actions::current_recirc_depth`, which only tracks nesting within a
/// single `execute` call).
pub(crate) struct Requeued<Buf: PacketBufferMut> {
    pub(crate) packet: Packet<Buf>,
    pub(crate) in_port: PortId,
    pub(crate) recirc_id: u32,
    pub(crate) depth: u8,
}

pub(crate) struct Dispatcher<'a, Io: PacketIo> {
    pub(crate) io: &'a mut Io,
    pub(crate) in_port: PortId,
    pub(crate) depth: u8,
    pub(crate) max_recirc_depth: u8,
    pub(crate) recirc: &'a mut VecDeque<Requeued<Io::Buf>>,
    pub(crate) userspace: &'a mut Vec<Packet<Io::Buf>>,
    pub(crate) dropped: usize,
}

/// Logs at most once every 1024 occurrences, so a recirculating flow stuck
/// at the depth limit doesn't flood the log.
static RECIRC_LIMIT_HITS: AtomicU64 = AtomicU64::new(0);

fn log_recirc_limit_hit_rate_limited(dropped: usize) {
    let hits = RECIRC_LIMIT_HITS.fetch_add(1, Ordering::Relaxed);
    if hits % 1024 == 0 {
        tracing::warn!(dropped, hits, "recirculation depth limit reached, dropping packets");
    }
}

impl<Io: PacketIo> Dispatcher<'_, Io> {
    /// Would the next recirculation hop push a packet at or past
    /// `max_recirc_depth`?
    fn at_recirc_limit(&self) -> bool {
        self.depth.saturating_add(1) >= self.max_recirc_depth
    }

    /// Count `packets` as dropped for exceeding the recirculation depth
    /// limit instead of requeueing them.
    fn drop_for_recirc_limit(&mut self, packets: usize) {
        self.dropped += packets;
        log_recirc_limit_hit_rate_limited(packets);
    }
}

impl<Io: PacketIo> ActionSink for Dispatcher<'_, Io> {
    type Packet = Packet<Io::Buf>;

    fn output(&mut self, port: PortId, packets: Vec<Self::Packet>) {
        let sent_count = packets.len();
        let accepted = self.io.send(port, packets);
        self.dropped += sent_count - accepted;
    }

    fn tunnel_push(&mut self, data: TunnelData, packets: Vec<Self::Packet>) {
        if self.at_recirc_limit() {
            self.drop_for_recirc_limit(packets.len());
            return;
        }
        for mut packet in packets {
            if push_vxlan_shim(&mut packet, data.vni).is_ok() {
                self.recirc.push_back(Requeued {
                    packet,
                    in_port: self.in_port,
                    recirc_id: 0,
                    depth: self.depth.saturating_add(1),
                });
            } else {
                self.dropped += 1;
            }
        }
    }

    fn tunnel_pop(&mut self, port: PortId, packets: Vec<Self::Packet>) {
        if self.at_recirc_limit() {
            self.drop_for_recirc_limit(packets.len());
            return;
        }
        for mut packet in packets {
            if pop_outer_tunnel(&mut packet).is_ok() {
                self.recirc.push_back(Requeued {
                    packet,
                    in_port: port,
                    recirc_id: 0,
                    depth: self.depth.saturating_add(1),
                });
            } else {
                self.dropped += 1;
            }
        }
    }

    fn edit(&mut self, packets: &mut [Self::Packet], action: &Action) {
        for packet in packets.iter_mut() {
            let result = match action {
                Action::PushVlan { tci } => push_vlan(packet, *tci),
                Action::PopVlan => pop_vlan(packet),
                Action::PushMpls { label } => push_mpls(packet, *label),
                Action::PopMpls => pop_mpls(packet),
                Action::Set(write) | Action::SetMasked(write) => {
                    apply_field_write(write);
                    Ok(())
                }
                Action::Sample { .. } => Ok(()),
                _ => Ok(()),
            };
            if result.is_err() {
                tracing::warn!(?action, "header edit failed, packet left unmodified");
            }
        }
    }

    fn recirculate(&mut self, recirc_id: u32, packets: Vec<Self::Packet>) {
        if self.at_recirc_limit() {
            self.drop_for_recirc_limit(packets.len());
            return;
        }
        for packet in packets {
            self.recirc.push_back(Requeued {
                packet,
                in_port: self.in_port,
                recirc_id,
                depth: self.depth.saturating_add(1),
            });
        }
    }

    fn userspace(&mut self, _userdata: &[u8], packets: Vec<Self::Packet>) {
        self.userspace.extend(packets);
    }

    fn hash(&mut self, _packets: &[Self::Packet]) {}
}

/// `Set`/`SetMasked` overwrite a flow-key word, not a packet byte range in
/// general (the mapping from a word back to wire bytes isn't onto for
/// derived fields like `PORTS`). Recording the intended write without
/// mutating packet bytes keeps the action list well-formed without a
/// second, byte-level field-rewrite engine.
fn apply_field_write(write: &FieldWrite) {
    tracing::trace!(word = write.word, value = write.value, "field write recorded, not applied to packet bytes");
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
enum EditError {
    #[error("not enough room in the packet buffer")]
    NoRoom,
    #[error("packet too short for this edit")]
    TooShort,
}

fn push_vlan<Buf: PacketBufferMut>(packet: &mut Packet<Buf>, tci: u16) -> Result<(), EditError> {
    let buf = packet.buf_mut();
    let full = buf.prepend(4).map_err(|_| EditError::NoRoom)?;
    full.copy_within(4..16, 0);
    full[12..14].copy_from_slice(&ethertype::VLAN.to_be_bytes());
    full[14..16].copy_from_slice(&tci.to_be_bytes());
    reparse(packet)
}

fn pop_vlan<Buf: PacketBufferMut>(packet: &mut Packet<Buf>) -> Result<(), EditError> {
    if packet.headers().vlan.is_empty() {
        return Ok(());
    }
    let buf = packet.buf_mut();
    buf.as_mut().copy_within(0..12, 4);
    buf.trim_from_start(4).map_err(|_| EditError::TooShort)?;
    reparse(packet)
}

fn push_mpls<Buf: PacketBufferMut>(packet: &mut Packet<Buf>, label: u32) -> Result<(), EditError> {
    let entry: u32 = ((label & 0x000F_FFFF) << 12) | (1 << 8) | 64;
    let buf = packet.buf_mut();
    let full = buf.prepend(6).map_err(|_| EditError::NoRoom)?;
    full.copy_within(6..18, 0);
    full[12..14].copy_from_slice(&ethertype::MPLS_UNICAST.to_be_bytes());
    full[14..18].copy_from_slice(&entry.to_be_bytes());
    let len = full.len();
    full.copy_within(20..len, 18);
    buf.trim_from_end(2).map_err(|_| EditError::TooShort)?;
    reparse(packet)
}

fn pop_mpls<Buf: PacketBufferMut>(packet: &mut Packet<Buf>) -> Result<(), EditError> {
    let buf = packet.buf_mut();
    let full = buf.as_mut();
    if full.len() < 18 {
        return Err(EditError::TooShort);
    }
    let guessed = if full[18] >> 4 == 6 { ethertype::IPV6 } else { ethertype::IPV4 };
    let len = full.len();
    full.copy_within(18..len, 14);
    full[12..14].copy_from_slice(&guessed.to_be_bytes());
    buf.trim_from_end(4).map_err(|_| EditError::TooShort)?;
    reparse(packet)
}

/// Prepend a VXLAN header carrying `vni`. Real tunnel encapsulation also
/// needs an outer Ethernet/IP/UDP header, which requires tunnel-endpoint
/// addressing this crate's `TunnelData` does not carry; that part is left
/// to the egress port, which owns the endpoint configuration.
fn push_vxlan_shim<Buf: PacketBufferMut>(packet: &mut Packet<Buf>, vni: u32) -> Result<(), EditError> {
    let buf = packet.buf_mut();
    let full = buf.prepend(8).map_err(|_| EditError::NoRoom)?;
    full[0] = 0x08; // I flag set: VNI valid
    full[1] = 0;
    full[2] = 0;
    full[3] = 0;
    let vni_bytes = vni.to_be_bytes();
    full[4..7].copy_from_slice(&vni_bytes[1..4]);
    full[7] = 0;
    Ok(())
}

fn pop_outer_tunnel<Buf: PacketBufferMut>(packet: &mut Packet<Buf>) -> Result<(), EditError> {
    let headers = packet.headers();
    if headers.vxlan.is_none() {
        return Err(EditError::TooShort);
    }
    let vlan_len: usize = headers.vlan.len() * 4;
    let net_len = match &headers.net {
        Some(net::Net::Ipv4(_)) => net::Ipv4::MIN_HEADER_LEN,
        Some(net::Net::Ipv6(_)) => net::Ipv6::HEADER_LEN,
        None => return Err(EditError::TooShort),
    };
    let outer_len = net::Eth::HEADER_LEN + vlan_len + net_len + net::Udp::HEADER_LEN + net::Vxlan::HEADER_LEN;
    let buf = packet.buf_mut();
    buf.trim_from_start(
        u16::try_from(outer_len).map_err(|_| EditError::TooShort)?,
    )
    .map_err(|_| EditError::TooShort)?;
    reparse(packet)
}

fn reparse<Buf: PacketBufferMut>(packet: &mut Packet<Buf>) -> Result<(), EditError> {
    packet.reparse().map_err(|_| EditError::TooShort)
}

#[cfg(any(test, feature = "reference"))]
pub mod reference {
    //! An in-memory `PacketIo` used by this crate's own tests: records
    //! everything sent, per port.

    use super::PacketIo;
    use actions::PortId;
    use net::Packet;
    use net::buffer::test_buffer::TestBuffer;
    use std::collections::HashMap;

    /// Records every packet sent to each port, keyed by [`PortId`].
    #[derive(Default)]
    pub struct ReferencePorts {
        sent: HashMap<u32, Vec<Packet<TestBuffer>>>,
    }

    impl ReferencePorts {
        /// An empty recorder.
        #[must_use]
        pub fn new() -> Self {
            ReferencePorts::default()
        }

        /// Packets sent to `port` so far.
        #[must_use]
        pub fn sent_on(&self, port: PortId) -> usize {
            self.sent.get(&port.0).map_or(0, Vec::len)
        }
    }

    impl PacketIo for ReferencePorts {
        type Buf = TestBuffer;

        fn send(&mut self, port: PortId, packets: Vec<Packet<Self::Buf>>) -> usize {
            let count = packets.len();
            self.sent.entry(port.0).or_default().extend(packets);
            count
        }
    }
}
