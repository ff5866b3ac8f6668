// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! [`Packet`]: a packet buffer paired with its parsed header stack.

use crate::buffer::PacketBufferMut;
use crate::headers::{HeaderParseError, Headers, Net, Transport};
use std::hash::{Hash, Hasher};

/// A packet buffer together with the headers parsed out of it.
///
/// Parsing happens once, at construction; downstream consumers (the flow
/// key extractor, the classifier, the action executor) read
/// [`Packet::headers`] rather than re-parsing the buffer.
#[derive(Debug)]
pub struct Packet<Buf: PacketBufferMut> {
    buf: Buf,
    headers: Headers,
}

impl<Buf: PacketBufferMut> Packet<Buf> {
    /// Parse `buf`'s headers and bundle them together.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderParseError`] if `buf` does not contain at least a
    /// complete Ethernet header.
    pub fn new(buf: Buf) -> Result<Self, HeaderParseError> {
        let (headers, _) = Headers::parse(buf.as_ref())?;
        Ok(Packet { buf, headers })
    }

    /// The parsed header stack.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Borrow the underlying buffer.
    #[must_use]
    pub fn buf(&self) -> &Buf {
        &self.buf
    }

    /// Mutably borrow the underlying buffer.
    pub fn buf_mut(&mut self) -> &mut Buf {
        &mut self.buf
    }

    /// Consume the packet, returning its buffer.
    #[must_use]
    pub fn into_buf(self) -> Buf {
        self.buf
    }

    /// Re-derive the header stack from the current buffer contents.
    ///
    /// Call this after mutating the buffer in place (a VLAN/MPLS push or
    /// pop, a tunnel push or pop) so [`Packet::headers`] reflects the new
    /// wire layout.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderParseError`] under the same conditions as
    /// [`Packet::new`].
    pub fn reparse(&mut self) -> Result<(), HeaderParseError> {
        let (headers, _) = Headers::parse(self.buf.as_ref())?;
        self.headers = headers;
        Ok(())
    }

    /// A software 5-tuple hash, used when a worker has no hardware RSS hash
    /// for the packet (e.g. packets arriving from a non-hashing source, or
    /// packets re-entering the pipeline after a tunnel pop).
    ///
    /// Mixes `recirc_depth` into the hash so that a packet recirculated at
    /// depth N hashes differently than the same packet at depth N-1,
    /// matching the way a hardware RSS hash is perturbed by recirculation.
    #[must_use]
    pub fn software_hash(&self, recirc_depth: u8) -> u64 {
        let mut hasher = ahash::AHasher::default();
        recirc_depth.hash(&mut hasher);
        self.headers.eth.src.hash(&mut hasher);
        self.headers.eth.dst.hash(&mut hasher);
        for tag in &self.headers.vlan {
            tag.vid().hash(&mut hasher);
        }
        if let Some(net) = &self.headers.net {
            net.src().hash(&mut hasher);
            net.dst().hash(&mut hasher);
            net.proto().hash(&mut hasher);
        }
        match &self.headers.transport {
            Some(Transport::Tcp(tcp)) => {
                tcp.src_port.hash(&mut hasher);
                tcp.dst_port.hash(&mut hasher);
            }
            Some(Transport::Udp(udp)) => {
                udp.src_port.hash(&mut hasher);
                udp.dst_port.hash(&mut hasher);
            }
            Some(Transport::Icmp(icmp)) => {
                icmp.icmp_type.hash(&mut hasher);
                icmp.code.hash(&mut hasher);
            }
            None => {}
        }
        if let Some(vxlan) = &self.headers.vxlan {
            vxlan.vni.hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(any(test, feature = "test_buffer"))]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TestBuffer;

    fn udp_packet_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0xAA; 6]);
        buf.extend_from_slice(&[0xBB; 6]);
        buf.extend_from_slice(&crate::headers::ethertype::IPV4.to_be_bytes());
        buf.push(0x45);
        buf.push(0);
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.push(64);
        buf.push(crate::headers::ip_proto::UDP);
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&[10, 0, 0, 1]);
        buf.extend_from_slice(&[10, 0, 0, 2]);
        buf.extend_from_slice(&1000u16.to_be_bytes());
        buf.extend_from_slice(&2000u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf
    }

    #[test]
    fn parses_and_hashes() {
        let buf = TestBuffer::from_raw_data(&udp_packet_bytes());
        let packet = Packet::new(buf).unwrap_or_else(|_| unreachable!());
        let h0 = packet.software_hash(0);
        let h1 = packet.software_hash(1);
        assert_ne!(h0, h1, "recirculation depth must perturb the hash");
    }

    #[test]
    fn rejects_truncated_buffer() {
        let buf = TestBuffer::from_raw_data(&[0u8; 4]);
        assert!(Packet::new(buf).is_err());
    }
}
