// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Minimal, allocation-free header parsing.
//!
//! This module extracts just the fields the flow key (C1) needs: Ethernet
//! addresses and ethertype, up to two VLAN tags, IPv4/IPv6 addresses and
//! protocol, TCP/UDP ports and TCP flags, ICMP type/code, and a VXLAN
//! network identifier when the transport is UDP destined to the VXLAN port.
//! It does not validate checksums, walk IPv6 extension header chains, or
//! recurse into a VXLAN-encapsulated inner frame.

use arrayvec::ArrayVec;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Well-known EtherType values this crate recognizes.
pub mod ethertype {
    /// IPv4
    pub const IPV4: u16 = 0x0800;
    /// ARP
    pub const ARP: u16 = 0x0806;
    /// 802.1Q VLAN tag
    pub const VLAN: u16 = 0x8100;
    /// 802.1ad (QinQ) VLAN tag
    pub const QINQ: u16 = 0x88A8;
    /// IPv6
    pub const IPV6: u16 = 0x86DD;
    /// MPLS unicast
    pub const MPLS_UNICAST: u16 = 0x8847;
}

/// Well-known IP protocol numbers this crate recognizes.
pub mod ip_proto {
    /// ICMPv4
    pub const ICMP: u8 = 1;
    /// TCP
    pub const TCP: u8 = 6;
    /// UDP
    pub const UDP: u8 = 17;
    /// ICMPv6
    pub const ICMPV6: u8 = 58;
}

/// The UDP destination port that identifies a VXLAN-encapsulated frame.
pub const VXLAN_UDP_PORT: u16 = 4789;

/// The maximum number of VLAN tags this crate will parse (802.1ad QinQ plus
/// the inner 802.1Q tag).
pub const MAX_VLAN_TAGS: usize = 2;

/// Errors returned while parsing a packet's headers.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum HeaderParseError {
    /// The buffer ended before a complete header could be read.
    #[error("buffer too short to contain a complete {0} header")]
    TooShort(&'static str),
    /// An IPv4 header had an invalid IHL (less than 5 32-bit words).
    #[error("invalid IPv4 IHL: {0}")]
    InvalidIhl(u8),
    /// An IP header advertised a version other than 4 or 6.
    #[error("unsupported IP version: {0}")]
    UnsupportedIpVersion(u8),
}

/// A parsed Ethernet header.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Eth {
    /// Destination MAC address.
    pub dst: [u8; 6],
    /// Source MAC address.
    pub src: [u8; 6],
    /// EtherType of the next header (after any VLAN tags, this is the type
    /// of the innermost tag or the original frame's ethertype).
    pub ethertype: u16,
}

impl Eth {
    /// The length, in bytes, of an Ethernet header (no VLAN tags).
    pub const HEADER_LEN: usize = 14;

    /// Parse an Ethernet header from the front of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderParseError::TooShort`] if `bytes` is shorter than
    /// [`Eth::HEADER_LEN`].
    pub fn parse(bytes: &[u8]) -> Result<(Eth, &[u8]), HeaderParseError> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(HeaderParseError::TooShort("ethernet"));
        }
        let mut dst = [0u8; 6];
        let mut src = [0u8; 6];
        dst.copy_from_slice(&bytes[0..6]);
        src.copy_from_slice(&bytes[6..12]);
        let ethertype = u16::from_be_bytes([bytes[12], bytes[13]]);
        Ok((
            Eth {
                dst,
                src,
                ethertype,
            },
            &bytes[Self::HEADER_LEN..],
        ))
    }
}

/// A parsed 802.1Q/802.1ad VLAN tag.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Vlan {
    /// Priority code point, drop eligible indicator, and VLAN id packed as
    /// the raw 16-bit tag control information.
    pub tci: u16,
    /// EtherType of the header that follows this tag.
    pub ethertype: u16,
}

impl Vlan {
    /// The length, in bytes, of a VLAN tag (not counting the preceding
    /// tag-protocol-identifier ethertype, which the caller has already
    /// consumed to recognize this as a VLAN tag).
    pub const TAG_LEN: usize = 4;

    /// VLAN id selected out of [`Vlan::tci`].
    #[must_use]
    pub fn vid(self) -> u16 {
        self.tci & 0x0FFF
    }

    fn parse(bytes: &[u8]) -> Result<(Vlan, &[u8]), HeaderParseError> {
        if bytes.len() < Self::TAG_LEN {
            return Err(HeaderParseError::TooShort("vlan"));
        }
        let tci = u16::from_be_bytes([bytes[0], bytes[1]]);
        let ethertype = u16::from_be_bytes([bytes[2], bytes[3]]);
        Ok((Vlan { tci, ethertype }, &bytes[Self::TAG_LEN..]))
    }
}

/// Parsed network-layer (L3) header.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Net {
    /// IPv4 header.
    Ipv4(Ipv4),
    /// IPv6 header.
    Ipv6(Ipv6),
}

impl Net {
    /// The IP protocol number carried in this header (`protocol` for IPv4,
    /// `next_header` for IPv6).
    #[must_use]
    pub fn proto(&self) -> u8 {
        match self {
            Net::Ipv4(v4) => v4.proto,
            Net::Ipv6(v6) => v6.next_header,
        }
    }

    /// The source address, widened to [`std::net::IpAddr`].
    #[must_use]
    pub fn src(&self) -> std::net::IpAddr {
        match self {
            Net::Ipv4(v4) => std::net::IpAddr::V4(v4.src),
            Net::Ipv6(v6) => std::net::IpAddr::V6(v6.src),
        }
    }

    /// The destination address, widened to [`std::net::IpAddr`].
    #[must_use]
    pub fn dst(&self) -> std::net::IpAddr {
        match self {
            Net::Ipv4(v4) => std::net::IpAddr::V4(v4.dst),
            Net::Ipv6(v6) => std::net::IpAddr::V6(v6.dst),
        }
    }
}

/// A parsed IPv4 header (options are skipped, not retained).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Ipv4 {
    /// Source address.
    pub src: Ipv4Addr,
    /// Destination address.
    pub dst: Ipv4Addr,
    /// Protocol number of the following header.
    pub proto: u8,
    /// Time to live, kept for completeness though not used in the flow key.
    pub ttl: u8,
}

impl Ipv4 {
    /// The minimum length, in bytes, of an IPv4 header (no options).
    pub const MIN_HEADER_LEN: usize = 20;

    fn parse(bytes: &[u8]) -> Result<(Ipv4, &[u8]), HeaderParseError> {
        if bytes.len() < Self::MIN_HEADER_LEN {
            return Err(HeaderParseError::TooShort("ipv4"));
        }
        let version = bytes[0] >> 4;
        if version != 4 {
            return Err(HeaderParseError::UnsupportedIpVersion(version));
        }
        let ihl = bytes[0] & 0x0F;
        if ihl < 5 {
            return Err(HeaderParseError::InvalidIhl(ihl));
        }
        let header_len = ihl as usize * 4;
        if bytes.len() < header_len {
            return Err(HeaderParseError::TooShort("ipv4"));
        }
        let ttl = bytes[8];
        let proto = bytes[9];
        let src = Ipv4Addr::new(bytes[12], bytes[13], bytes[14], bytes[15]);
        let dst = Ipv4Addr::new(bytes[16], bytes[17], bytes[18], bytes[19]);
        Ok((Ipv4 { src, dst, proto, ttl }, &bytes[header_len..]))
    }
}

/// A parsed IPv6 header. Extension headers are not walked; `next_header` is
/// taken at face value as the upper-layer protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Ipv6 {
    /// Source address.
    pub src: Ipv6Addr,
    /// Destination address.
    pub dst: Ipv6Addr,
    /// Next-header value, interpreted directly as the upper-layer protocol.
    pub next_header: u8,
    /// Hop limit, kept for completeness though not used in the flow key.
    pub hop_limit: u8,
}

impl Ipv6 {
    /// The length, in bytes, of a (fixed-size) IPv6 header.
    pub const HEADER_LEN: usize = 40;

    fn parse(bytes: &[u8]) -> Result<(Ipv6, &[u8]), HeaderParseError> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(HeaderParseError::TooShort("ipv6"));
        }
        let version = bytes[0] >> 4;
        if version != 6 {
            return Err(HeaderParseError::UnsupportedIpVersion(version));
        }
        let next_header = bytes[6];
        let hop_limit = bytes[7];
        let mut src_octets = [0u8; 16];
        src_octets.copy_from_slice(&bytes[8..24]);
        let mut dst_octets = [0u8; 16];
        dst_octets.copy_from_slice(&bytes[24..40]);
        Ok((
            Ipv6 {
                src: Ipv6Addr::from(src_octets),
                dst: Ipv6Addr::from(dst_octets),
                next_header,
                hop_limit,
            },
            &bytes[Self::HEADER_LEN..],
        ))
    }
}

/// Parsed transport-layer (L4) header.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Transport {
    /// TCP header.
    Tcp(Tcp),
    /// UDP header.
    Udp(Udp),
    /// ICMPv4 or ICMPv6 header.
    Icmp(Icmp),
}

/// A parsed TCP header (options are skipped, not retained).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Tcp {
    /// Source port.
    pub src_port: u16,
    /// Destination port.
    pub dst_port: u16,
    /// Raw TCP control flags (CWR..FIN packed into the low 8 bits).
    pub flags: u8,
}

impl Tcp {
    /// The minimum length, in bytes, of a TCP header (no options).
    pub const MIN_HEADER_LEN: usize = 20;

    fn parse(bytes: &[u8]) -> Result<Tcp, HeaderParseError> {
        if bytes.len() < Self::MIN_HEADER_LEN {
            return Err(HeaderParseError::TooShort("tcp"));
        }
        Ok(Tcp {
            src_port: u16::from_be_bytes([bytes[0], bytes[1]]),
            dst_port: u16::from_be_bytes([bytes[2], bytes[3]]),
            flags: bytes[13],
        })
    }
}

/// A parsed UDP header.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Udp {
    /// Source port.
    pub src_port: u16,
    /// Destination port.
    pub dst_port: u16,
}

impl Udp {
    /// The length, in bytes, of a UDP header.
    pub const HEADER_LEN: usize = 8;

    fn parse(bytes: &[u8]) -> Result<(Udp, &[u8]), HeaderParseError> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(HeaderParseError::TooShort("udp"));
        }
        Ok((
            Udp {
                src_port: u16::from_be_bytes([bytes[0], bytes[1]]),
                dst_port: u16::from_be_bytes([bytes[2], bytes[3]]),
            },
            &bytes[Self::HEADER_LEN..],
        ))
    }
}

/// A parsed ICMP (v4 or v6) header.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Icmp {
    /// ICMP message type.
    pub icmp_type: u8,
    /// ICMP message code.
    pub code: u8,
}

impl Icmp {
    /// The minimum length, in bytes, of an ICMP header.
    pub const MIN_HEADER_LEN: usize = 4;

    fn parse(bytes: &[u8]) -> Result<Icmp, HeaderParseError> {
        if bytes.len() < Self::MIN_HEADER_LEN {
            return Err(HeaderParseError::TooShort("icmp"));
        }
        Ok(Icmp {
            icmp_type: bytes[0],
            code: bytes[1],
        })
    }
}

/// A parsed VXLAN tunnel header.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Vxlan {
    /// 24-bit VXLAN network identifier.
    pub vni: u32,
}

impl Vxlan {
    /// The length, in bytes, of a VXLAN header.
    pub const HEADER_LEN: usize = 8;

    fn parse(bytes: &[u8]) -> Result<Vxlan, HeaderParseError> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(HeaderParseError::TooShort("vxlan"));
        }
        let vni = u32::from_be_bytes([0, bytes[4], bytes[5], bytes[6]]);
        Ok(Vxlan { vni })
    }
}

/// The fully parsed stack of headers present in one packet.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Headers {
    /// Ethernet header, always present.
    pub eth: Eth,
    /// Zero, one, or two VLAN tags (802.1ad outer, 802.1Q inner).
    pub vlan: ArrayVec<Vlan, MAX_VLAN_TAGS>,
    /// Network-layer header, if recognized.
    pub net: Option<Net>,
    /// Transport-layer header, if recognized.
    pub transport: Option<Transport>,
    /// VXLAN tunnel metadata, present only when the transport is UDP to
    /// [`VXLAN_UDP_PORT`] and a complete VXLAN header follows.
    pub vxlan: Option<Vxlan>,
}

impl Headers {
    /// Parse a packet's headers from `bytes`, returning the parsed stack and
    /// the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderParseError::TooShort`] if `bytes` does not contain a
    /// complete Ethernet header.
    pub fn parse(bytes: &[u8]) -> Result<(Headers, usize), HeaderParseError> {
        let total_len = bytes.len();
        let (eth, mut rest) = Eth::parse(bytes)?;
        let mut vlan = ArrayVec::<Vlan, MAX_VLAN_TAGS>::new();
        let mut ethertype = eth.ethertype;
        while matches!(ethertype, ethertype::VLAN | ethertype::QINQ) && !vlan.is_full() {
            let (tag, tail) = Vlan::parse(rest)?;
            ethertype = tag.ethertype;
            vlan.push(tag);
            rest = tail;
        }

        let mut net = None;
        let mut transport = None;
        let mut vxlan = None;

        match ethertype {
            ethertype::IPV4 => {
                if let Ok((hdr, tail)) = Ipv4::parse(rest) {
                    let proto = hdr.proto;
                    net = Some(Net::Ipv4(hdr));
                    rest = tail;
                    parse_transport(proto, rest, &mut transport, &mut vxlan);
                }
            }
            ethertype::IPV6 => {
                if let Ok((hdr, tail)) = Ipv6::parse(rest) {
                    let proto = hdr.next_header;
                    net = Some(Net::Ipv6(hdr));
                    rest = tail;
                    parse_transport(proto, rest, &mut transport, &mut vxlan);
                }
            }
            _ => {}
        }

        Ok((
            Headers {
                eth,
                vlan,
                net,
                transport,
                vxlan,
            },
            total_len,
        ))
    }
}

fn parse_transport(
    proto: u8,
    bytes: &[u8],
    transport: &mut Option<Transport>,
    vxlan: &mut Option<Vxlan>,
) {
    match proto {
        ip_proto::TCP => {
            if let Ok(hdr) = Tcp::parse(bytes) {
                *transport = Some(Transport::Tcp(hdr));
            }
        }
        ip_proto::UDP => {
            if let Ok((hdr, tail)) = Udp::parse(bytes) {
                if hdr.dst_port == VXLAN_UDP_PORT {
                    *vxlan = Vxlan::parse(tail).ok();
                }
                *transport = Some(Transport::Udp(hdr));
            }
        }
        ip_proto::ICMP | ip_proto::ICMPV6 => {
            if let Ok(hdr) = Icmp::parse(bytes) {
                *transport = Some(Transport::Icmp(hdr));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn udp_packet() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0xAA; 6]); // dst
        buf.extend_from_slice(&[0xBB; 6]); // src
        buf.extend_from_slice(&ethertype::IPV4.to_be_bytes());
        // IPv4 header, 20 bytes, no options
        buf.push(0x45); // version 4, ihl 5
        buf.push(0); // dscp/ecn
        buf.extend_from_slice(&0u16.to_be_bytes()); // total len (unused)
        buf.extend_from_slice(&0u16.to_be_bytes()); // id
        buf.extend_from_slice(&0u16.to_be_bytes()); // flags/frag
        buf.push(64); // ttl
        buf.push(ip_proto::UDP);
        buf.extend_from_slice(&0u16.to_be_bytes()); // checksum
        buf.extend_from_slice(&[10, 0, 0, 1]);
        buf.extend_from_slice(&[10, 0, 0, 2]);
        // UDP header
        buf.extend_from_slice(&1000u16.to_be_bytes());
        buf.extend_from_slice(&2000u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes()); // length
        buf.extend_from_slice(&0u16.to_be_bytes()); // checksum
        buf
    }

    #[test]
    fn parses_ethernet_ipv4_udp() {
        let buf = udp_packet();
        let (headers, consumed) = Headers::parse(&buf).unwrap_or_else(|_| unreachable!());
        assert_eq!(consumed, buf.len());
        assert_eq!(headers.eth.ethertype, ethertype::IPV4);
        let Some(Net::Ipv4(ipv4)) = headers.net else {
            unreachable!("expected ipv4 header")
        };
        assert_eq!(ipv4.proto, ip_proto::UDP);
        assert_eq!(ipv4.src, Ipv4Addr::new(10, 0, 0, 1));
        let Some(Transport::Udp(udp)) = headers.transport else {
            unreachable!("expected udp header")
        };
        assert_eq!(udp.src_port, 1000);
        assert_eq!(udp.dst_port, 2000);
    }

    #[test]
    fn rejects_short_ethernet() {
        assert_eq!(
            Headers::parse(&[0u8; 4]),
            Err(HeaderParseError::TooShort("ethernet"))
        );
    }

    #[test]
    fn parses_vlan_tagged_frame() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0xAA; 6]);
        buf.extend_from_slice(&[0xBB; 6]);
        buf.extend_from_slice(&ethertype::VLAN.to_be_bytes());
        buf.extend_from_slice(&100u16.to_be_bytes()); // tci, vid=100
        buf.extend_from_slice(&ethertype::IPV4.to_be_bytes());
        buf.extend(udp_packet().into_iter().skip(Eth::HEADER_LEN));
        let (headers, _) = Headers::parse(&buf).unwrap_or_else(|_| unreachable!());
        assert_eq!(headers.vlan.len(), 1);
        assert_eq!(headers.vlan[0].vid(), 100);
    }
}
