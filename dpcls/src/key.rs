// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Flow keys and masks: a compact packed representation of the header
//! fields a packet (or a rule) cares about.

use arrayvec::ArrayVec;
use net::{Packet, Transport};
use net::buffer::PacketBufferMut;
use std::hash::Hasher;

/// The logical word slots a [`FlowKey`] can populate. Each slot is one
/// 64-bit word in the packed array when its bit is set in the bitmap.
pub mod word {
    /// Ethernet destination address (top 48 bits).
    pub const ETH_DST: usize = 0;
    /// Ethernet source address (top 48 bits).
    pub const ETH_SRC: usize = 1;
    /// Outer VLAN tag (802.1ad), if present.
    pub const VLAN_OUTER: usize = 2;
    /// Inner VLAN tag (802.1Q), if present.
    pub const VLAN_INNER: usize = 3;
    /// The ethertype of the innermost header after any VLAN tags.
    pub const ETHERTYPE: usize = 4;
    /// Network-layer source address (IPv4, or a fold of IPv6).
    pub const IP_SRC: usize = 5;
    /// Network-layer destination address (IPv4, or a fold of IPv6).
    pub const IP_DST: usize = 6;
    /// IP protocol / IPv6 next-header value.
    pub const IP_PROTO: usize = 7;
    /// `(src_port << 16) | dst_port`, or `(icmp_type << 16) | icmp_code`.
    pub const PORTS: usize = 8;
    /// TCP control flags.
    pub const TCP_FLAGS: usize = 9;
    /// VXLAN network identifier.
    pub const TUNNEL_VNI: usize = 10;
    /// Ingress port number.
    pub const IN_PORT: usize = 11;
    /// Recirculation id stamped by `Recirculate`.
    pub const RECIRC_ID: usize = 12;
    /// One past the highest word index in use.
    pub const COUNT: usize = 13;
}

/// The maximum number of populated words a [`FlowKey`] can hold.
pub const MAX_WORDS: usize = word::COUNT;

/// Bitmap of which words are populated in a [`FlowKey`] or [`Mask`].
pub type WordBitmap = u16;

/// A packed, bitmap-addressed representation of a packet's (or a rule's)
/// header fields.
///
/// Two keys are equal iff their bitmaps are equal and their packed word
/// arrays byte-compare equal; the `hash` field is not part of equality
/// (it is a cache of a hash computed on demand, not identity).
#[derive(Debug, Clone, Default)]
pub struct FlowKey {
    bitmap: WordBitmap,
    words: ArrayVec<u64, MAX_WORDS>,
    hash: u32,
}

/// A mask has exactly the same shape as a key: the populated words carry
/// the bitmask selecting which bits of the corresponding key word a rule
/// cares about.
pub type Mask = FlowKey;

impl PartialEq for FlowKey {
    fn eq(&self, other: &Self) -> bool {
        self.bitmap == other.bitmap && self.words == other.words
    }
}
impl Eq for FlowKey {}

impl FlowKey {
    /// An empty key (no populated words).
    #[must_use]
    pub fn new() -> Self {
        FlowKey::default()
    }

    /// The bitmap of populated words.
    #[must_use]
    pub fn bitmap(&self) -> WordBitmap {
        self.bitmap
    }

    /// The cached hash, if one was computed with [`FlowKey::compute_hash`]
    /// or [`FlowKey::set_hash`].
    #[must_use]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Overwrite the cached hash.
    pub fn set_hash(&mut self, hash: u32) {
        self.hash = hash;
    }

    fn packed_position(&self, idx: usize) -> usize {
        let bit = 1u16 << idx;
        (self.bitmap & (bit - 1)).count_ones() as usize
    }

    /// Set word `idx` to `value`, populating it if it was not already.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= MAX_WORDS`.
    pub fn set_word(&mut self, idx: usize, value: u64) {
        assert!(idx < MAX_WORDS, "word index out of range");
        let bit = 1u16 << idx;
        let pos = self.packed_position(idx);
        if self.bitmap & bit != 0 {
            self.words[pos] = value;
        } else {
            self.words.insert(pos, value);
            self.bitmap |= bit;
        }
    }

    /// Read word `idx`, if populated.
    #[must_use]
    pub fn get_word(&self, idx: usize) -> Option<u64> {
        if idx >= MAX_WORDS {
            return None;
        }
        let bit = 1u16 << idx;
        if self.bitmap & bit == 0 {
            return None;
        }
        Some(self.words[self.packed_position(idx)])
    }

    /// Whether word `idx` is populated.
    #[must_use]
    pub fn has_word(&self, idx: usize) -> bool {
        idx < MAX_WORDS && (self.bitmap & (1u16 << idx)) != 0
    }

    /// Extract a [`FlowKey`] from a packet's parsed headers. Fields absent
    /// from the packet are absent from the key.
    #[must_use]
    pub fn extract<Buf: PacketBufferMut>(packet: &Packet<Buf>, in_port: u32) -> Self {
        let headers = packet.headers();
        let mut key = FlowKey::new();

        key.set_word(
            word::ETH_DST,
            u64::from(u32::from_be_bytes([
                headers.eth.dst[2],
                headers.eth.dst[3],
                headers.eth.dst[4],
                headers.eth.dst[5],
            ])) | (u64::from(u16::from_be_bytes([headers.eth.dst[0], headers.eth.dst[1]])) << 32),
        );
        key.set_word(
            word::ETH_SRC,
            u64::from(u32::from_be_bytes([
                headers.eth.src[2],
                headers.eth.src[3],
                headers.eth.src[4],
                headers.eth.src[5],
            ])) | (u64::from(u16::from_be_bytes([headers.eth.src[0], headers.eth.src[1]])) << 32),
        );
        key.set_word(word::ETHERTYPE, u64::from(headers.eth.ethertype));

        if let Some(outer) = headers.vlan.first() {
            key.set_word(word::VLAN_OUTER, u64::from(outer.tci));
        }
        if let Some(inner) = headers.vlan.get(1) {
            key.set_word(word::VLAN_INNER, u64::from(inner.tci));
        }

        if let Some(net) = &headers.net {
            key.set_word(word::IP_PROTO, u64::from(net.proto()));
            key.set_word(word::IP_SRC, ip_addr_to_word(net.src()));
            key.set_word(word::IP_DST, ip_addr_to_word(net.dst()));
        }

        match &headers.transport {
            Some(Transport::Tcp(tcp)) => {
                key.set_word(
                    word::PORTS,
                    (u64::from(tcp.src_port) << 16) | u64::from(tcp.dst_port),
                );
                key.set_word(word::TCP_FLAGS, u64::from(tcp.flags));
            }
            Some(Transport::Udp(udp)) => {
                key.set_word(
                    word::PORTS,
                    (u64::from(udp.src_port) << 16) | u64::from(udp.dst_port),
                );
            }
            Some(Transport::Icmp(icmp)) => {
                key.set_word(
                    word::PORTS,
                    (u64::from(icmp.icmp_type) << 16) | u64::from(icmp.code),
                );
            }
            None => {}
        }

        if let Some(vxlan) = &headers.vxlan {
            key.set_word(word::TUNNEL_VNI, u64::from(vxlan.vni));
        }

        key.set_word(word::IN_PORT, u64::from(in_port));
        key
    }

    /// The 5-tuple hash used for EMC probes, mixing in the recirculation
    /// depth so recirculated variants of the same packet do not collide.
    #[must_use]
    pub fn compute_hash(&self, recirc_depth: u8) -> u32 {
        let mut hasher = ahash::AHasher::default();
        hasher.write_u8(recirc_depth);
        hasher.write_u16(self.bitmap);
        for &w in &self.words {
            hasher.write_u64(w);
        }
        #[allow(clippy::cast_possible_truncation)]
        let h = hasher.finish() as u32;
        h
    }

    /// `HashInMask`: scan the words `mask` selects, hashing `key_word AND
    /// mask_word` for each, folding in the count of selected words so that
    /// equal `(key AND mask)` pairs always hash equally.
    #[must_use]
    pub fn hash_in_mask(&self, mask: &Mask) -> u32 {
        let mut hasher = ahash::AHasher::default();
        let mut selected = 0u32;
        for idx in 0..MAX_WORDS {
            if let Some(mask_word) = mask.get_word(idx) {
                let key_word = self.get_word(idx).unwrap_or(0);
                hasher.write_u64(key_word & mask_word);
                selected += 1;
            }
        }
        hasher.write_u32(selected);
        #[allow(clippy::cast_possible_truncation)]
        let h = hasher.finish() as u32;
        h
    }

    /// `MatchesInMask`: for each word selected by `mask`, require
    /// `probe_word AND mask_word == self_word` (where `self` carries the
    /// rule's masked key).
    #[must_use]
    pub fn matches_in_mask(&self, mask: &Mask, probe: &FlowKey) -> bool {
        for idx in 0..MAX_WORDS {
            if let Some(mask_word) = mask.get_word(idx) {
                let rule_word = self.get_word(idx).unwrap_or(0);
                let probe_word = probe.get_word(idx).unwrap_or(0);
                if probe_word & mask_word != rule_word {
                    return false;
                }
            }
        }
        true
    }

    /// Apply `mask` to `self`, zeroing out any bits not selected and
    /// dropping words the mask does not select entirely. Used to build a
    /// rule's masked key from an installer-supplied unmasked key.
    #[must_use]
    pub fn and_mask(&self, mask: &Mask) -> FlowKey {
        let mut out = FlowKey::new();
        for idx in 0..MAX_WORDS {
            if let Some(mask_word) = mask.get_word(idx) {
                let key_word = self.get_word(idx).unwrap_or(0);
                out.set_word(idx, key_word & mask_word);
            }
        }
        out
    }

    /// A hash of the mask itself (bitmap AND words), used to locate or
    /// create the classifier subtable for this mask. Two masks with
    /// identical words but different bitmaps intentionally hash (and
    /// compare) differently: the bitmap is part of what a mask selects.
    #[must_use]
    pub fn subtable_hash(&self) -> u64 {
        let mut hasher = ahash::AHasher::default();
        hasher.write_u16(self.bitmap);
        for &w in &self.words {
            hasher.write_u64(w);
        }
        hasher.finish()
    }
}

fn ip_addr_to_word(addr: std::net::IpAddr) -> u64 {
    match addr {
        std::net::IpAddr::V4(v4) => u64::from(u32::from_be_bytes(v4.octets())),
        std::net::IpAddr::V6(v6) => {
            let octets = v6.octets();
            let mut hasher = ahash::AHasher::default();
            hasher.write(&octets);
            hasher.finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ignores_hash() {
        let mut a = FlowKey::new();
        a.set_word(word::IN_PORT, 1);
        let mut b = a.clone();
        a.set_hash(42);
        b.set_hash(99);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_bitmap_same_words_hash_differently() {
        let mut a = FlowKey::new();
        a.set_word(word::IP_SRC, 0);
        let b = FlowKey::new();
        assert_ne!(a.bitmap(), b.bitmap());
        assert_ne!(a.subtable_hash(), b.subtable_hash());
    }

    #[test]
    fn recirc_depth_perturbs_hash() {
        let mut key = FlowKey::new();
        key.set_word(word::IN_PORT, 7);
        assert_ne!(key.compute_hash(0), key.compute_hash(1));
    }

    #[test]
    fn hash_in_mask_ignores_unselected_bits() {
        let mut key = FlowKey::new();
        key.set_word(word::IP_SRC, 0xAABB_CCDD);
        let mut mask = Mask::new();
        mask.set_word(word::IP_SRC, 0xFFFF_0000);

        let mut other = FlowKey::new();
        other.set_word(word::IP_SRC, 0xAABB_1234);

        assert_eq!(key.hash_in_mask(&mask), other.hash_in_mask(&mask));
    }

    #[test]
    fn matches_in_mask_checks_only_selected_words() {
        let mut mask = Mask::new();
        mask.set_word(word::IP_PROTO, 0xFF);

        let mut rule_key = FlowKey::new();
        rule_key.set_word(word::IP_PROTO, 6);
        rule_key.set_word(word::IN_PORT, 999); // not selected by mask

        let mut probe = FlowKey::new();
        probe.set_word(word::IP_PROTO, 6);
        probe.set_word(word::IN_PORT, 1); // differs, but not selected

        assert!(rule_key.matches_in_mask(&mask, &probe));
    }
}
