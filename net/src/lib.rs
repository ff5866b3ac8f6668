// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! Packet buffer traits and a minimal header-parsing layer used to extract
//! the fields the flow key cares about: Ethernet, VLAN, IPv4/IPv6,
//! TCP/UDP/ICMP, and VXLAN tunnel metadata.
//!
//! This crate does not attempt full protocol correctness (checksums,
//! extension header walks, IP options); it extracts just enough to build a
//! flow key and to push/pop a VXLAN header for the tunnel actions.

pub mod buffer;
pub mod headers;
pub mod packet;

pub use headers::*;
pub use packet::Packet;
