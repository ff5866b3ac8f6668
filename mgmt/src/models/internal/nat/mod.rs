// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]

#[allow(unused)]
pub mod peering;
mod prefixtrie;
pub mod tables;
