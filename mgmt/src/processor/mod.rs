// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Dataplane configuration processor.
//! This module implements the core logic to determine and build internal configurations.

mod confbuild;
mod namegen;
pub mod proc;
mod tests;
