// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Adjacency table module

pub mod adjacency;
pub mod atablerw;
pub mod resolver;
