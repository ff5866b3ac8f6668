// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! Interactive management CLI for the datapath process: a command tree,
//! readline completion, and an in-process dispatcher that drives a
//! [`datapath::DatapathRoot`] directly (no wire protocol, no separate
//! process).

pub mod cmdtree;
pub mod cmdtree_dp;
pub mod completions;
pub mod dispatch;
pub mod terminal;

pub use terminal::Terminal;
