// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! Flow keys, masks, and the tuple-space classifier (DPCLS): the per-worker
//! structures that turn "what does this packet's header look like" into
//! "which installed rule, if any, matches it".

pub mod classifier;
pub mod key;
pub mod rule;
pub mod subtable;

pub use classifier::{ClassifierReader, ClassifierWriter, LOOKUP_GROUP_SIZE};
pub use key::{FlowKey, Mask};
pub use rule::Rule;
pub use subtable::Subtable;
