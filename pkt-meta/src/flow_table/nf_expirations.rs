// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network Function specific flow table.

use concurrency::sync::Arc;
use net::buffer::PacketBufferMut;
use net::packet::Packet;
use pipeline::NetworkFunction;

use crate::flow_table::FlowTable;

use tracectl::trace_target;
trace_target!("flow-expiration", LevelFilter::INFO, &["pipeline"]);

/// Network Function that reap expired entries from the flow table for the current thread.
///
/// Note: This only reaps expired entries on the priority queue for the current thread.
/// It does not reap expired entries on other threads.
///
/// This stage should be run after all other pipeline stages to reap any expired entries.
pub struct ExpirationsNF {
    flow_table: Arc<FlowTable>,
}

impl ExpirationsNF {
    pub fn new(flow_table: Arc<FlowTable>) -> Self {
        Self { flow_table }
    }
}

impl<Buf: PacketBufferMut> NetworkFunction<Buf> for ExpirationsNF {
    fn process<'a, Input: Iterator<Item = Packet<Buf>> + 'a>(
        &'a mut self,
        input: Input,
    ) -> impl Iterator<Item = Packet<Buf>> + 'a {
        self.flow_table.reap_expired();
        input
    }
}
