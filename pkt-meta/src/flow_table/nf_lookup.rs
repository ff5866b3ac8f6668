// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network Function specific flow table.

use tracing::debug;

use concurrency::sync::Arc;
use flow_info::ExtractRef;
use net::buffer::PacketBufferMut;
use net::packet::{Packet, VpcDiscriminant};
use pipeline::NetworkFunction;

use crate::flow_table::{FlowKey, FlowTable};

pub struct LookupNF {
    flow_table: Arc<FlowTable>,
}

impl LookupNF {
    pub fn new(flow_table: Arc<FlowTable>) -> Self {
        Self { flow_table }
    }
}

impl<Buf: PacketBufferMut> NetworkFunction<Buf> for LookupNF {
    fn process<'a, Input: Iterator<Item = Packet<Buf>> + 'a>(
        &'a mut self,
        input: Input,
    ) -> impl Iterator<Item = Packet<Buf>> + 'a {
        input.filter_map(move |mut packet| {
            let flow_key = FlowKey::try_from(crate::flow_table::flow_key::Uni(&packet)).ok();
            let Some(flow_key) = flow_key else {
                return packet.enforce();
            };
            if let Some(flow_info) = self.flow_table.lookup(&flow_key) {
                debug!(
                    "LookupNF: Tagging packet with flow info for flow key {:?}",
                    flow_key
                );
                if let Some(dst_vpc_info) = flow_info.locked.read().unwrap().dst_vpc_info.as_ref() {
                    let dst_vpcd = dst_vpc_info.extract_ref::<VpcDiscriminant>();
                    if let Some(dst_vpcd) = dst_vpcd {
                        debug!(
                            "LookupNF: Tagging packet with dst_vpcd from flow info {:?}, old dst_vpcd {:?}",
                            dst_vpcd, packet.meta.dst_vpcd
                        );
                        packet.meta.dst_vpcd = Some(*dst_vpcd);
                    }
                }
                packet.meta.flow_info = Some(flow_info);
            }
            packet.enforce()
        })
    }
}
