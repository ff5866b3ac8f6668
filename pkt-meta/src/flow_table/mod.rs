// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

pub mod flow_key;
pub mod nf_expirations;
pub mod nf_lookup;
pub mod table;
mod thread_local_pq;

pub use flow_key::IpProtoKey;
pub use flow_key::TcpProtoKey;
pub use flow_key::UdpProtoKey;
pub use flow_key::{FlowKey, FlowKeyData};
pub use table::FlowTable;

pub use ::flow_info::atomic_instant::AtomicInstant;
pub use ::flow_info::*;
pub use nf_expirations::ExpirationsNF;
pub use nf_lookup::LookupNF;

use tracectl::trace_target;
trace_target!("flow-table", LevelFilter::INFO, &["pipeline"]);
