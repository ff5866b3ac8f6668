// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::models::internal::nat::prefixtrie::{PrefixTrie, TrieError};
use crate::models::internal::nat::tables::{NatPrefixRuleTable, VniTable};
use routing::prefix::Prefix;
use std::collections::HashMap;
use std::fmt::Debug;

#[derive(Debug, Clone)]
pub struct PeeringIps {
    pub cidr: Prefix,
}

#[derive(Debug, Clone)]
pub struct PeeringAs {
    pub cidr: Prefix,
}

#[derive(Debug, Clone)]
pub struct PeeringEntry {
    pub internal: Vec<PeeringIps>,
    pub external: Vec<PeeringAs>,
}

#[derive(Debug, Clone)]
pub struct Peering {
    pub name: String,
    pub entries: HashMap<String, PeeringEntry>,
}

#[tracing::instrument(level = "trace")]
pub fn add_peering(vrf: &mut VniTable, peering: &Peering) -> Result<(), TrieError> {
    peering.entries.iter().try_for_each(|(name, entry)| {
        match name {
            n if n == vrf.name() => {
                // Create new peering table for source NAT
                let mut peering_table = NatPrefixRuleTable::new();
                entry
                    .internal
                    .iter()
                    .zip(entry.external.iter())
                    .try_for_each(|(internal, external)| {
                        peering_table.insert(&internal.cidr, external.cidr.clone())
                    })?;
                vrf.table_src_nat_prefixes.push(peering_table);

                // Update peering table to make relevant prefixes point to
                // the new peering table
                let peering_index = vrf.table_src_nat_prefixes.len() - 1;
                entry.internal.iter().try_for_each(|internal| {
                    vrf.table_src_nat_peers
                        .rules
                        .insert(&internal.cidr, peering_index)
                })
            }
            _ => {
                // Update table for destination NAT
                entry
                    .internal
                    .iter()
                    .zip(entry.external.iter())
                    .try_for_each(|(internal, external)| {
                        vrf.table_dst_nat
                            .insert(&external.cidr, internal.cidr.clone())
                    })
            }
        }
    })
}
