// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config renderer: static routes

use std::fmt::Display;

use crate::frr::renderer::builder::{ConfigBuilder, Render};
use crate::models::internal::routing::statics::{StaticRoute, StaticRouteNhop};
use routing::prefix::Prefix;

/* impl Display */
impl Display for StaticRouteNhop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaticRouteNhop::Interface(ifname) => write!(f, "{ifname}"),
            StaticRouteNhop::Address(address) => write!(f, "{address}"),
            StaticRouteNhop::Null0 => write!(f, "Null0"),
            StaticRouteNhop::Reject => write!(f, "reject"),
            StaticRouteNhop::Blackhole => write!(f, "blackhole"),
            StaticRouteNhop::Unset => panic!("Missing next-hop"),
        }
    }
}

fn ip_route_type_str(prefix: &Prefix) -> &'static str {
    match prefix {
        Prefix::IPV4(_) => "ip",
        Prefix::IPV6(_) => "ipv6",
    }
}

/* impl Render */
impl Render for StaticRoute {
    type Context = ();
    type Output = ConfigBuilder;
    fn render(&self, _ctx: &Self::Context) -> Self::Output {
        let mut config = ConfigBuilder::new();
        let mut statement = format!(
            " {} route {} {}",
            ip_route_type_str(&self.prefix),
            self.prefix,
            self.next_hop
        );
        if let Some(nhop_vrf) = &self.next_hop_vrf {
            statement += format!(" nexthop-vrf {nhop_vrf}").as_ref();
        }
        if let Some(tag) = &self.tag {
            statement += format!(" tag {tag}").as_ref();
        }
        config += statement;
        config
    }
}
