// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config renderer: static routes

use crate::frr::renderer::builder::{ConfigBuilder, Render, Rendered};
use config::internal::routing::statics::{StaticRoute, StaticRouteNhop};
use lpm::prefix::Prefix;

/* impl Display */
impl Rendered for StaticRouteNhop {
    fn rendered(&self) -> String {
        match self {
            StaticRouteNhop::Interface(ifname) => ifname.to_string(),
            StaticRouteNhop::Address(address) => format!("{address}"),
            StaticRouteNhop::Null0 => "Null0".to_string(),
            StaticRouteNhop::Reject => "reject".to_string(),
            StaticRouteNhop::Blackhole => "blackhole".to_string(),
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
            self.next_hop.rendered()
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
