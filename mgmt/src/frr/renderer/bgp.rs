// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::frr::renderer::builder::{ConfigBuilder, MARKER, Render};
use crate::models::internal::routing::bgp::BgpConfig;
use crate::models::internal::routing::bgp::BgpNeighType;
use crate::models::internal::routing::bgp::BgpNeighbor;
use crate::models::internal::routing::bgp::BgpOptions;
use crate::models::internal::routing::bgp::BgpUpdateSource;
use crate::models::internal::routing::bgp::NeighSendCommunities;
use crate::models::internal::routing::bgp::Redistribute;
use crate::models::internal::routing::bgp::VrfImports;
use crate::models::internal::routing::bgp::{AfIpv4Ucast, AfIpv6Ucast, AfL2vpnEvpn};
use crate::models::internal::routing::bgp::{BgpNeighCapabilities, Protocol};

use std::fmt::Display;

/* impl Display */
impl Display for BgpNeighType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BgpNeighType::Unset => panic!("Bgp neighbor without type"),
            BgpNeighType::Host(address) => write!(f, "{address}"),
            BgpNeighType::PeerGroup(group) => write!(f, "{group}"),
        }
    }
}
impl Display for BgpUpdateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BgpUpdateSource::Address(address) => write!(f, "{address}"),
            BgpUpdateSource::Interface(ifname) => write!(f, "{ifname}"),
        }
    }
}
impl Display for NeighSendCommunities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NeighSendCommunities::All => write!(f, "all"),
            NeighSendCommunities::Both => write!(f, "both"),
            NeighSendCommunities::Extended => write!(f, "extended"),
            NeighSendCommunities::Large => write!(f, "large"),
            NeighSendCommunities::Standard => write!(f, "standard"),
        }
    }
}
impl Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Connected => write!(f, "connected"),
            Protocol::Local => write!(f, "local"),
            Protocol::Static => write!(f, "static"),
            Protocol::ISIS => write!(f, "isis"),
            Protocol::OSPF => write!(f, "ospf"),
        }
    }
}

/* utils to render BGP neighbor configs */
fn bgp_neigh_minimal(neigh: &BgpNeighbor, name: &str) -> String {
    let mut out;
    if neigh.is_peer_group() {
        out = format!(" neighbor {name} peer-group")
    } else {
        out = format!(" neighbor {name}");
        if let Some(peer_group) = &neigh.peer_group {
            out += format!(" peer-group {peer_group}").as_str();
        } else if let Some(remote_as) = neigh.remote_as {
            out += format!(" remote-as {remote_as}").as_str();
        } else {
            panic!("Missing peer-group or ASN");
        }
    }
    out
}
#[allow(clippy::option_map_unit_fn)]
fn bgp_neigh_options(neigh: &BgpNeighbor, prefix: &str) -> ConfigBuilder {
    let mut cfg = ConfigBuilder::new();

    /* remote-as in case of a peer group */
    if neigh.is_peer_group() {
        neigh
            .remote_as
            .map(|asn| cfg += format!(" {} remote-as {asn}", &prefix));
    }

    /* description */
    neigh
        .description
        .as_ref()
        .map(|d| cfg += format!(" {} description {d}", &prefix));

    /* update source */
    neigh
        .update_source
        .as_ref()
        .map(|source| cfg += format!(" {} update-source {source}", &prefix));

    /* route-map in */
    neigh
        .route_map_in
        .as_ref()
        .map(|rmap| cfg += format!(" {} route-map {rmap} in", &prefix));

    /* route-map out */
    neigh
        .route_map_out
        .as_ref()
        .map(|rmap| cfg += format!(" {} route-map {rmap} out", &prefix));

    /* weight */
    neigh
        .weight
        .as_ref()
        .map(|weight| cfg += format!(" {} weight {weight}", &prefix));

    /* send communities */
    neigh
        .send_community
        .as_ref()
        .map(|com| cfg += format!(" {} send-community {com}", &prefix));

    /* ebgp multihop */
    neigh
        .ebgp_multihop
        .as_ref()
        .map(|max_hops| cfg += format!(" {} ebgp-multihop {max_hops}", &prefix));

    /* ttl security */
    neigh
        .ttl_sec_hops
        .as_ref()
        .map(|hops| cfg += format!(" {} ttl-security hops {hops}", &prefix));

    /* advertisement interval */
    neigh
        .advertisement_interval
        .as_ref()
        .map(|interval| cfg += format!(" {} advertisement-interval {interval}", &prefix));

    /* connect timer */
    neigh
        .timer_connect
        .as_ref()
        .map(|timer| cfg += format!(" {} timers connect {timer}", &prefix));

    /* delay-open timer */
    neigh
        .timer_delay_open
        .as_ref()
        .map(|timer| cfg += format!(" {} timers delayopen {timer}", &prefix));

    /* max prefixes in */
    neigh
        .maximum_prefix
        .as_ref()
        .map(|num| cfg += format!(" {} maximum-prefix {num}", &prefix));

    /* max prefixes out */
    neigh
        .maximum_prefix_out
        .as_ref()
        .map(|num| cfg += format!(" {} maximum-prefix-out {num}", &prefix));

    /* TCP MSS  */
    neigh
        .tcp_mss
        .as_ref()
        .map(|mss| cfg += format!(" {} tcp-mss {mss}", &prefix));

    cfg
}
fn bgp_neigh_bool_switches(neigh: &BgpNeighbor, prefix: &str) -> ConfigBuilder {
    let mut cfg = ConfigBuilder::new();

    /* passive */
    if neigh.passive {
        cfg += format!(" {} passive", &prefix);
    }

    /* as override */
    if neigh.as_override {
        cfg += format!(" {} as-override", &prefix);
    }

    /* strict-capability-match */
    if neigh.strict_capability_match {
        cfg += format!(" {} strict-capability-match", &prefix);
    }
    /* strict-capability-match */
    if neigh.dont_capability_negotiate {
        cfg += format!(" {} dont-capability-negotiate", &prefix);
    }

    /* allow as in */
    if neigh.allow_as_in {
        cfg += format!(" {} allowas-in", &prefix);
    }

    /* extended link bw */
    if neigh.extended_link_bandwidth {
        cfg += format!(" {} allowas-in", &prefix);
    }

    /* extended link bw */
    if neigh.next_hop_self {
        cfg += format!(" {} next-hop-self", &prefix);
    }

    /* extended link bw */
    if neigh.remove_private_as {
        cfg += format!(" {} remove-private-AS", &prefix);
    }

    /* extended link bw */
    if neigh.rr_client {
        cfg += format!(" {} route-reflector-client", &prefix);
    }

    /* default originate */
    if neigh.default_originate {
        cfg += format!(" {} default-originate", &prefix);
    }
    cfg
}
fn bgp_neigh_capabilities(capa: &BgpNeighCapabilities, prefix: &str) -> ConfigBuilder {
    let mut cfg = ConfigBuilder::new();
    if capa.dynamic {
        cfg += format!(" {} capability dynamic", &prefix);
    }
    if capa.ext_nhop {
        cfg += format!(" {} capability extended-nexthop", &prefix);
    }
    if capa.fqdn {
        cfg += format!(" {} capability fqdn", &prefix);
    }
    if capa.software_ver {
        cfg += format!(" {} capability software-version", &prefix);
    }
    cfg
}

/* impl Render */
impl Render for Redistribute {
    type Context = ();
    type Output = ConfigBuilder;
    fn render(&self, _: &Self::Context) -> Self::Output {
        let mut redist = format!(" redistribute {}", self.protocol);
        if let Some(metric) = self.metric {
            redist += format!(" metric {metric}").as_str();
        }
        if let Some(rmap) = &self.rmap {
            redist += format!(" route-map {rmap}").as_str();
        }
        ConfigBuilder::from_string(redist)
    }
}
impl Render for VrfImports {
    type Context = ();
    type Output = ConfigBuilder;
    #[allow(clippy::option_map_unit_fn)]
    fn render(&self, _: &Self::Context) -> ConfigBuilder {
        let mut cfg = ConfigBuilder::new();
        self.routemap
            .as_ref()
            .map(|rmap| cfg += format!(" import vrf route-map {rmap}"));
        self.from_vrf
            .iter()
            .for_each(|vrf| cfg += format!(" import vrf {vrf}"));
        cfg
    }
}
impl Render for AfIpv4Ucast {
    type Context = BgpConfig;
    type Output = ConfigBuilder;
    #[allow(clippy::option_map_unit_fn)]
    fn render(&self, bgp: &BgpConfig) -> ConfigBuilder {
        let mut cfg = ConfigBuilder::new();
        cfg += MARKER;
        cfg += "address-family ipv4 unicast";

        /* activate neighbors in AF */
        bgp.neighbors
            .iter()
            .filter(|neigh| neigh.ipv4_unicast)
            .for_each(|neigh| cfg += format!(" neighbor {} activate", neigh.ntype));

        /* redistribution */
        self.redistribute
            .iter()
            .for_each(|redist| cfg += redist.render(&()));

        /* networks */
        bgp.networks
            .iter()
            .filter(|prefix| prefix.is_ipv4())
            .for_each(|prefix| cfg += format!(" network {prefix}"));

        /* VRF imports */
        self.imports
            .as_ref()
            .map(|imports| cfg += imports.render(&()));

        cfg += "exit-address-family";
        cfg += MARKER;
        cfg
    }
}
impl Render for AfIpv6Ucast {
    type Context = BgpConfig;
    type Output = ConfigBuilder;
    #[allow(clippy::option_map_unit_fn)]
    fn render(&self, bgp: &BgpConfig) -> ConfigBuilder {
        let mut cfg = ConfigBuilder::new();
        cfg += MARKER;
        cfg += "address-family ipv6 unicast";

        /* activate neighbors in AF */
        bgp.neighbors
            .iter()
            .filter(|neigh| neigh.ipv6_unicast)
            .for_each(|neigh| cfg += format!(" neighbor {} activate", neigh.ntype));

        /* redistribution */
        self.redistribute
            .iter()
            .for_each(|redist| cfg += redist.render(&()));

        /* networks */
        bgp.networks
            .iter()
            .filter(|prefix| prefix.is_ipv6())
            .for_each(|prefix| cfg += format!(" network {prefix}"));

        /* VRF imports */
        self.imports
            .as_ref()
            .map(|imports| cfg += imports.render(&()));

        cfg += "exit-address-family";
        cfg += MARKER;
        cfg
    }
}
impl Render for AfL2vpnEvpn {
    type Context = BgpConfig;
    type Output = ConfigBuilder;
    #[allow(clippy::option_map_unit_fn)]
    fn render(&self, bgp: &BgpConfig) -> ConfigBuilder {
        let mut cfg = ConfigBuilder::new();
        cfg += MARKER;
        cfg += "address-family l2vpn evpn";

        /* activate neighbors in AF */
        bgp.neighbors
            .iter()
            .filter(|neigh| neigh.l2vpn_evpn)
            .for_each(|neigh| cfg += format!(" neighbor {} activate", neigh.ntype));

        if self.adv_all_vni {
            cfg += " advertise-all-vni";
        }
        if self.adv_default_gw {
            cfg += " advertise-default-gw";
        }
        if self.adv_svi_ip {
            cfg += " advertise-svi-ip";
        }
        if self.adv_ipv4_unicast {
            if let Some(rmap) = &self.adv_ipv4_unicast_rmap {
                cfg += format!(" advertise ipv4 unicast route-map {rmap}");
            } else {
                cfg += " advertise ipv4 unicast";
            }
        }
        if self.adv_ipv6_unicast {
            if let Some(rmap) = &self.adv_ipv6_unicast_rmap {
                cfg += format!(" advertise ipv6 unicast route-map {rmap}");
            } else {
                cfg += " advertise ipv6 unicast";
            }
        }
        if self.default_originate_ipv4 {
            cfg += " default-originate ipv4";
        }
        if self.default_originate_ipv6 {
            cfg += " default-originate ipv6";
        }
        cfg += "exit-address-family";
        cfg += MARKER;
        cfg
    }
}
impl Render for BgpNeighbor {
    type Context = ();
    type Output = ConfigBuilder;
    fn render(&self, _: &Self::Context) -> ConfigBuilder {
        let mut cfg = ConfigBuilder::new();
        let neigh_name = self.ntype.to_string();
        cfg += bgp_neigh_minimal(self, &neigh_name);
        let neigh_prefix = format!("neighbor {neigh_name}");

        cfg += bgp_neigh_capabilities(&self.capabilities, &neigh_prefix);
        cfg += bgp_neigh_options(self, &neigh_prefix);
        cfg += bgp_neigh_bool_switches(self, &neigh_prefix);
        cfg
    }
}
impl Render for BgpOptions {
    type Context = ();
    type Output = ConfigBuilder;
    #[allow(clippy::option_map_unit_fn)]
    fn render(&self, _: &Self::Context) -> ConfigBuilder {
        let mut cfg = ConfigBuilder::new();
        if !self.network_import_check {
            cfg += " no bgp network import-check";
        }
        if !self.ebgp_requires_policy {
            cfg += " no bgp ebgp-requires-policy";
        }
        if !self.bgp_default_unicast {
            cfg += " no bgp default ipv4-unicast";
        }
        if self.supress_fib_pending {
            cfg += " bgp suppress-fib-pending";
        }
        if !self.supress_duplicates {
            cfg += " no bgp suppress-duplicates";
        }
        self.minimum_holdtime
            .as_ref()
            .map(|time| cfg += format!(" bgp minimum-holdtime {time}"));

        self.listen_range
            .as_ref()
            .map(|(prefix, group)| cfg += format!(" bgp listen range {prefix} peer-group {group}"));

        self.listen_limit
            .as_ref()
            .map(|limit| cfg += format!(" bgp listen limit {limit}"));

        cfg
    }
}
impl Render for BgpConfig {
    type Context = ();
    type Output = ConfigBuilder;
    #[allow(clippy::option_map_unit_fn)]
    fn render(&self, _: &Self::Context) -> ConfigBuilder {
        let mut config = ConfigBuilder::new();

        /* main heading */
        let mut heading = format!("router bgp {}", self.asn);
        if let Some(vrf) = &self.vrf {
            heading += format!(" vrf {vrf}").as_str();
        }
        config += heading;

        /* router id */
        if let Some(router_id) = &self.router_id {
            config += format!(" bgp router-id {router_id}");
        }

        /* BGP options: todo */
        config += self.options.render(&());

        /* BGP neighbors */
        self.neighbors.iter().for_each(|n| config += n.render(&()));

        /* Address family ipv4 unicast */
        self.af_ipv4unicast
            .as_ref()
            .map(|evpn| config += evpn.render(self));

        /* Address family ipv4 unicast */
        self.af_ipv6unicast
            .as_ref()
            .map(|evpn| config += evpn.render(self));

        /* Address family l2vpn evpn */
        self.af_l2vpnevpn
            .as_ref()
            .map(|evpn| config += evpn.render(self));

        config += "exit";
        config += MARKER;
        config
    }
}
