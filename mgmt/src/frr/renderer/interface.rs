// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config renderer: interfaces

use std::fmt::Display;
use std::net::IpAddr;

use crate::frr::renderer::builder::{ConfigBuilder, MARKER, Render};

use crate::models::internal::interfaces::interface::InterfaceAddress;
use crate::models::internal::interfaces::interface::InterfaceConfig;
use crate::models::internal::interfaces::interface::InterfaceConfigTable;

fn ip_address_type_str(address: &IpAddr) -> &'static str {
    match address {
        IpAddr::V4(_) => "ip",
        IpAddr::V6(_) => "ipv6",
    }
}

#[repr(transparent)]
pub struct RenderInterfaceAddress<'a>(pub &'a InterfaceAddress);

impl<'a> Display for RenderInterfaceAddress<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            " {} address {}/{}",
            ip_address_type_str(&self.0.address),
            &self.0.address,
            self.0.mask_len
        )
    }
}
impl Render for InterfaceConfig {
    type Context = ();
    type Output = ConfigBuilder;
    fn render(&self, _ctx: &Self::Context) -> ConfigBuilder {
        let mut config = ConfigBuilder::new();
        config += MARKER;
        config += format!("interface {}", self.name);
        if let Some(description) = &self.description {
            config += format!(" description {description}");
        }
        self.addresses
            .iter()
            .for_each(|a| config += RenderInterfaceAddress(a).to_string());
        if let Some(ospf) = &self.ospf {
            config += ospf.render(&());
        }
        config += "exit";
        config += MARKER;
        config
    }
}
impl Render for InterfaceConfigTable {
    type Context = ();
    type Output = ConfigBuilder;
    fn render(&self, _ctx: &Self::Context) -> Self::Output {
        let mut config = ConfigBuilder::new();
        // we only render config if interfaces are not marked internal
        self.values()
            .filter(|iface| !iface.internal)
            .for_each(|iface| config += iface.render(&()));
        config
    }
}
