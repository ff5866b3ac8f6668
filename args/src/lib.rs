// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! Command-line argument parsing for the `vswitch-dp` process.

pub use clap::Parser;

use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line arguments for the datapath process.
#[derive(Parser, Debug)]
#[command(name = "vswitch-dp")]
#[command(version)]
#[command(about = "A userspace virtual-switch datapath", long_about = None)]
pub struct CmdArgs {
    /// Path to a YAML [`config::DatapathConfig`] file. Missing fields fall
    /// back to spec defaults; a missing file falls back to an
    /// all-defaults config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the config file's `requested_core_mask` (a `"0x..."` hex
    /// string selecting which cores may host a worker).
    #[arg(long, value_name = "0xHEX")]
    core_mask: Option<String>,

    /// Number of workers to place per NUMA node, absent an explicit core
    /// mask.
    #[arg(long, value_name = "N", default_value_t = 4)]
    per_node_workers: usize,

    /// Register a reference (in-memory) port at startup, by name. May be
    /// repeated.
    #[arg(long = "port", value_name = "NAME")]
    ports: Vec<String>,

    /// Bind address for the Prometheus metrics HTTP endpoint.
    #[arg(long, value_name = "ADDRESS", default_value_t = SocketAddr::from(([127, 0, 0, 1], 9090)))]
    metrics_address: SocketAddr,

    /// Launch the interactive management CLI instead of exiting after
    /// startup.
    #[arg(long, default_value_t = false)]
    interactive: bool,

    /// Tracing filter string, e.g. `"info,vswitch_dp_worker=debug"`
    /// (passed straight to `tracing_subscriber::EnvFilter`).
    #[arg(long, value_name = "FILTER")]
    tracing: Option<String>,
}

impl CmdArgs {
    /// Path to the YAML config file, if one was given.
    #[must_use]
    pub fn config_path(&self) -> Option<&std::path::Path> {
        self.config.as_deref()
    }

    /// The `--core-mask` override, if given (takes precedence over the
    /// config file's `requested_core_mask`).
    #[must_use]
    pub fn core_mask_override(&self) -> Option<&str> {
        self.core_mask.as_deref()
    }

    /// Workers to place per NUMA node absent an explicit core mask.
    #[must_use]
    pub fn per_node_workers(&self) -> usize {
        self.per_node_workers
    }

    /// Names of reference ports to register at startup.
    #[must_use]
    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    /// The Prometheus metrics bind address.
    #[must_use]
    pub fn metrics_address(&self) -> SocketAddr {
        self.metrics_address
    }

    /// Whether to launch the interactive CLI after startup.
    #[must_use]
    pub fn interactive(&self) -> bool {
        self.interactive
    }

    /// The `tracing_subscriber::EnvFilter` string, if one was given.
    #[must_use]
    pub fn tracing_filter(&self) -> Option<&str> {
        self.tracing.as_deref()
    }
}
