// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![deny(rustdoc::all)]
#![allow(rustdoc::missing_crate_level_docs)]

//! Process entry point: parses arguments, loads configuration, builds a
//! [`datapath::DatapathRoot`] over the detected NUMA topology, registers
//! any startup ports, starts the Prometheus exporter, and either drops
//! into the interactive management CLI or blocks until `SIGINT`.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use args::{CmdArgs, Parser};
use cli::Terminal;
use config::{ConfigError, DatapathConfig};
use datapath::{DatapathError, DatapathRoot, EngineLimits, PortConfig};
use driver::reference::ReferenceDriver;
use driver::DriverError;
use hardware::{NumaNodeId, Topology, TopologyError};
use stats::ExporterError;

/// Everything that can keep `vswitch-dp` from starting up.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    /// The config file could not be loaded or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The NUMA topology could not be detected.
    #[error(transparent)]
    Topology(#[from] TopologyError),
    /// The `SIGINT` handler could not be installed.
    #[error("failed to install SIGINT handler: {0}")]
    SignalHandler(ctrlc::Error),
    /// A startup port could not be registered.
    #[error(transparent)]
    Datapath(#[from] DatapathError),
    /// A startup port's driver could not be constructed.
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// The Prometheus exporter could not be started.
    #[error(transparent)]
    Exporter(#[from] ExporterError),
    /// The interactive CLI's line editor could not be built.
    #[error(transparent)]
    Terminal(#[from] rustyline::error::ReadlineError),
}

fn init_logging(filter: Option<&str>) {
    let filter = EnvFilter::new(filter.unwrap_or("info"));
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_env_filter(filter)
        .init();
}

/// Build the [`DatapathConfig`], layering a `--core-mask` override on top
/// of whatever the config file (or its absence) produced.
fn load_config(args: &CmdArgs) -> Result<DatapathConfig, StartupError> {
    let mut config = match args.config_path() {
        Some(path) => DatapathConfig::load(path)?,
        None => DatapathConfig::default(),
    };
    if let Some(mask) = args.core_mask_override() {
        config.requested_core_mask = Some(mask.to_owned());
    }
    Ok(config)
}

/// Translate a loaded [`DatapathConfig`] into the plain-scalar limits the
/// datapath root sizes its workers from. Kept at this process boundary so
/// `vswitch-dp-datapath` never needs to depend on `vswitch-dp-config`.
fn engine_limits(config: &DatapathConfig) -> EngineLimits {
    EngineLimits {
        emc_shift: u32::from(config.emc_shift),
        emc_segs: u32::from(config.emc_segs),
        max_recirc_depth: config.max_recirc_depth,
        flow_table_capacity: config.flow_table_capacity,
        classifier_batch_size: config.classifier_batch_size,
    }
}

/// Construct an in-memory reference driver for a `--port` startup port,
/// placed on the topology's first NUMA node with a single RX/TX queue.
fn reference_port_factory(numa: NumaNodeId) -> impl Fn(&str) -> Result<ReferenceDriver, DriverError> {
    move |_name: &str| Ok(ReferenceDriver::new(numa, 1))
}

fn try_main() -> Result<(), StartupError> {
    let args = CmdArgs::parse();
    init_logging(args.tracing_filter());
    info!("starting vswitch-dp");

    let config = load_config(&args)?;
    let topology = Topology::detect()?;
    let first_numa = topology.nodes().next().unwrap_or(NumaNodeId(0));

    let root = Arc::new(DatapathRoot::new(topology, args.per_node_workers(), engine_limits(&config)));
    root.set_core_mask(config.core_mask()?)?;
    root.run()?;

    let port_factory = Arc::new(reference_port_factory(first_numa));
    for name in args.ports() {
        let driver = port_factory(name)?;
        root.add_port(PortConfig { name: name.clone() }, driver)?;
        info!(port = %name, "registered startup port");
    }

    let metrics_addr: SocketAddr = args.metrics_address();
    stats::install_exporter(metrics_addr)?;
    info!(address = %metrics_addr, "prometheus exporter listening");

    let (stop_tx, stop_rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(StartupError::SignalHandler)?;

    if args.interactive() {
        let mut terminal = Terminal::new(Arc::clone(&root), port_factory)?;
        while terminal.runs() {
            terminal.step();
        }
    } else {
        let _ = stop_rx.recv();
    }

    info!("shutting down vswitch-dp");
    root.close();
    Ok(())
}

fn main() {
    if let Err(error) = try_main() {
        error!(%error, "vswitch-dp failed to start");
        std::process::exit(1);
    }
}
