// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Resolves a [`crate::cmdtree::Node`] action code plus its `name=value`
//! arguments into a call against a live [`datapath::DatapathRoot`].

use std::collections::HashMap;
use std::sync::Arc;

use actions::{Action, PortId};
use datapath::{DatapathError, DatapathRoot, FlowDescriptor};
use dpcls::{key::word, FlowKey, Mask};
use driver::{Driver, DriverError};
use flowtable::{DumpCursor, Ufid};

/// Flows fetched per `dump_flows` round-trip when paging through a full
/// table for `show flow dump`.
const DUMP_BATCH_SIZE: usize = 256;

/// One command the CLI can dispatch. Stored as a `u16` action code on
/// [`crate::cmdtree::Node`]; converted back with [`CliAction::from_u16`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
pub enum CliAction {
    /// Clear the terminal screen.
    Clear,
    /// Print the command tree.
    Help,
    /// Exit the CLI loop.
    Quit,
    /// `show port`: dump the port registry.
    ShowPorts,
    /// `show flow dump`: dump a worker's flow table.
    ShowFlows,
    /// `show flow get`: look up one flow by ufid.
    ShowFlow,
    /// `show stats`: a worker's packet counters.
    ShowStats,
    /// `port add`: register a reference port.
    PortAdd,
    /// `port del`: remove a registered port.
    PortDel,
    /// `flow add`: install a single-action flow.
    FlowAdd,
    /// `flow del`: remove a flow by ufid.
    FlowDel,
    /// `stats zero`: zero a worker's baseline.
    StatsZero,
    /// `core-mask`: reconfigure the worker core mask.
    CoreMaskSet,
}

impl CliAction {
    /// The `u16` code stored on the command tree's nodes.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        Some(match code {
            0 => Self::Clear,
            1 => Self::Help,
            2 => Self::Quit,
            3 => Self::ShowPorts,
            4 => Self::ShowFlows,
            5 => Self::ShowFlow,
            6 => Self::ShowStats,
            7 => Self::PortAdd,
            8 => Self::PortDel,
            9 => Self::FlowAdd,
            10 => Self::FlowDel,
            11 => Self::StatsZero,
            12 => Self::CoreMaskSet,
            _ => return None,
        })
    }
}

// `Node::action` takes the `as u16` of this enum at tree-construction time;
// the discriminants below must stay in sync with `from_u16` above.
impl From<CliAction> for u16 {
    fn from(action: CliAction) -> u16 {
        action as u16
    }
}

/// Parsed `name=value` arguments from one input line.
#[derive(Debug, Default, Clone)]
pub struct CommandArgs {
    /// `name=`: a port name.
    pub name: Option<String>,
    /// `worker=`: a worker id.
    pub worker: Option<u32>,
    /// `in-port=`: an ingress port id.
    pub in_port: Option<u32>,
    /// `out-port=`: an egress port id.
    pub out_port: Option<u32>,
    /// `ufid=`: a flow's 128-bit id, as a hyphenated UUID string.
    pub ufid: Option<String>,
    /// `mask=`: a `"0x..."` hex core mask.
    pub mask: Option<String>,
}

/// Errors parsing a command line's `name=value` arguments.
#[derive(Debug, thiserror::Error)]
pub enum ArgsError {
    /// A `name=value` token's value did not parse as the expected type.
    #[error("bad value for {arg}: {value:?}")]
    BadValue {
        /// The argument name.
        arg: &'static str,
        /// The value that failed to parse.
        value: String,
    },
    /// The line contained `name=value` tokens this command does not use.
    #[error("unrecognized arguments: {0:?}")]
    Unrecognized(Vec<String>),
}

impl CommandArgs {
    /// Parse `name=value` tokens collected from one input line.
    ///
    /// # Errors
    ///
    /// Returns [`ArgsError`] if a known argument's value fails to parse, or
    /// if unrecognized `name=value` tokens remain.
    pub fn from_args_map(mut args_map: HashMap<String, String>) -> Result<Self, ArgsError> {
        let mut args = CommandArgs::default();
        if let Some(name) = args_map.remove("name") {
            args.name = Some(name);
        }
        if let Some(ufid) = args_map.remove("ufid") {
            args.ufid = Some(ufid);
        }
        if let Some(mask) = args_map.remove("mask") {
            args.mask = Some(mask);
        }
        if let Some(raw) = args_map.remove("worker") {
            args.worker = Some(raw.parse().map_err(|_| ArgsError::BadValue {
                arg: "worker",
                value: raw,
            })?);
        }
        if let Some(raw) = args_map.remove("in-port") {
            args.in_port = Some(raw.parse().map_err(|_| ArgsError::BadValue {
                arg: "in-port",
                value: raw,
            })?);
        }
        if let Some(raw) = args_map.remove("out-port") {
            args.out_port = Some(raw.parse().map_err(|_| ArgsError::BadValue {
                arg: "out-port",
                value: raw,
            })?);
        }
        if args_map.is_empty() {
            Ok(args)
        } else {
            Err(ArgsError::Unrecognized(args_map.into_keys().collect()))
        }
    }
}

/// Build a map of `name=value` tokens out of one input line.
#[must_use]
pub fn parse_args_map(line: &str) -> HashMap<String, String> {
    line.split_whitespace()
        .filter_map(|token| token.split_once('='))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

/// Errors reported back to the REPL after dispatching one command.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A required `name=value` argument was missing.
    #[error("missing argument: {0}")]
    MissingArg(&'static str),
    /// The underlying datapath call failed.
    #[error(transparent)]
    Datapath(#[from] DatapathError),
    /// The ufid argument was not a well-formed UUID.
    #[error("bad ufid: {0:?}")]
    BadUfid(String),
    /// The requested port driver could not be constructed.
    #[error("failed to construct port driver: {0}")]
    Driver(#[from] DriverError),
    /// `mask=` was not a valid `"0x..."` hex string.
    #[error("invalid core mask: {0:?}")]
    InvalidMask(String),
}

fn ufid_of(args: &CommandArgs) -> Result<Ufid, DispatchError> {
    let raw = args.ufid.as_ref().ok_or(DispatchError::MissingArg("ufid"))?;
    uuid::Uuid::parse_str(raw)
        .map(Ufid)
        .map_err(|_| DispatchError::BadUfid(raw.clone()))
}

fn worker_of(args: &CommandArgs) -> Result<u32, DispatchError> {
    args.worker.ok_or(DispatchError::MissingArg("worker"))
}

/// Execute a remote (in-process `DatapathRoot`) action and format its
/// result as a human-readable string, in the style a REPL prints directly.
///
/// # Errors
///
/// Returns [`DispatchError`] if a required argument is missing, a ufid
/// fails to parse, the port factory fails, or the datapath call itself
/// fails.
pub fn execute_remote<D: Driver + Send + 'static>(
    action: CliAction,
    args: &CommandArgs,
    root: &DatapathRoot<D>,
    port_factory: &dyn Fn(&str) -> Result<D, DriverError>,
) -> Result<String, DispatchError> {
    match action {
        CliAction::ShowPorts => {
            let ports = root.show_queue_assignments();
            let mut out = String::new();
            for p in ports {
                out.push_str(&format!(
                    "{} id={} numa={:?} local={} queues={:?}\n",
                    p.name, p.port_id, p.numa, p.is_local, p.queue_assignment
                ));
            }
            Ok(out)
        }
        CliAction::ShowStats => {
            let worker = worker_of(args)?;
            let stats = root.read_stats(worker)?;
            Ok(format!(
                "exact_hit={} masked_hit={} miss={} lost={} dropped={}",
                stats.exact_hit, stats.masked_hit, stats.miss, stats.lost, stats.dropped
            ))
        }
        CliAction::StatsZero => {
            let worker = worker_of(args)?;
            root.zero_stats(worker)?;
            Ok(format!("worker {worker}: counters zeroed"))
        }
        CliAction::ShowFlows => {
            let worker = worker_of(args)?;
            let mut cursor = DumpCursor::default();
            let mut out = String::new();
            loop {
                let (batch, next) = root.dump_flows(worker, cursor, DUMP_BATCH_SIZE)?;
                for flow in batch {
                    out.push_str(&format!(
                        "{} actions={:?} packets={} bytes={}\n",
                        flow.ufid.0, flow.actions, flow.packets, flow.bytes
                    ));
                }
                match next {
                    Some(c) => cursor = c,
                    None => break,
                }
            }
            Ok(out)
        }
        CliAction::ShowFlow => {
            let worker = worker_of(args)?;
            let ufid = ufid_of(args)?;
            let flow = root.get_flow(worker, ufid)?;
            Ok(format!(
                "{} actions={:?} packets={} bytes={} last_used_ms={}",
                flow.ufid.0, flow.actions, flow.packets, flow.bytes, flow.last_used_ms
            ))
        }
        CliAction::PortAdd => {
            let name = args.name.clone().ok_or(DispatchError::MissingArg("name"))?;
            let driver = port_factory(&name)?;
            let handle = root.add_port(datapath::PortConfig { name: name.clone() }, driver)?;
            Ok(format!("port {name} added as {handle:?}"))
        }
        CliAction::PortDel => {
            let name = args.name.clone().ok_or(DispatchError::MissingArg("name"))?;
            let handle = root
                .port_handle_by_name(&name)
                .ok_or_else(|| DispatchError::Datapath(DatapathError::PortNotFound(name.clone())))?;
            root.del_port(handle)?;
            Ok(format!("port {name} removed"))
        }
        CliAction::FlowAdd => {
            let worker = worker_of(args)?;
            let in_port = args.in_port.ok_or(DispatchError::MissingArg("in-port"))?;
            let out_port = args.out_port.ok_or(DispatchError::MissingArg("out-port"))?;

            let mut key = FlowKey::new();
            key.set_word(word::IN_PORT, u64::from(in_port));
            let mut mask = Mask::new();
            mask.set_word(word::IN_PORT, u64::MAX);

            let descriptor = FlowDescriptor {
                worker_id: worker,
                unmasked_key: key,
                mask: Arc::new(mask),
                actions: vec![Action::Output(PortId(out_port))],
            };
            let ufid = root.add_flow(descriptor)?;
            Ok(format!("flow {} installed on worker {worker}", ufid.0))
        }
        CliAction::FlowDel => {
            let worker = worker_of(args)?;
            let ufid = ufid_of(args)?;
            root.delete_flow(worker, ufid)?;
            Ok(format!("flow {} removed from worker {worker}", ufid.0))
        }
        CliAction::CoreMaskSet => {
            let raw = args.mask.as_ref().ok_or(DispatchError::MissingArg("mask"))?;
            let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")).unwrap_or(raw);
            let mask = u64::from_str_radix(digits, 16)
                .map_err(|_| DispatchError::InvalidMask(raw.clone()))?;
            root.set_core_mask(Some(mask))?;
            Ok(format!("core mask set to {raw}"))
        }
        CliAction::Clear | CliAction::Help | CliAction::Quit => {
            unreachable!("local actions are handled by Terminal, never reach execute_remote")
        }
    }
}
