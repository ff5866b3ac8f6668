// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Builds the command tree for the datapath management CLI.

use crate::cmdtree::Node;
use crate::dispatch::CliAction;

fn cmd_show_port() -> Node {
    Node::new("port")
        .desc("Show registered ports and their RX-queue-to-worker assignment")
        .action(CliAction::ShowPorts as u16)
}

fn cmd_show_flow() -> Node {
    let mut root = Node::new("flow").desc("Show installed flows on a worker");
    root += Node::new("dump")
        .desc("Dump all flows on a worker")
        .action(CliAction::ShowFlows as u16)
        .arg("worker");
    root += Node::new("get")
        .desc("Show one flow by ufid")
        .action(CliAction::ShowFlow as u16)
        .arg("worker")
        .arg("ufid");
    root
}

fn cmd_show_stats() -> Node {
    Node::new("stats")
        .desc("Show a worker's packet counters")
        .action(CliAction::ShowStats as u16)
        .arg("worker")
}

fn cmd_show() -> Node {
    let mut root = Node::new("show");
    root += cmd_show_port();
    root += cmd_show_flow();
    root += cmd_show_stats();
    root
}

fn cmd_port() -> Node {
    let mut root = Node::new("port");
    root += Node::new("add")
        .desc("Register a reference port by name")
        .action(CliAction::PortAdd as u16)
        .arg("name");
    root += Node::new("del")
        .desc("Remove a registered port by name")
        .action(CliAction::PortDel as u16)
        .arg("name");
    root
}

fn cmd_flow() -> Node {
    let mut root = Node::new("flow");
    root += Node::new("add")
        .desc("Install a flow matching an ingress port, outputting to an egress port")
        .action(CliAction::FlowAdd as u16)
        .arg("worker")
        .arg("in-port")
        .arg("out-port");
    root += Node::new("del")
        .desc("Remove a flow by ufid")
        .action(CliAction::FlowDel as u16)
        .arg("worker")
        .arg("ufid");
    root
}

fn cmd_core_mask() -> Node {
    Node::new("core-mask")
        .desc("Reconfigure which cores may host a worker")
        .action(CliAction::CoreMaskSet as u16)
        .arg("mask")
}

fn cmd_stats() -> Node {
    let mut root = Node::new("stats");
    root += Node::new("zero")
        .desc("Zero a worker's packet counters")
        .action(CliAction::StatsZero as u16)
        .arg("worker");
    root
}

fn cmd_local() -> Node {
    let mut root = Node::new("");
    root += Node::new("clear")
        .desc("Clear the screen")
        .action(CliAction::Clear as u16);
    root += Node::new("help")
        .desc("Show this help")
        .action(CliAction::Help as u16);
    root += Node::new("exit")
        .desc("Exit this program")
        .action(CliAction::Quit as u16);
    root += Node::new("quit")
        .desc("Exit this program")
        .action(CliAction::Quit as u16);
    root += Node::new("q").action(CliAction::Quit as u16).hidden();
    root += Node::new("?").action(CliAction::Help as u16).hidden();
    root
}

/// Build the full command tree for the datapath management CLI.
#[must_use]
pub fn dp_cmd_tree() -> Node {
    let mut root = Node::new("");
    root += cmd_local();
    root += cmd_show();
    root += cmd_port();
    root += cmd_flow();
    root += cmd_stats();
    root += cmd_core_mask();
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_has_top_level_show_port_and_flow() {
        let tree = dp_cmd_tree();
        assert!(tree.children.contains_key("show"));
        assert!(tree.children.contains_key("port"));
        assert!(tree.children.contains_key("flow"));
        assert!(tree.children.contains_key("core-mask"));
    }

    #[test]
    fn flow_add_declares_its_three_arguments() {
        let tree = dp_cmd_tree();
        let flow = &tree.children["flow"];
        let add = &flow.children["add"];
        assert!(add.find_arg("worker").is_some());
        assert!(add.find_arg("in-port").is_some());
        assert!(add.find_arg("out-port").is_some());
    }
}
