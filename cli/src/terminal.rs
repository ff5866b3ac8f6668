// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! User terminal frontend: a `rustyline` editor driving the command tree
//! and dispatcher against an in-process [`datapath::DatapathRoot`]. Unlike
//! a wire-protocol CLI talking to a separate dataplane process, this
//! terminal holds its root directly — there is no connect/disconnect step.

use std::rc::Rc;
use std::sync::Arc;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use datapath::DatapathRoot;
use driver::{Driver, DriverError};

use crate::cmdtree::Node;
use crate::cmdtree_dp::dp_cmd_tree;
use crate::completions::CmdCompleter;
use crate::dispatch::{self, CliAction, CommandArgs};

/// Constructs the `D` driver instance a `port add` command registers,
/// given the name the operator typed.
pub type PortFactory<D> = dyn Fn(&str) -> Result<D, DriverError> + Send + Sync;

/// An interactive management session against one [`DatapathRoot`].
pub struct Terminal<D: Driver + Send + 'static> {
    editor: Editor<CmdCompleter, DefaultHistory>,
    cmdtree: Rc<Node>,
    run: bool,
    root: Arc<DatapathRoot<D>>,
    port_factory: Arc<PortFactory<D>>,
}

impl<D: Driver + Send + 'static> Terminal<D> {
    /// Build a terminal against `root`, constructing ports a `port add`
    /// command registers via `port_factory`.
    ///
    /// # Errors
    ///
    /// Returns a `rustyline` error if the line editor cannot be built.
    pub fn new(
        root: Arc<DatapathRoot<D>>,
        port_factory: Arc<PortFactory<D>>,
    ) -> rustyline::Result<Self> {
        let config = Config::builder()
            .auto_add_history(false)
            .history_ignore_dups(true)
            .max_history_size(400)
            .build();
        let cmdtree = Rc::new(dp_cmd_tree());
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(CmdCompleter::new(Rc::clone(&cmdtree))));
        Ok(Self {
            editor,
            cmdtree,
            run: true,
            root,
            port_factory,
        })
    }

    /// Whether the REPL loop should keep iterating.
    #[must_use]
    pub fn runs(&self) -> bool {
        self.run
    }

    /// Stop the REPL loop after the current command.
    pub fn stop(&mut self) {
        self.run = false;
    }

    /// The command tree this terminal completes and dispatches against.
    #[must_use]
    pub fn cmd_tree(&self) -> &Node {
        &self.cmdtree
    }

    /// Clear the terminal screen.
    pub fn clear(&self) {
        print!("\x1b[H\x1b[2J");
    }

    /// Read one line, dispatch it, and print its result. Returns `false`
    /// once the operator has asked to quit or sent EOF.
    pub fn step(&mut self) -> bool {
        let line = match self.editor.readline("vswitch-dp> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => return self.run,
            Err(ReadlineError::Eof) => {
                self.run = false;
                return false;
            }
            Err(e) => {
                eprintln!("{}", format!("readline error: {e}").red());
                self.run = false;
                return false;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return self.run;
        }
        let _ = self.editor.add_history_entry(trimmed);
        self.dispatch_line(trimmed);
        self.run
    }

    fn dispatch_line(&mut self, line: &str) {
        let mut tokens: std::collections::VecDeque<String> =
            line.split_whitespace().map(ToString::to_string).collect();
        let Some(node) = Rc::clone(&self.cmdtree).find_best(&mut tokens) else {
            return;
        };
        let Some(code) = node.action else {
            if node.depth > 0 {
                eprintln!("{}", "no action associated with this command".red());
                node.show_children();
            } else {
                eprintln!("{}", "syntax error".red());
            }
            return;
        };
        let Some(action) = CliAction::from_u16(code) else {
            eprintln!("{}", "internal error: unknown action code".red());
            return;
        };

        match action {
            CliAction::Clear => self.clear(),
            CliAction::Quit => self.stop(),
            CliAction::Help => self.cmdtree.dump(),
            _ => self.dispatch_remote(action, line),
        }
    }

    fn dispatch_remote(&mut self, action: CliAction, line: &str) {
        let map = dispatch::parse_args_map(line);
        let args = match CommandArgs::from_args_map(map) {
            Ok(args) => args,
            Err(e) => {
                eprintln!("{}", format!("{e}").red());
                return;
            }
        };
        match dispatch::execute_remote(action, &args, &self.root, self.port_factory.as_ref()) {
            Ok(output) => print!("{output}"),
            Err(e) => eprintln!("{}", format!("{e}").red()),
        }
    }
}
