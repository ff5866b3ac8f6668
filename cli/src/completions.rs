// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Adds command completions

use crate::cmdtree::Node;
use rustyline::completion::Completer;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Helper;
use std::collections::VecDeque;
use std::rc::Rc;

/// A `rustyline` [`Helper`] that completes against a [`Node`] command tree.
#[derive(Default)]
pub struct CmdCompleter {
    cmdtree: Rc<Node>,
}

impl CmdCompleter {
    /// Complete against `cmdtree`.
    #[must_use]
    pub fn new(cmdtree: Rc<Node>) -> Self {
        Self { cmdtree }
    }
}

impl Hinter for CmdCompleter {
    type Hint = String;
}
impl Highlighter for CmdCompleter {}
impl Validator for CmdCompleter {}
impl Helper for CmdCompleter {}

impl Completer for CmdCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let mut matched: VecDeque<&str> = VecDeque::new();
        let mut left: VecDeque<&str> = line.split_whitespace().collect();
        let node = self.cmdtree.lookup(&mut left, &mut matched);
        let mut candidates: Vec<String> =
            node.children.values().map(|cmd| cmd.name.clone()).collect();

        if !node.children.is_empty() {
            if let Some(word) = left.front() {
                candidates.retain(|child| child.to_lowercase().starts_with(word));
            }
        } else {
            for arg in &node.args {
                if !line.contains(&arg.name) {
                    candidates.push(arg.name.clone() + "=");
                }
            }

            if let Some(word) = left.front() {
                if let Some((arg_side, _value_side)) = word.split_once('=') {
                    if let Some(arg) = node.find_arg(arg_side) {
                        if !arg.choices.is_empty() {
                            candidates = arg.choices.clone();
                        }
                    }
                }
            }
        }

        let mut newpos = 0;
        if !matched.is_empty() {
            let Some(last) = matched.pop_back() else {
                return Ok((newpos, candidates));
            };
            if let Some(found) = line.find(last) {
                newpos = found + last.len() + 1;
            }
            if newpos > pos {
                newpos = pos;
            }
        }
        Ok((newpos, candidates))
    }
}
