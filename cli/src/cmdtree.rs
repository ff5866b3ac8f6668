// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Defines a command tree of Nodes

use colored::Colorize;
use std::collections::BTreeMap;
use std::collections::VecDeque;

/// A named, optionally-choice-constrained argument a [`Node`] accepts.
#[derive(Clone, Default, Debug)]
pub struct NodeArg {
    /// The argument's name, as typed `name=value` on the command line.
    pub name: String,
    /// Allowed values, or empty for a free-form argument.
    pub choices: Vec<String>,
}

impl NodeArg {
    /// Start a new argument named `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            choices: Vec::new(),
        }
    }

    /// Restrict this argument to one more allowed value.
    #[must_use]
    pub fn choice(mut self, choice: &str) -> Self {
        self.choices.push(choice.to_owned());
        self
    }
}

/// One node in the command tree: a name, an optional action code, and its
/// children. A node with `action: None` and children is a prefix (`show`,
/// `port`); a node with `Some(action)` is a leaf command.
#[derive(Default)]
pub struct Node {
    pub(crate) name: String,
    /// Depth from the tree root, filled in by [`Node::add`].
    pub depth: u16,
    /// Child commands, keyed by name.
    pub children: BTreeMap<String, Node>,
    pub(crate) description: Option<&'static str>,
    /// The dispatch code this node resolves to, if it is a leaf.
    pub action: Option<u16>,
    pub(crate) args: Vec<NodeArg>,
    pub(crate) hidden: bool,
}

impl Node {
    /// Start a new node named `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            hidden: false,
            ..Default::default()
        }
    }

    /// Mark this node as a leaf resolving to `action`.
    #[must_use]
    pub fn action(mut self, action: u16) -> Self {
        self.action = Some(action);
        self
    }

    /// Accept a free-form `name=value` argument.
    #[must_use]
    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(NodeArg::new(arg));
        self
    }

    /// Accept a choice-constrained argument.
    #[must_use]
    pub fn arg_add(mut self, arg: NodeArg) -> Self {
        self.args.push(arg);
        self
    }

    /// Look up one of this node's declared arguments by name.
    #[must_use]
    pub fn find_arg(&self, name: &str) -> Option<&NodeArg> {
        self.args.iter().find(|&arg| arg.name == name)
    }

    /// Hide this node from `show_children`/`dump` (still reachable by name).
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Attach a one-line description shown by `dump`.
    #[must_use]
    pub fn desc(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    fn set_depth(&mut self, depth: u16) {
        self.depth = depth;
        self.children
            .values_mut()
            .for_each(|c| c.set_depth(depth + 1));
    }

    fn add(&mut self, mut cmd: Node) {
        if cmd.name.is_empty() {
            // An unnamed node is just a grouping convenience: adopt its
            // children directly so it never shows up itself.
            cmd.set_depth(self.depth);
            for child in cmd.children.into_values() {
                self.children.insert(child.name.clone(), child);
            }
        } else {
            cmd.set_depth(self.depth + 1);
            self.children.insert(cmd.name.clone(), cmd);
        }
    }

    /// Walk `tokens` against the tree, recording matched words in `matched`.
    /// Returns the last node reached; leftover tokens mean no full match.
    /// Used for completion.
    pub(crate) fn lookup<'a>(
        &self,
        tokens: &mut VecDeque<&'a str>,
        matched: &mut VecDeque<&'a str>,
    ) -> &Self {
        if let Some(word) = tokens.pop_front() {
            match self.children.get(word) {
                Some(child) => {
                    matched.push_back(word);
                    child.lookup(tokens, matched)
                }
                None => {
                    tokens.push_front(word);
                    self
                }
            }
        } else {
            self
        }
    }

    /// Walk `tokens` to the deepest node a full prefix match reaches.
    pub fn find_best(&self, tokens: &mut VecDeque<String>) -> Option<&Self> {
        if let Some(word) = tokens.pop_front() {
            match self.children.get(word.as_str()) {
                Some(child) => child.find_best(tokens),
                None => Some(self),
            }
        } else {
            Some(self)
        }
    }

    /// Print this node's visible children, one per line.
    pub fn show_children(&self) {
        self.children
            .values()
            .filter(|child| !child.hidden)
            .for_each(|child| println!(" {}", child.name.yellow()));
    }

    /// Print the whole subtree rooted here, indented by depth.
    pub fn dump(&self) {
        if self.depth == 0 {
            println!("\n {}", " --- Commands --- ".bold());
        }
        let indent = "    ".repeat(self.depth as usize);
        if !self.hidden {
            if self.depth == 1 {
                print!("{} {}", indent, self.name.bold().white());
            } else {
                print!("{} {}", indent, self.name);
            }
            self.args.iter().for_each(|arg| {
                print!(" @{}", arg.name);
                if !arg.choices.is_empty() {
                    print!("{}", "=[".yellow());
                    arg.choices
                        .iter()
                        .for_each(|choice| print!(" {}", choice.yellow()));
                    print!("{}", " ]".yellow());
                }
            });

            if let Some(descr) = self.description {
                print!(" {}", descr.italic().dimmed());
            }
            println!();
        }
        for c in self.children.values() {
            c.dump();
        }

        if self.depth == 0 || (self.depth == 1 && !self.children.is_empty()) {
            println!();
        }
    }
}

use std::ops::AddAssign;
impl AddAssign for Node {
    fn add_assign(&mut self, rhs: Self) {
        self.add(rhs);
    }
}
