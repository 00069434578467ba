//! # Command Tree
//!
//! The command tree describes every subcommand and option of the wrapped tool.
//! It is built once at startup from the generated data, adjusted by the
//! registration calls in [`crate::bootstrap`], and read-only afterwards.
//!
//! Nodes live in an arena and are addressed by [`CommandId`]. The path index
//! maps space-joined command paths to ids; an alias is simply a second path
//! bound to the same id, so everything registered on the target is visible
//! through the alias as well.
//!
//! Each node records its ancestor chain (itself first, the root last) when
//! the tree is built. Option lookups that fail on a subcommand walk this chain
//! to find options declared on enclosing commands.

pub mod generated;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{self, Write as _};
use std::sync::Arc;

use crate::error::{InitError, InitViolation};
use crate::handlers::{PositionalHandler, ValueHandler};

pub use generated::{GeneratedCommand, GeneratedTree};

/// Stable identifier of a node in the command tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

/// How the value of one option is treated.
#[derive(Clone)]
pub enum ArgHandler {
    /// The option takes no value.
    Flag,
    /// The option takes a value which is copied unchanged.
    PassThrough,
    /// The option takes a value rewritten by the handler.
    Convert(Arc<dyn ValueHandler>),
}

impl ArgHandler {
    pub fn takes_value(&self) -> bool {
        !matches!(self, ArgHandler::Flag)
    }

    pub fn name(&self) -> &str {
        match self {
            ArgHandler::Flag => "~",
            ArgHandler::PassThrough => "ignored",
            ArgHandler::Convert(handler) => handler.name(),
        }
    }
}

impl fmt::Debug for ArgHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgHandler::Flag => f.write_str("Flag"),
            ArgHandler::PassThrough => f.write_str("PassThrough"),
            ArgHandler::Convert(handler) => write!(f, "Convert({})", handler.name()),
        }
    }
}

/// How positional arguments of a command are processed.
#[derive(Clone, Default)]
pub enum Dispatch {
    /// Look the first positional argument up as a subcommand; pass any other
    /// positional content through untouched.
    #[default]
    Subcommands,
    /// Hand everything from the first positional argument onwards to a custom
    /// handler.
    Delegated(Arc<dyn PositionalHandler>),
}

impl Dispatch {
    pub fn name(&self) -> &str {
        match self {
            Dispatch::Subcommands => "subcommands",
            Dispatch::Delegated(handler) => handler.name(),
        }
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Subcommands => f.write_str("Subcommands"),
            Dispatch::Delegated(handler) => write!(f, "Delegated({})", handler.name()),
        }
    }
}

/// One command of the wrapped tool.
#[derive(Debug, Clone)]
pub struct CommandNode {
    path: Vec<String>,
    subcommands: BTreeSet<String>,
    options: BTreeMap<String, ArgHandler>,
    dispatch: Dispatch,
    parent: Option<CommandId>,
    ancestors: Vec<CommandId>,
}

impl CommandNode {
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The space-joined path, as used in the index and in error messages.
    pub fn path_key(&self) -> String {
        self.path.join(" ")
    }

    pub fn subcommands(&self) -> &BTreeSet<String> {
        &self.subcommands
    }

    pub fn options(&self) -> &BTreeMap<String, ArgHandler> {
        &self.options
    }

    pub fn option(&self, spelling: &str) -> Option<&ArgHandler> {
        self.options.get(spelling)
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn parent(&self) -> Option<CommandId> {
        self.parent
    }

    /// This node followed by each enclosing command up to the root.
    pub fn ancestors(&self) -> &[CommandId] {
        &self.ancestors
    }
}

/// The full command tree of the wrapped tool.
#[derive(Debug, Clone)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
    index: HashMap<String, CommandId>,
    root: CommandId,
}

impl CommandTree {
    /// Builds the tree from generated data.
    ///
    /// Options that take a value start out as [`ArgHandler::PassThrough`];
    /// options that take none are [`ArgHandler::Flag`]. Every structural
    /// problem is collected and reported together.
    pub fn from_generated(generated: &GeneratedTree) -> Result<Self, InitError> {
        let mut violations = Vec::new();
        let mut nodes: Vec<CommandNode> = Vec::with_capacity(generated.commands.len());
        let mut index: HashMap<String, CommandId> =
            HashMap::with_capacity(generated.commands.len());

        // Parents must exist before their children, so build shallow paths first.
        let mut entries: Vec<(Vec<String>, &GeneratedCommand)> = generated
            .commands
            .iter()
            .map(|(key, command)| (split_path(key), command))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        for (path, command) in entries {
            let key = path.join(" ");
            let parent = match path.split_last() {
                None => None,
                Some((_, parent_path)) => {
                    let parent_key = parent_path.join(" ");
                    match index.get(&parent_key) {
                        Some(id) => Some(*id),
                        None => {
                            violations.push(InitViolation::MissingParent {
                                command: key,
                                parent: parent_key,
                            });
                            continue;
                        }
                    }
                }
            };

            let id = CommandId(nodes.len());
            let mut ancestors = vec![id];
            if let Some(parent) = parent {
                ancestors.extend_from_slice(&nodes[parent.0].ancestors);
            }
            let options = command
                .options
                .iter()
                .map(|(spelling, takes_value)| {
                    let handler = if *takes_value {
                        ArgHandler::PassThrough
                    } else {
                        ArgHandler::Flag
                    };
                    (spelling.clone(), handler)
                })
                .collect();

            nodes.push(CommandNode {
                path,
                subcommands: command.subcommands.clone(),
                options,
                dispatch: Dispatch::Subcommands,
                parent,
                ancestors,
            });
            index.insert(key, id);
        }

        let Some(root) = index.get("").copied() else {
            violations.insert(0, InitViolation::MissingRoot);
            return Err(InitError::new(violations));
        };

        let tree = Self { nodes, index, root };
        violations.extend(tree.subcommand_violations());
        InitError::check(violations)?;
        Ok(tree)
    }

    pub fn root(&self) -> CommandId {
        self.root
    }

    pub fn node(&self, id: CommandId) -> &CommandNode {
        &self.nodes[id.0]
    }

    /// Finds the node bound to a space-joined command path.
    pub fn lookup(&self, path: &str) -> Option<CommandId> {
        self.index.get(path).copied()
    }

    /// Finds the subcommand `name` of the given node.
    pub fn child(&self, id: CommandId, name: &str) -> Option<CommandId> {
        let node = self.node(id);
        if !node.subcommands.contains(name) {
            return None;
        }
        self.lookup(&join_key(&node.path_key(), name))
    }

    /// Every bound path with its node, sorted by path.
    pub fn paths(&self) -> Vec<(&str, CommandId)> {
        let mut paths: Vec<_> = self
            .index
            .iter()
            .map(|(key, id)| (key.as_str(), *id))
            .collect();
        paths.sort();
        paths
    }

    /// Replaces the handler of an option the command already declares.
    pub fn register_arg_handler(
        &mut self,
        command: &str,
        option: &str,
        handler: ArgHandler,
    ) -> Result<(), InitViolation> {
        let id = self
            .lookup(command)
            .ok_or_else(|| InitViolation::UnknownCommand(command.to_string()))?;
        let slot = self.nodes[id.0].options.get_mut(option).ok_or_else(|| {
            InitViolation::UnknownOption {
                command: command.to_string(),
                option: option.to_string(),
            }
        })?;
        *slot = handler;
        Ok(())
    }

    /// Hands positional argument processing of a command to a custom handler.
    pub fn register_positional_handler(
        &mut self,
        command: &str,
        handler: Arc<dyn PositionalHandler>,
    ) -> Result<(), InitViolation> {
        let id = self
            .lookup(command)
            .ok_or_else(|| InitViolation::UnknownCommand(command.to_string()))?;
        self.nodes[id.0].dispatch = Dispatch::Delegated(handler);
        Ok(())
    }

    /// Binds `alias` to the node of `target`.
    ///
    /// Both commands must exist and declare the same subcommand and option
    /// names. Afterwards the alias path resolves to the target's node, so it
    /// reports the target's path in its own messages.
    pub fn alias_command(&mut self, alias: &str, target: &str) -> Result<(), InitViolation> {
        let alias_id = self
            .lookup(alias)
            .ok_or_else(|| InitViolation::UnknownCommand(alias.to_string()))?;
        let target_id = self
            .lookup(target)
            .ok_or_else(|| InitViolation::UnknownCommand(target.to_string()))?;

        let mismatch = |reason: String| InitViolation::AliasMismatch {
            alias: alias.to_string(),
            target: target.to_string(),
            reason,
        };
        let alias_node = self.node(alias_id);
        let target_node = self.node(target_id);

        if let Some(name) = first_difference(
            alias_node.subcommands.iter(),
            &target_node.subcommands,
            target_node.subcommands.len(),
        ) {
            return Err(mismatch(format!("different subcommands ({name})")));
        }
        if let Some(name) = first_difference(
            alias_node.options.keys(),
            &target_node.options.keys().cloned().collect(),
            target_node.options.len(),
        ) {
            return Err(mismatch(format!("different options ({name})")));
        }

        self.index.insert(alias.to_string(), target_id);
        Ok(())
    }

    /// Checks the whole tree for structural consistency, reporting every
    /// problem at once.
    pub fn validate(&self) -> Result<(), InitError> {
        let mut violations = self.subcommand_violations();
        for (key, id) in self.paths() {
            let node = self.node(id);
            let Some(parent) = node.parent else {
                if !node.path.is_empty() {
                    violations.push(InitViolation::MissingParent {
                        command: key.to_string(),
                        parent: node.path[..node.path.len() - 1].join(" "),
                    });
                }
                continue;
            };
            let parent_node = self.node(parent);
            if parent_node.path.as_slice() != &node.path[..node.path.len() - 1] {
                violations.push(InitViolation::InconsistentParent {
                    command: node.path_key(),
                    parent: parent_node.path_key(),
                });
            }
        }
        violations.dedup();
        InitError::check(violations)
    }

    /// Renders every command path with its dispatch and option handlers.
    pub fn describe(&self) -> String {
        let mut out = String::from("========== COMMAND STRUCTURE ==========\n");
        for (key, id) in self.paths() {
            let node = self.node(id);
            let shown = if key.is_empty() { "(root)" } else { key };
            let _ = writeln!(out, "{:<20} {}", shown, node.dispatch.name());
            for (option, handler) in &node.options {
                let _ = writeln!(out, "{:>20} {}", option, handler.name());
            }
        }
        out.push_str("========== END COMMAND STRUCTURE ==========");
        out
    }

    fn subcommand_violations(&self) -> Vec<InitViolation> {
        let mut violations = Vec::new();
        for node in &self.nodes {
            let key = node.path_key();
            for subcommand in &node.subcommands {
                if self.lookup(&join_key(&key, subcommand)).is_none() {
                    violations.push(InitViolation::MissingSubcommand {
                        command: key.clone(),
                        subcommand: subcommand.clone(),
                    });
                }
            }
        }
        violations
    }
}

fn split_path(key: &str) -> Vec<String> {
    key.split(' ')
        .filter(|segment| !segment.is_empty())
        .map(String::from)
        .collect()
}

fn join_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent} {name}")
    }
}

/// Returns a name present in only one of the two sets, if any.
fn first_difference<'a, I>(
    names: I,
    other: &BTreeSet<String>,
    other_len: usize,
) -> Option<String>
where
    I: Iterator<Item = &'a String>,
{
    let mut count = 0;
    for name in names {
        if !other.contains(name) {
            return Some(name.clone());
        }
        count += 1;
    }
    if count != other_len {
        return Some(format!("{count} vs {other_len}"));
    }
    None
}
