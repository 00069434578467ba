//! Serialized form of the command tree, as written by `generate_command_tree`.
//!
//! The shipped tree lives in `data/command_tree.json` and is embedded into the
//! binary at compile time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{InitError, InitViolation};

/// The generated tree shipped with this crate.
pub const EMBEDDED_COMMAND_TREE: &str = include_str!("../../data/command_tree.json");

/// Every command of the wrapped tool, keyed by its space-joined path. The root
/// command has the empty key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedTree {
    /// Name of the wrapped tool the tree was generated from.
    pub tool: String,
    pub commands: BTreeMap<String, GeneratedCommand>,
}

/// One command as discovered from the wrapped tool's help output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedCommand {
    #[serde(default)]
    pub subcommands: BTreeSet<String>,
    /// Option spelling to whether the option takes a value.
    #[serde(default)]
    pub options: BTreeMap<String, bool>,
}

impl GeneratedTree {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            commands: BTreeMap::new(),
        }
    }

    /// Parses a generated tree from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, InitError> {
        serde_json::from_str(json).map_err(|e| InitViolation::Malformed(e.to_string()).into())
    }

    /// Loads the tree embedded in the binary.
    pub fn embedded() -> Result<Self, InitError> {
        Self::from_json(EMBEDDED_COMMAND_TREE)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Joins a command path into its table key.
    pub fn path_key<S: AsRef<str>>(path: &[S]) -> String {
        path.iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
