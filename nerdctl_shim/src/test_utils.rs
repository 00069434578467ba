//! Fixtures shared by unit and integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use crate::cleanup::Cleanup;
use crate::command_tree::{CommandTree, GeneratedCommand, GeneratedTree};
use crate::handlers::{ConversionFailure, ConversionResult, Converted, ValueHandler};

pub const HOST_PATH: &str = "/host/path";
pub const TRANSLATED_PATH: &str = "/translated/path";

fn command(subcommands: &[&str], options: &[(&str, bool)]) -> GeneratedCommand {
    GeneratedCommand {
        subcommands: subcommands.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        options: options
            .iter()
            .map(|(name, takes_value)| (name.to_string(), *takes_value))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Options of `container run`, repeated on the top-level `run` shortcut.
const RUN_OPTIONS: &[(&str, bool)] = &[
    ("--cidfile", true),
    ("--detach", false),
    ("-d", false),
    ("--format", true),
    ("--label", true),
    ("-l", true),
    ("--name", true),
    ("--volume", true),
    ("-v", true),
];

/// A small tree in the shape of the real one:
///
/// ```text
/// (root)          --debug --namespace/-n
/// ├── container   --format --filter
/// │   └── run     RUN_OPTIONS
/// ├── image
/// │   └── build   --file/-f --tag/-t --quiet/-q
/// └── run         RUN_OPTIONS
/// ```
///
/// No aliases or handlers are registered.
pub fn fixture_generated_tree() -> GeneratedTree {
    let mut tree = GeneratedTree::new("nerdctl");
    tree.commands.insert(
        String::new(),
        command(
            &["container", "image", "run"],
            &[("--debug", false), ("--namespace", true), ("-n", true)],
        ),
    );
    tree.commands.insert(
        "container".to_string(),
        command(&["run"], &[("--filter", true), ("--format", true)]),
    );
    tree.commands
        .insert("container run".to_string(), command(&[], RUN_OPTIONS));
    tree.commands.insert("image".to_string(), command(&["build"], &[]));
    tree.commands.insert(
        "image build".to_string(),
        command(
            &[],
            &[
                ("--file", true),
                ("-f", true),
                ("--tag", true),
                ("-t", true),
                ("--quiet", false),
                ("-q", false),
            ],
        ),
    );
    tree.commands.insert("run".to_string(), command(&[], RUN_OPTIONS));
    tree
}

/// [`fixture_generated_tree`] loaded into a [`CommandTree`].
pub fn fixture_tree() -> CommandTree {
    CommandTree::from_generated(&fixture_generated_tree()).expect("fixture tree must load")
}

/// Converts a `&[&str]` into owned arguments.
pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Rewrites a leading [`HOST_PATH`] to [`TRANSLATED_PATH`]; anything else is
/// returned unchanged.
#[derive(Debug, Default)]
pub struct PrefixRewrite;

impl ValueHandler for PrefixRewrite {
    fn name(&self) -> &str {
        "prefix rewrite"
    }

    fn convert(&self, value: &str) -> ConversionResult {
        match value.strip_prefix(HOST_PATH) {
            Some(rest) => Ok(Converted::new(format!("{TRANSLATED_PATH}{rest}"))),
            None => Ok(Converted::new(value)),
        }
    }
}

/// Hands out value handlers whose cleanups record their label when run.
#[derive(Debug, Clone, Default)]
pub struct CleanupProbe {
    log: Arc<Mutex<Vec<String>>>,
}

impl CleanupProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels of every cleanup run so far, in order.
    pub fn ran(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// A cleanup that records `label` when it runs.
    pub fn cleanup(&self, label: &str) -> Cleanup {
        let log = Arc::clone(&self.log);
        let name = label.to_string();
        Cleanup::new(label, move || {
            log.lock().unwrap().push(name);
            Ok(())
        })
    }

    /// A handler that upper-cases its value and registers a cleanup labelled
    /// `label:<value>`.
    pub fn handler(&self, label: &str) -> Arc<dyn ValueHandler> {
        Arc::new(ProbeHandler {
            probe: self.clone(),
            label: label.to_string(),
            fail: false,
        })
    }

    /// A handler that registers a partial cleanup labelled `label:<value>`
    /// and then fails.
    pub fn failing(&self, label: &str) -> Arc<dyn ValueHandler> {
        Arc::new(ProbeHandler {
            probe: self.clone(),
            label: label.to_string(),
            fail: true,
        })
    }
}

struct ProbeHandler {
    probe: CleanupProbe,
    label: String,
    fail: bool,
}

impl ValueHandler for ProbeHandler {
    fn name(&self) -> &str {
        &self.label
    }

    fn convert(&self, value: &str) -> ConversionResult {
        let cleanup = self.probe.cleanup(&format!("{}:{}", self.label, value));
        if self.fail {
            return Err(ConversionFailure::with_cleanups(
                anyhow::anyhow!("{} rejected {:?}", self.label, value),
                vec![cleanup],
            ));
        }
        Ok(Converted::new(value.to_uppercase()).with_cleanup(cleanup))
    }
}
