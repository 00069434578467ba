use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info};

use nerdctl_shim::command_tree::GeneratedTree;

use crate::help_parser::HelpParser;

/// Nesting deeper than this means the help output lists a command under
/// itself.
const MAX_DEPTH: usize = 8;

/// Produces the help text of a command path.
pub trait HelpSource {
    fn help(&self, path: &[String]) -> Result<String>;
}

/// Runs the wrapped tool as `<tool> <path...> <help flag>`.
#[derive(Debug, Clone)]
pub struct ProcessHelp {
    tool: PathBuf,
    help_flag: String,
}

impl ProcessHelp {
    pub fn new(tool: impl Into<PathBuf>, help_flag: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            help_flag: help_flag.into(),
        }
    }
}

impl HelpSource for ProcessHelp {
    fn help(&self, path: &[String]) -> Result<String> {
        let output = Command::new(&self.tool)
            .args(path)
            .arg(&self.help_flag)
            .output()
            .with_context(|| {
                format!(
                    "Failed to execute '{} {} {}'",
                    self.tool.display(),
                    path.join(" "),
                    self.help_flag
                )
            })?;

        if !output.status.success() {
            bail!(
                "'{} {} {}' exited with {}: {}",
                self.tool.display(),
                path.join(" "),
                self.help_flag,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Builds the complete tree depth-first from the root command.
///
/// Nothing is returned until every command has been visited; any failure
/// aborts the whole walk.
pub fn build_tree(
    tool_name: &str,
    source: &dyn HelpSource,
    parser: &HelpParser,
) -> Result<GeneratedTree> {
    let mut tree = GeneratedTree::new(tool_name);
    visit(&mut tree, source, parser, &mut Vec::new())?;
    info!("Discovered {} commands of {}", tree.commands.len(), tool_name);
    Ok(tree)
}

fn visit(
    tree: &mut GeneratedTree,
    source: &dyn HelpSource,
    parser: &HelpParser,
    path: &mut Vec<String>,
) -> Result<()> {
    let key = GeneratedTree::path_key(path);
    if path.len() > MAX_DEPTH {
        bail!("Command path \"{}\" is nested too deeply", key);
    }

    let help = source
        .help(path)
        .with_context(|| format!("Error getting help for \"{}\"", key))?;
    let command = parser.parse(&help);
    debug!(
        "\"{}\": {} subcommand(s), {} option(s)",
        key,
        command.subcommands.len(),
        command.options.len()
    );

    let subcommands: Vec<String> = command.subcommands.iter().cloned().collect();
    tree.commands.insert(key, command);

    for name in subcommands {
        path.push(name);
        visit(tree, source, parser, path)?;
        path.pop();
    }
    Ok(())
}
