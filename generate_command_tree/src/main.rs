//! Generate the nerdctl command tree
//!
//! Walks the help output of the wrapped tool, one command at a time, and
//! writes every subcommand and option it finds to the JSON file embedded into
//! `nerdctl_shim`. Run it against the nerdctl version the shim will front and
//! commit the result.

mod help_parser;
mod tree_builder;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use nerdctl_shim::command_tree::{CommandTree, GeneratedTree};
use nerdctl_shim::utils::logging::init_logging;

use help_parser::HelpParser;
use tree_builder::{ProcessHelp, build_tree};

/// Generate the command tree of a container CLI from its help output.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// The tool to introspect
    #[arg(long, default_value = "/usr/local/bin/nerdctl")]
    pub tool: PathBuf,

    /// Flag appended to a command path to print its help
    #[arg(long, default_value = "--help", allow_hyphen_values = true)]
    pub help_flag: String,

    /// Header suffix introducing the subcommand list
    #[arg(long, default_value = "COMMANDS:")]
    pub commands_marker: String,

    /// Header suffix introducing the option list
    #[arg(long, default_value = "OPTIONS:")]
    pub options_marker: String,

    /// Where to write the generated tree
    #[arg(long, default_value = "nerdctl_shim/data/command_tree.json")]
    pub output: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Name recorded in the generated tree: the tool's file name.
fn tool_name(tool: &Path) -> String {
    tool.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| tool.display().to_string())
}

/// Checks that the tree loads the way the shim will load it.
fn validate(tree: &GeneratedTree) -> Result<()> {
    let loaded = CommandTree::from_generated(tree)?;
    loaded.validate()?;
    Ok(())
}

/// Writes the tree as pretty JSON with a trailing newline, creating parent
/// directories as needed.
fn write_tree(output: &Path, tree: &GeneratedTree) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut json = tree.to_json_pretty()?;
    json.push('\n');
    fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))
}

fn run(cli: &Cli) -> Result<GeneratedTree> {
    let parser = HelpParser::new(cli.commands_marker.clone(), cli.options_marker.clone())?;
    let source = ProcessHelp::new(cli.tool.clone(), cli.help_flag.clone());

    let tree = build_tree(&tool_name(&cli.tool), &source, &parser)?;
    validate(&tree).context("Generated command tree is inconsistent")?;
    write_tree(&cli.output, &tree)?;
    Ok(tree)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.debug { "debug" } else { "info" }, false)?;

    info!("Generating command tree from {}", cli.tool.display());
    let tree = run(&cli)?;

    println!(
        "✓ Generated command tree for {} at: {}",
        tree.tool,
        cli.output.display()
    );
    println!("  Commands: {}", tree.commands.len());
    Ok(())
}
