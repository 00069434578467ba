//! # Shell Module
//!
//! Entry point logic for the `nerdctl_shim` binary. The shim's command line is
//! the wrapped tool's command line, so there is no argument parser here: the
//! arguments go straight to the command-tree [`Parser`](crate::parser::Parser)
//! and the shim's own settings come from [`ShimConfig`].

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use crate::bootstrap::load_command_tree;
use crate::config::ShimConfig;
use crate::handlers::PathTranslator;
use crate::invoker::invoke;
use crate::parser::Parser;
use crate::utils::logging::init_logging;

/// Exit code when the shim cannot start (bad configuration, broken tree).
pub const EXIT_INIT_FAILURE: i32 = 125;

/// Exit code when the arguments cannot be translated.
pub const EXIT_PARSE_FAILURE: i32 = 1;

/// Translates `args` (without the program name) and runs the wrapped tool.
///
/// Returns the exit code the process should end with. Errors are reserved for
/// failures of the shim itself.
pub fn run<I>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = String>,
{
    let config = ShimConfig::load().context("Failed to load nerdctl_shim configuration")?;
    init_logging(&config.log_level, config.log_to_file)?;

    let translator = Arc::new(PathTranslator::from_config(&config)?);
    let tree = load_command_tree(translator).context("Failed to load the command tree")?;
    if config.describe {
        info!("\n{}", tree.describe());
    }

    let args: Vec<String> = args.into_iter().collect();
    let parsed = match Parser::new(&tree).parse(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Failed to translate {:?}: {}", args, e);
            eprintln!("nerdctl_shim: {e}");
            return Ok(EXIT_PARSE_FAILURE);
        }
    };

    invoke(&config.tool_path, parsed)
}
