//! Value handlers and positional handlers.
//!
//! A [`ValueHandler`] rewrites the value of one option (for example a host
//! path into the path the wrapped tool can see). A [`PositionalHandler`] takes
//! over positional argument processing for a command whose positional
//! arguments need rewriting too.
//!
//! ## Sub-modules
//!
//! - **`paths`**: host path translation plus the file and output path handlers
//! - **`mount`**: `source:dest[:options]` mount specification handler
//! - **`build`**: build context positional handler for `image build`

pub mod build;
pub mod mount;
pub mod paths;

pub use build::BuildContextHandler;
pub use mount::MountHandler;
pub use paths::{FilePathHandler, OutputPathHandler, PathTranslator};

use crate::cleanup::Cleanup;
use crate::command_tree::CommandId;
use crate::parser::{ParseFailure, ParsedArgs, Parser};

/// A successfully converted option value.
#[derive(Debug)]
pub struct Converted {
    pub value: String,
    pub cleanups: Vec<Cleanup>,
}

impl Converted {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            cleanups: Vec::new(),
        }
    }

    pub fn with_cleanup(mut self, cleanup: Cleanup) -> Self {
        self.cleanups.push(cleanup);
        self
    }
}

/// A failed conversion, carrying any cleanups the handler registered before
/// it gave up.
#[derive(Debug)]
pub struct ConversionFailure {
    pub error: anyhow::Error,
    pub cleanups: Vec<Cleanup>,
}

impl ConversionFailure {
    pub fn with_cleanups(error: impl Into<anyhow::Error>, cleanups: Vec<Cleanup>) -> Self {
        Self {
            error: error.into(),
            cleanups,
        }
    }
}

impl From<anyhow::Error> for ConversionFailure {
    fn from(error: anyhow::Error) -> Self {
        Self {
            error,
            cleanups: Vec::new(),
        }
    }
}

pub type ConversionResult = Result<Converted, ConversionFailure>;

/// Converts one raw option value.
pub trait ValueHandler: Send + Sync {
    /// Short name used when describing the command tree.
    fn name(&self) -> &str;

    fn convert(&self, value: &str) -> ConversionResult;
}

/// Takes over everything from the first positional argument of a command.
///
/// The handler receives the remaining arguments (starting at the positional
/// argument) and produces the translated arguments plus cleanups. On failure it
/// runs nothing: every cleanup it collected goes back in the [`ParseFailure`],
/// in registration order, and the parser unwinds them with the rest.
pub trait PositionalHandler: Send + Sync {
    fn name(&self) -> &str;

    fn handle(
        &self,
        parser: &Parser<'_>,
        command: CommandId,
        args: &[String],
    ) -> Result<ParsedArgs, ParseFailure>;
}
