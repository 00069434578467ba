//! # Command-Tree Parser
//!
//! Walks a flat argument list against the [`CommandTree`], rewriting option
//! values through their registered handlers and collecting the cleanups those
//! handlers produce.
//!
//! Processing at one command is left to right:
//!
//! - an option token is resolved against the command and, failing that, each
//!   enclosing command in turn;
//! - the first positional token either goes to the command's delegated
//!   handler, descends into a subcommand, or (when it is neither) ends
//!   processing with the rest copied through untouched.
//!
//! If anything fails, every cleanup collected so far is handed back up the
//! recursion and run once, in registration order across all levels, before
//! the error is returned. A failed parse never leaves artifacts behind.

use tracing::debug;

use crate::cleanup::{Cleanup, Outcome, run_cleanups};
use crate::command_tree::{ArgHandler, CommandId, CommandNode, CommandTree, Dispatch};
use crate::error::ParseError;


/// Marks the end of options; everything after it is passed through.
pub const END_OF_OPTIONS: &str = "--";

/// Translated arguments plus the cleanups owed for them.
#[derive(Debug, Default)]
pub struct ParsedArgs {
    pub args: Vec<String>,
    pub cleanups: Vec<Cleanup>,
}

impl ParsedArgs {
    /// Appends another result after this one.
    pub fn extend(&mut self, other: ParsedArgs) {
        self.args.extend(other.args);
        self.cleanups.extend(other.cleanups);
    }

    /// Discards the arguments of a level whose next step failed. The cleanups
    /// collected so far are owed before those of the failed step.
    pub fn fail(self, failure: ParseFailure) -> ParseFailure {
        let mut cleanups = self.cleanups;
        cleanups.extend(failure.cleanups);
        ParseFailure {
            error: failure.error,
            cleanups,
        }
    }
}

/// A failed parse step with every cleanup still owed, in registration order.
/// None of them has run yet.
#[derive(Debug)]
pub struct ParseFailure {
    pub error: ParseError,
    pub cleanups: Vec<Cleanup>,
}

impl ParseFailure {
    pub fn new(error: ParseError) -> Self {
        Self {
            error,
            cleanups: Vec::new(),
        }
    }

    /// Runs the owed cleanups as a failure and returns the error.
    pub fn unwind(self) -> ParseError {
        if !self.cleanups.is_empty() {
            debug!(
                "Unwinding {} cleanup(s) after parse failure",
                self.cleanups.len()
            );
        }
        run_cleanups(self.cleanups, Outcome::Failure);
        self.error
    }
}

/// The result of resolving one option token.
#[derive(Debug)]
pub struct ResolvedOption {
    pub args: Vec<String>,
    /// Whether the token after the option was used as its value.
    pub consumed_next: bool,
    pub cleanups: Vec<Cleanup>,
}

impl ResolvedOption {
    fn verbatim(token: &str) -> Self {
        Self {
            args: vec![token.to_string()],
            consumed_next: false,
            cleanups: Vec::new(),
        }
    }
}

/// Returns true for tokens that are parsed as options.
///
/// A lone `-` conventionally means stdin or stdout and is positional.
pub fn is_option_token(token: &str) -> bool {
    token.starts_with('-') && token != "-"
}

/// Parses arguments against a command tree.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'t> {
    tree: &'t CommandTree,
}

impl<'t> Parser<'t> {
    pub fn new(tree: &'t CommandTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &'t CommandTree {
        self.tree
    }

    /// Parses a full argument list (without the program name) from the root.
    pub fn parse(&self, args: &[String]) -> Result<ParsedArgs, ParseError> {
        self.parse_at(self.tree.root(), args)
    }

    /// Parses the arguments that follow `command` on the command line,
    /// unwinding every collected cleanup on failure.
    pub fn parse_at(&self, command: CommandId, args: &[String]) -> Result<ParsedArgs, ParseError> {
        self.parse_level(command, args).map_err(ParseFailure::unwind)
    }

    /// Parses the arguments that follow `command` without running anything on
    /// failure; the owed cleanups travel in the [`ParseFailure`].
    pub fn parse_level(
        &self,
        command: CommandId,
        args: &[String],
    ) -> Result<ParsedArgs, ParseFailure> {
        let node = self.tree.node(command);
        let mut result = ParsedArgs::default();
        let mut index = 0;

        while index < args.len() {
            let arg = args[index].as_str();

            if arg == END_OF_OPTIONS {
                result.args.extend_from_slice(&args[index..]);
                break;
            }

            if is_option_token(arg) {
                let next = args.get(index + 1).map(String::as_str);
                match self.resolve_option(command, arg, next) {
                    Ok(resolved) => {
                        result.args.extend(resolved.args);
                        result.cleanups.extend(resolved.cleanups);
                        if resolved.consumed_next {
                            index += 1;
                        }
                    }
                    Err(failure) => return Err(result.fail(failure)),
                }
                index += 1;
                continue;
            }

            let outcome = match node.dispatch() {
                Dispatch::Delegated(handler) => {
                    debug!(
                        "Using positional handler '{}' for \"{}\"",
                        handler.name(),
                        node.path_key()
                    );
                    handler.handle(self, command, &args[index..])
                }
                Dispatch::Subcommands => self.dispatch_subcommand(command, node, &args[index..]),
            };
            match outcome {
                Ok(rest) => result.extend(rest),
                Err(failure) => return Err(result.fail(failure)),
            }
            break;
        }

        Ok(result)
    }

    /// Resolves an option token at `command`, falling back to enclosing
    /// commands when the command does not declare it.
    ///
    /// The first command declaring the option owns it: its handler's result,
    /// including failure, is final.
    pub fn resolve_option(
        &self,
        command: CommandId,
        token: &str,
        next: Option<&str>,
    ) -> Result<ResolvedOption, ParseFailure> {
        let (name, inline_value) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };

        for &level in self.tree.node(command).ancestors() {
            let node = self.tree.node(level);
            if let Some(handler) = find_option(node, name) {
                if level != command {
                    debug!(
                        "Option {} resolved by enclosing command \"{}\"",
                        name,
                        node.path_key()
                    );
                }
                return apply_handler(handler, token, name, inline_value, next);
            }
        }

        Err(ParseFailure::new(ParseError::UnsupportedOption {
            command: self.tree.node(command).path_key(),
            option: token.to_string(),
        }))
    }

    fn dispatch_subcommand(
        &self,
        command: CommandId,
        node: &CommandNode,
        args: &[String],
    ) -> Result<ParsedArgs, ParseFailure> {
        let name = &args[0];
        let Some(child) = self.tree.child(command, name) else {
            debug!(
                "No command \"{}\" under \"{}\", passing positional arguments through",
                name,
                node.path_key()
            );
            return Ok(ParsedArgs {
                args: args.to_vec(),
                cleanups: Vec::new(),
            });
        };

        let child_result = self.parse_level(child, &args[1..])?;
        let mut result = ParsedArgs {
            args: vec![name.clone()],
            cleanups: Vec::new(),
        };
        result.extend(child_result);
        Ok(result)
    }
}

/// Looks an option name up, accepting either dash spelling.
///
/// Users may write `-foo` for `--foo`, so the double-dash form is tried first;
/// a `--f` written for a declared `-f` is accepted as well.
fn find_option<'n>(node: &'n CommandNode, name: &str) -> Option<&'n ArgHandler> {
    node.option(&format!("-{name}"))
        .or_else(|| node.option(name))
        .or_else(|| {
            name.strip_prefix("--")
                .and_then(|short| node.option(&format!("-{short}")))
        })
}

fn apply_handler(
    handler: &ArgHandler,
    token: &str,
    name: &str,
    inline_value: Option<&str>,
    next: Option<&str>,
) -> Result<ResolvedOption, ParseFailure> {
    let converter = match handler {
        ArgHandler::Flag => return Ok(ResolvedOption::verbatim(token)),
        ArgHandler::PassThrough => None,
        ArgHandler::Convert(converter) => Some(converter),
    };

    let (value, consumed_next) = match (inline_value, next) {
        (Some(value), _) => (value, false),
        (None, Some(value)) => (value, true),
        (None, None) => {
            debug!("Option {} has no value; passing it through", token);
            return Ok(ResolvedOption::verbatim(token));
        }
    };

    let (converted, cleanups) = match converter {
        None => (value.to_string(), Vec::new()),
        Some(converter) => match converter.convert(value) {
            Ok(converted) => {
                debug!(
                    "Option {} value {:?} rewritten by '{}' to {:?}",
                    name,
                    value,
                    converter.name(),
                    converted.value
                );
                (converted.value, converted.cleanups)
            }
            Err(failure) => {
                return Err(ParseFailure {
                    error: ParseError::Handler {
                        option: name.to_string(),
                        source: failure.error,
                    },
                    cleanups: failure.cleanups,
                });
            }
        },
    };

    let args = if consumed_next {
        vec![token.to_string(), converted]
    } else {
        vec![format!("{name}={converted}")]
    };
    Ok(ResolvedOption {
        args,
        consumed_next,
        cleanups,
    })
}
