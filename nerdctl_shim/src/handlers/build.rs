use tracing::debug;

use super::{FilePathHandler, PositionalHandler, ValueHandler};
use crate::command_tree::CommandId;
use crate::error::ParseError;
use crate::parser::{END_OF_OPTIONS, ParseFailure, ParsedArgs, Parser, is_option_token};

/// Context locations the wrapped tool fetches itself.
const REMOTE_CONTEXT_PREFIXES: &[&str] = &["http://", "https://", "git://", "git@", "github.com/"];

/// Positional handler for `image build`: rewrites the build context path.
///
/// Options keep their usual treatment. The first positional argument is the
/// build context; any later positional arguments are passed through.
pub struct BuildContextHandler {
    context: FilePathHandler,
}

impl BuildContextHandler {
    pub fn new(context: FilePathHandler) -> Self {
        Self { context }
    }

    fn is_remote(context: &str) -> bool {
        context == "-"
            || REMOTE_CONTEXT_PREFIXES
                .iter()
                .any(|prefix| context.starts_with(prefix))
    }
}

impl PositionalHandler for BuildContextHandler {
    fn name(&self) -> &str {
        "build context"
    }

    fn handle(
        &self,
        parser: &Parser<'_>,
        command: CommandId,
        args: &[String],
    ) -> Result<ParsedArgs, ParseFailure> {
        let mut result = ParsedArgs::default();
        let mut seen_context = false;
        let mut index = 0;

        while index < args.len() {
            let arg = args[index].as_str();

            if arg == END_OF_OPTIONS {
                result.args.extend_from_slice(&args[index..]);
                break;
            }

            if is_option_token(arg) {
                let next = args.get(index + 1).map(String::as_str);
                match parser.resolve_option(command, arg, next) {
                    Ok(resolved) => {
                        result.args.extend(resolved.args);
                        result.cleanups.extend(resolved.cleanups);
                        if resolved.consumed_next {
                            index += 1;
                        }
                    }
                    Err(failure) => return Err(result.fail(failure)),
                }
            } else if seen_context || Self::is_remote(arg) {
                seen_context = true;
                result.args.push(arg.to_string());
            } else {
                seen_context = true;
                match self.context.convert(arg) {
                    Ok(converted) => {
                        debug!("Build context {:?} rewritten to {:?}", arg, converted.value);
                        result.args.push(converted.value);
                        result.cleanups.extend(converted.cleanups);
                    }
                    Err(failure) => {
                        return Err(result.fail(ParseFailure {
                            error: ParseError::Positional {
                                command: parser.tree().node(command).path_key(),
                                source: failure.error,
                            },
                            cleanups: failure.cleanups,
                        }));
                    }
                }
            }
            index += 1;
        }

        Ok(result)
    }
}
