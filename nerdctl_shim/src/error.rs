/// Errors raised while translating one invocation's arguments.
///
/// These are fatal to the current parse: any cleanups registered before the
/// failure have already been run by the time the caller sees one.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("command \"{command}\" does not support option {option}")]
    UnsupportedOption { command: String, option: String },

    #[error("invalid value for option {option}: {source:#}")]
    Handler {
        option: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not translate arguments of \"{command}\": {source:#}")]
    Positional {
        command: String,
        #[source]
        source: anyhow::Error,
    },
}

/// A single configuration-integrity problem found while building or
/// registering against the command tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitViolation {
    #[error("generated command tree is malformed: {0}")]
    Malformed(String),

    #[error("generated command tree has no root command")]
    MissingRoot,

    #[error("command \"{command}\" has no parent command \"{parent}\"")]
    MissingParent { command: String, parent: String },

    #[error("command \"{command}\" lists subcommand \"{subcommand}\" which has no definition")]
    MissingSubcommand { command: String, subcommand: String },

    #[error("command \"{command}\" is attached to parent \"{parent}\" which does not match its path")]
    InconsistentParent { command: String, parent: String },

    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),

    #[error("command \"{command}\" does not have option \"{option}\"")]
    UnknownOption { command: String, option: String },

    #[error("cannot alias \"{alias}\" to \"{target}\": {reason}")]
    AliasMismatch {
        alias: String,
        target: String,
        reason: String,
    },
}

/// Every violation found during an initialization pass, reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "command tree initialization failed with {} violation(s): {}",
    .violations.len(),
    format_violations(.violations)
)]
pub struct InitError {
    pub violations: Vec<InitViolation>,
}

impl InitError {
    pub fn new(violations: Vec<InitViolation>) -> Self {
        Self { violations }
    }

    /// Returns `Ok(())` when no violations were collected.
    pub fn check(violations: Vec<InitViolation>) -> Result<(), Self> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Self::new(violations))
        }
    }
}

impl From<InitViolation> for InitError {
    fn from(violation: InitViolation) -> Self {
        Self::new(vec![violation])
    }
}

fn format_violations(violations: &[InitViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
