//! # Registration and Bootstrap
//!
//! The generated tree only knows which options take a value. Everything that
//! needs rewriting is attached here: value handlers for path-carrying
//! options, the build context handler, and the top-level shortcuts that are
//! aliases of `container` and `image` subcommands.
//!
//! Registrations are declarative so the whole plan can be checked in one
//! pass. A typo in a command path or option name is a configuration defect:
//! every such violation is collected and reported together, and the shim
//! refuses to start.

use std::sync::Arc;
use tracing::debug;

use crate::command_tree::{ArgHandler, CommandTree, GeneratedTree};
use crate::error::InitError;
use crate::handlers::{
    BuildContextHandler, FilePathHandler, MountHandler, OutputPathHandler, PathTranslator,
    PositionalHandler, ValueHandler,
};

/// Top-level shortcuts for `container` subcommands.
pub const CONTAINER_ALIASES: &[&str] = &[
    "commit", "exec", "kill", "logs", "pause", "port", "rm", "run", "start", "stop", "unpause",
    "wait", "create",
];

/// Top-level shortcuts for `image` subcommands.
pub const IMAGE_ALIASES: &[&str] = &["build", "load", "pull", "push", "save", "tag"];

/// One change applied to the command tree at startup.
#[derive(Clone)]
pub enum Registration {
    ArgHandler {
        command: String,
        option: String,
        handler: ArgHandler,
    },
    PositionalHandler {
        command: String,
        handler: Arc<dyn PositionalHandler>,
    },
    Alias {
        alias: String,
        target: String,
    },
}

impl Registration {
    pub fn value_handler(
        command: impl Into<String>,
        option: impl Into<String>,
        handler: Arc<dyn ValueHandler>,
    ) -> Self {
        Self::ArgHandler {
            command: command.into(),
            option: option.into(),
            handler: ArgHandler::Convert(handler),
        }
    }

    pub fn positional(command: impl Into<String>, handler: Arc<dyn PositionalHandler>) -> Self {
        Self::PositionalHandler {
            command: command.into(),
            handler,
        }
    }

    pub fn alias(alias: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Alias {
            alias: alias.into(),
            target: target.into(),
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArgHandler {
                command,
                option,
                handler,
            } => write!(f, "ArgHandler({command:?} {option} -> {handler:?})"),
            Self::PositionalHandler { command, handler } => {
                write!(f, "PositionalHandler({command:?} -> {})", handler.name())
            }
            Self::Alias { alias, target } => write!(f, "Alias({alias:?} -> {target:?})"),
        }
    }
}

/// Applies every registration in order, then fails with all violations found.
///
/// Registrations that fail are skipped; the rest still apply, so one run
/// reports every typo in the plan.
pub fn bootstrap<I>(tree: &mut CommandTree, registrations: I) -> Result<(), InitError>
where
    I: IntoIterator<Item = Registration>,
{
    let mut violations = Vec::new();
    for registration in registrations {
        debug!("Applying {:?}", registration);
        let applied = match registration {
            Registration::ArgHandler {
                command,
                option,
                handler,
            } => tree.register_arg_handler(&command, &option, handler),
            Registration::PositionalHandler { command, handler } => {
                tree.register_positional_handler(&command, handler)
            }
            Registration::Alias { alias, target } => tree.alias_command(&alias, &target),
        };
        if let Err(violation) = applied {
            violations.push(violation);
        }
    }
    InitError::check(violations)
}

/// The registrations shipped with the shim.
pub fn default_registrations(translator: Arc<PathTranslator>) -> Vec<Registration> {
    let file: Arc<dyn ValueHandler> = Arc::new(FilePathHandler::new(Arc::clone(&translator)));
    let output: Arc<dyn ValueHandler> = Arc::new(OutputPathHandler::new(Arc::clone(&translator)));
    let mount: Arc<dyn ValueHandler> = Arc::new(MountHandler::new(Arc::clone(&translator)));

    let mut registrations = Vec::new();
    let plan: [(&str, &[&str], &Arc<dyn ValueHandler>); 11] = [
        (
            "compose",
            &["--file", "-f", "--project-directory", "--env-file"],
            &file,
        ),
        ("container run", &["--volume", "-v"], &mount),
        ("container run", &["--env-file", "--label-file"], &file),
        ("container run", &["--cidfile", "--pidfile"], &output),
        ("container create", &["--volume", "-v"], &mount),
        ("container create", &["--env-file", "--label-file"], &file),
        ("container create", &["--cidfile", "--pidfile"], &output),
        ("image build", &["--file", "-f"], &file),
        ("image convert", &["--estargz-record-in"], &file),
        ("image load", &["--input", "-i"], &file),
        ("image save", &["--output", "-o"], &output),
    ];
    for (command, names, handler) in plan {
        for name in names {
            registrations.push(Registration::value_handler(
                command,
                *name,
                Arc::clone(handler),
            ));
        }
    }

    registrations.push(Registration::positional(
        "image build",
        Arc::new(BuildContextHandler::new(FilePathHandler::new(translator))),
    ));

    // Aliases go last so the shortcuts share the handlers registered above.
    for name in CONTAINER_ALIASES {
        registrations.push(Registration::alias(*name, format!("container {name}")));
    }
    for name in IMAGE_ALIASES {
        registrations.push(Registration::alias(*name, format!("image {name}")));
    }
    registrations
}

/// Loads the embedded tree, applies the default registrations and validates
/// the result.
pub fn load_command_tree(translator: Arc<PathTranslator>) -> Result<CommandTree, InitError> {
    let generated = GeneratedTree::embedded()?;
    let mut tree = CommandTree::from_generated(&generated)?;
    bootstrap(&mut tree, default_registrations(translator))?;
    tree.validate()?;
    debug!(
        "Loaded {} command tree with {} paths",
        generated.tool,
        tree.paths().len()
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InitViolation;
    use crate::test_utils::{PrefixRewrite, fixture_tree};

    fn translator() -> Arc<PathTranslator> {
        Arc::new(PathTranslator::new("/mnt").unwrap())
    }

    #[test]
    fn reports_every_violation_and_applies_the_rest() {
        let mut tree = fixture_tree();
        let err = bootstrap(
            &mut tree,
            vec![
                Registration::value_handler("contianer run", "--volume", Arc::new(PrefixRewrite)),
                Registration::value_handler("container run", "--volume", Arc::new(PrefixRewrite)),
                Registration::value_handler("container run", "--volumes", Arc::new(PrefixRewrite)),
                Registration::alias("run", "container"),
            ],
        )
        .unwrap_err();

        assert_eq!(err.violations.len(), 3);
        assert_eq!(
            err.violations[0],
            InitViolation::UnknownCommand("contianer run".to_string())
        );
        assert!(matches!(
            err.violations[1],
            InitViolation::UnknownOption { .. }
        ));
        assert!(matches!(
            err.violations[2],
            InitViolation::AliasMismatch { .. }
        ));

        let run = tree.node(tree.lookup("container run").unwrap());
        assert_eq!(run.option("--volume").unwrap().name(), "prefix rewrite");
    }

    #[test]
    fn empty_plan_succeeds() {
        let mut tree = fixture_tree();
        bootstrap(&mut tree, Vec::new()).unwrap();
    }

    #[test]
    fn default_plan_covers_path_options_and_aliases() {
        let registrations = default_registrations(translator());
        let aliases = registrations
            .iter()
            .filter(|r| matches!(r, Registration::Alias { .. }))
            .count();
        assert_eq!(aliases, CONTAINER_ALIASES.len() + IMAGE_ALIASES.len());
        assert!(registrations.iter().any(|r| matches!(
            r,
            Registration::PositionalHandler { command, .. } if command == "image build"
        )));
    }

    #[test]
    fn shipped_tree_loads_with_default_registrations() {
        let tree = load_command_tree(translator()).unwrap();

        let run = tree.node(tree.lookup("container run").unwrap());
        assert_eq!(run.option("--volume").unwrap().name(), "volume");
        assert_eq!(run.option("--cidfile").unwrap().name(), "output path");
        assert_eq!(tree.lookup("run"), tree.lookup("container run"));
        assert_eq!(tree.lookup("build"), tree.lookup("image build"));

        let build = tree.node(tree.lookup("image build").unwrap());
        assert_eq!(build.dispatch().name(), "build context");
        assert_eq!(build.option("-f").unwrap().name(), "file path");
    }
}
