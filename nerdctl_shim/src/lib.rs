//! # nerdctl_shim
//!
//! An argument-translating front end for `nerdctl`. The shim runs on the host,
//! accepts exactly the command line `nerdctl` would, rewrites every value that
//! names a host path into the path the container environment sees, and then
//! runs the real `nerdctl` with the translated arguments.
//!
//! ## How it works
//!
//! - A **command tree** generated offline from `nerdctl`'s help output (see the
//!   `generate_command_tree` crate) records every subcommand and which options
//!   take a value. It is embedded into the binary.
//! - At startup the **bootstrap** attaches value handlers to the options that
//!   carry paths, a positional handler to `image build`, and binds the
//!   top-level shortcuts (`run`, `build`, ...) to their full commands. A typo
//!   in this plan stops the shim before anything runs.
//! - The **parser** walks the arguments against the tree. Options unknown to a
//!   subcommand are looked up on its enclosing commands; unknown options are
//!   rejected; positional content that is not a subcommand is passed through.
//! - Handlers may leave **cleanups** behind (for example removing a file the
//!   tool failed to finish writing). They run exactly once, after the tool
//!   exits or as soon as translation fails.
//!
//! ## Modules
//!
//! - **`command_tree`**: the tree arena, its generated form and registration
//! - **`parser`**: option resolution and subcommand dispatch
//! - **`handlers`**: path translation and the value and positional handlers
//! - **`bootstrap`**: the registration plan applied at startup
//! - **`cleanup`**: deferred one-shot cleanup actions
//! - **`invoker`**: runs the wrapped tool
//! - **`config`**: the shim's own layered configuration
//! - **`shell`**: the binary's entry point

pub mod bootstrap;
pub mod cleanup;
pub mod command_tree;
pub mod config;
pub mod error;
pub mod handlers;
pub mod invoker;
pub mod parser;
pub mod shell;
pub mod utils;

// Test utilities
pub mod test_utils;

pub use command_tree::{CommandId, CommandTree};
pub use error::{InitError, ParseError};
pub use parser::{ParsedArgs, Parser};
