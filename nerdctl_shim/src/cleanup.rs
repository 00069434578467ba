//! Deferred cleanup actions produced while translating arguments.
//!
//! A value handler that creates something on the host (or expects the wrapped
//! tool to) hands back a [`Cleanup`] describing how to undo it. Cleanups are
//! one-shot: running one consumes it, so a registered action can never run
//! twice.

use anyhow::Result;
use std::fmt;
use tracing::{debug, warn};

/// When a cleanup should run relative to the outcome of the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupWhen {
    /// Run after every invocation, successful or not.
    Always,
    /// Run only when parsing or the wrapped tool failed.
    OnFailure,
}

/// Outcome of the work a batch of cleanups is being released for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

type CleanupFn = Box<dyn FnOnce() -> Result<()> + Send>;

/// A labelled, one-shot cleanup action.
pub struct Cleanup {
    label: String,
    when: CleanupWhen,
    action: CleanupFn,
}

impl Cleanup {
    /// Creates a cleanup that runs regardless of outcome.
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self {
            label: label.into(),
            when: CleanupWhen::Always,
            action: Box::new(action),
        }
    }

    /// Creates a cleanup that is skipped when the invocation succeeds.
    pub fn on_failure<F>(label: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self {
            label: label.into(),
            when: CleanupWhen::OnFailure,
            action: Box::new(action),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn when(&self) -> CleanupWhen {
        self.when
    }

    /// Runs the action, consuming the cleanup.
    pub fn run(self) -> Result<()> {
        (self.action)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("label", &self.label)
            .field("when", &self.when)
            .finish_non_exhaustive()
    }
}

/// Runs every cleanup in order for the given outcome.
///
/// A failing cleanup is logged and never stops the remaining ones. Returns the
/// number of cleanups that failed.
pub fn run_cleanups<I>(cleanups: I, outcome: Outcome) -> usize
where
    I: IntoIterator<Item = Cleanup>,
{
    let mut failures = 0;
    for cleanup in cleanups {
        if outcome == Outcome::Success && cleanup.when == CleanupWhen::OnFailure {
            debug!("Skipping failure-only cleanup '{}'", cleanup.label);
            continue;
        }
        let label = cleanup.label.clone();
        debug!("Running cleanup '{}'", label);
        if let Err(e) = cleanup.run() {
            warn!("Error running cleanup '{}': {:#}", label, e);
            failures += 1;
        }
    }
    failures
}
