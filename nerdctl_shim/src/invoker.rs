//! Runs the wrapped tool with translated arguments.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Once;
use tracing::{debug, info, warn};

use crate::cleanup::{Outcome, run_cleanups};
use crate::parser::ParsedArgs;

static INTERRUPT_HANDLER: Once = Once::new();

/// Keeps the shim alive through Ctrl-C. The tool shares the terminal's process
/// group and receives the interrupt itself; its exit status then decides which
/// cleanups run.
fn survive_interrupts() {
    INTERRUPT_HANDLER.call_once(|| {
        if let Err(e) = ctrlc::set_handler(|| debug!("Interrupt left to the wrapped tool")) {
            warn!("Failed to install interrupt handler: {}", e);
        }
    });
}

/// Runs `tool` with the parsed arguments and returns its exit code.
///
/// Standard streams are inherited. The cleanups always run once the tool has
/// finished, been interrupted, or failed to start; failure-only cleanups run
/// unless it exited successfully.
pub fn invoke(tool: &Path, parsed: ParsedArgs) -> Result<i32> {
    let ParsedArgs { args, cleanups } = parsed;
    info!("Running {} {:?}", tool.display(), args);
    survive_interrupts();

    let status = Command::new(tool)
        .args(&args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status();

    match status {
        Ok(status) => {
            let outcome = if status.success() {
                Outcome::Success
            } else {
                Outcome::Failure
            };
            let failed = run_cleanups(cleanups, outcome);
            if failed > 0 {
                warn!("{} cleanup(s) failed after running {}", failed, tool.display());
            }
            let code = exit_code(status);
            info!("{} exited with code {}", tool.display(), code);
            Ok(code)
        }
        Err(e) => {
            run_cleanups(cleanups, Outcome::Failure);
            Err(e).with_context(|| format!("Failed to execute '{}'", tool.display()))
        }
    }
}

/// Maps an exit status to a process exit code, using the shell convention of
/// `128 + signal` for children killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::cleanup::Cleanup;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn parsed(args: &[&str], log: &Arc<Mutex<Vec<&'static str>>>) -> ParsedArgs {
        let always = Arc::clone(log);
        let on_failure = Arc::clone(log);
        ParsedArgs {
            args: args.iter().map(|s| s.to_string()).collect(),
            cleanups: vec![
                Cleanup::new("always", move || {
                    always.lock().unwrap().push("always");
                    Ok(())
                }),
                Cleanup::on_failure("on failure", move || {
                    on_failure.lock().unwrap().push("on failure");
                    Ok(())
                }),
            ],
        }
    }

    #[test]
    fn success_skips_failure_only_cleanups() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let code = invoke(Path::new("sh"), parsed(&["-c", "exit 0"], &log)).unwrap();
        assert_eq!(code, 0);
        assert_eq!(*log.lock().unwrap(), vec!["always"]);
    }

    #[test]
    fn exit_code_is_propagated_and_failure_cleanups_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let code = invoke(Path::new("sh"), parsed(&["-c", "exit 3"], &log)).unwrap();
        assert_eq!(code, 3);
        assert_eq!(*log.lock().unwrap(), vec!["always", "on failure"]);
    }

    #[test]
    fn signal_maps_to_shell_convention() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let code = invoke(Path::new("sh"), parsed(&["-c", "kill -9 $$"], &log)).unwrap();
        assert_eq!(code, 137);
    }

    #[test]
    fn interrupted_tool_still_runs_failure_cleanups() {
        let log = Arc::new(Mutex::new(Vec::new()));
        // Ctrl-C reaches the whole process group: this process, then the tool.
        let code = invoke(
            Path::new("sh"),
            parsed(&["-c", "kill -INT $PPID; sleep 1; kill -INT $$"], &log),
        )
        .unwrap();
        assert_eq!(code, 130);
        assert_eq!(*log.lock().unwrap(), vec!["always", "on failure"]);
    }

    #[test]
    fn spawn_failure_still_runs_cleanups() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let missing = PathBuf::from("/nonexistent/nerdctl");
        let err = invoke(&missing, parsed(&["ps"], &log)).unwrap_err();
        assert!(err.to_string().contains("Failed to execute"));
        assert_eq!(*log.lock().unwrap(), vec!["always", "on failure"]);
    }
}
