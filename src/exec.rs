//! Running external processes.

use std::path::Path;
use std::process::Command;

use crate::{Error, Result};

/// Runs a fully built argument vector in a working directory and waits for it.
pub trait ProcessExecutor {
    /// `args[0]` is the program. Non-zero exit is [`Error::ProcessFailed`].
    fn execute(&self, args: &[String], dir: &Path) -> Result<()>;
}

/// [`ProcessExecutor`] that spawns real child processes with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl ProcessExecutor for SystemExecutor {
    fn execute(&self, args: &[String], dir: &Path) -> Result<()> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| Error::InvalidInput("empty command line".to_string()))?;
        let label = describe(args);

        tracing::info!(command = %label, dir = %dir.display(), "executing");

        let status = Command::new(program)
            .args(rest)
            .current_dir(dir)
            .status()
            .map_err(|e| Error::ProcessLaunch {
                program: program.clone(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::ProcessFailed {
                program: label,
                code: status.code(),
            })
        }
    }
}

/// Program plus verb, e.g. `docker run`.
fn describe(args: &[String]) -> String {
    args.iter().take(2).cloned().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_empty_args_rejected() {
        let temp = TempDir::new().unwrap();
        let result = SystemExecutor.execute(&[], temp.path());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let temp = TempDir::new().unwrap();
        let result = SystemExecutor.execute(&argv(&["keel-no-such-program-xyz"]), temp.path());
        assert!(matches!(result, Err(Error::ProcessLaunch { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_in_directory() {
        let temp = TempDir::new().unwrap();
        SystemExecutor
            .execute(&argv(&["touch", "marker"]), temp.path())
            .unwrap();
        assert!(temp.path().join("marker").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_propagates_code() {
        let temp = TempDir::new().unwrap();
        let result = SystemExecutor.execute(&argv(&["sh", "-c", "exit 3"]), temp.path());
        match result {
            Err(Error::ProcessFailed { program, code }) => {
                assert_eq!(program, "sh -c");
                assert_eq!(code, Some(3));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_describe_leaves_out_arguments() {
        let args = argv(&["docker", "run", "--env", "DAPP_PRIVATE_KEY=0xsecret", "web3app"]);
        assert_eq!(describe(&args), "docker run");
    }
}
