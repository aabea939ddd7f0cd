//! Adapters for external processes.
//!
//! The build engine and declarative addons both drive subprocesses; this
//! module holds the shared spawning logic.

pub mod command_addon;
pub mod command_builder;

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

pub use command_addon::CommandAddon;
pub use command_builder::CommandBuilder;

/// Run `argv` in `cwd` with extra environment, returning stdout
///
/// A non-zero exit becomes an error carrying the exit code and stderr.
pub async fn run_command(argv: &[String], cwd: &Path, envs: &[(&str, String)]) -> Result<String> {
    let (program, args) = argv.split_first().context("Command line is empty")?;

    debug!(command = %argv.join(" "), cwd = %cwd.display(), "Spawning process");

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .envs(envs.iter().map(|(key, value)| (*key, value.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to spawn '{}'", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);
        anyhow::bail!(
            "Command '{}' failed with exit code {}: {}",
            argv.join(" "),
            exit_code,
            stderr.trim()
        );
    }

    String::from_utf8(output.stdout).context("Command output is not valid UTF-8")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_stdout_and_env() {
        let out = run_command(
            &sh("printf '%s' \"$GREETING\""),
            Path::new("."),
            &[("GREETING", "hello".to_string())],
        )
        .await
        .unwrap();

        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_failure_reports_exit_code_and_stderr() {
        let err = run_command(&sh("echo broken >&2; exit 3"), Path::new("."), &[])
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("exit code 3"), "{}", msg);
        assert!(msg.contains("broken"), "{}", msg);
    }

    #[tokio::test]
    async fn test_empty_command_is_error() {
        assert!(run_command(&[], Path::new("."), &[]).await.is_err());
    }
}
