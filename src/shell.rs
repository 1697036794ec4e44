//! Subprocess helpers for external query tools (`nix`, `brew`).
//!
//! Every call is bounded by its own timeout and the child is killed when the
//! future is dropped, so an abandoned search never leaves work running.

use crate::error::{ResolveError, Result};
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Check if a program is available on PATH.
pub fn command_available(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Run a command and parse its stdout as JSON.
///
/// Fails on a missing program, a non-zero exit, empty output, invalid JSON, or
/// when `limit` elapses first.
pub async fn run_json_command(program: &str, args: &[&str], limit: Duration) -> Result<Value> {
    if !command_available(program) {
        return Err(ResolveError::ToolMissing(program.to_string()));
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(limit, command.output()).await {
        Ok(output) => output?,
        Err(_) => {
            return Err(ResolveError::CommandTimeout {
                program: program.to_string(),
                secs: limit.as_secs(),
            });
        }
    };

    if !output.status.success() {
        return Err(ResolveError::CommandFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Err(ResolveError::CommandFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: "empty output".to_string(),
        });
    }

    Ok(serde_json::from_str(stdout)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_command_available() {
        assert!(command_available("sh"));
        assert!(!command_available("__nxr_definitely_not_a_command__"));
    }

    #[tokio::test]
    async fn test_run_json_command_parses_stdout() {
        let value = run_json_command("sh", &["-c", r#"echo '{"ok": true}'"#], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(value["ok"], Value::Bool(true));
    }

    #[tokio::test]
    async fn test_run_json_command_missing_tool() {
        let err = run_json_command("__nxr_missing__", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ToolMissing(_)));
    }

    #[tokio::test]
    async fn test_run_json_command_nonzero_exit() {
        let err = run_json_command("sh", &["-c", "exit 3"], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_run_json_command_empty_output() {
        let err = run_json_command("sh", &["-c", "true"], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_run_json_command_times_out() {
        let started = Instant::now();
        let err = run_json_command("sh", &["-c", "sleep 5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::CommandTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
