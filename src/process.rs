//! Child process execution for the external tools (ffmpeg, whisper-cli).

use std::fmt;
use std::io::ErrorKind;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// How an external tool failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    /// The program could not be found.
    NotFound,
    /// The program exists but could not be started.
    Launch(String),
    /// The program ran and exited with a non-zero status.
    ExitCode(i32),
    /// The program was terminated without an exit code.
    Signal,
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolFailure::NotFound => write!(f, "was not found"),
            ToolFailure::Launch(reason) => write!(f, "could not be started: {}", reason),
            ToolFailure::ExitCode(code) => write!(f, "exited with status {}", code),
            ToolFailure::Signal => write!(f, "was terminated by a signal"),
        }
    }
}

/// Failure of an external tool, carrying whatever it wrote before failing.
#[derive(Error, Debug, Clone)]
#[error("{program} {kind}: {}", .stderr.trim())]
pub struct ToolError {
    pub program: String,
    pub kind: ToolFailure,
    pub stderr: String,
    pub stdout: String,
}

impl ToolError {
    fn launch(program: &str, err: std::io::Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::NotFound => ToolFailure::NotFound,
            _ => ToolFailure::Launch(err.to_string()),
        };
        Self {
            program: program.to_string(),
            kind,
            stderr: String::new(),
            stdout: String::new(),
        }
    }

    /// Non-zero exits may be load related; a missing or unlaunchable
    /// program will not fix itself.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ToolFailure::ExitCode(_) | ToolFailure::Signal)
    }
}

/// Run `program` with `args`, wait for it to finish and return its stdout.
///
/// No timeout is imposed. The child is killed if the returned future is
/// dropped before completion.
pub async fn run_tool<S: AsRef<str>>(program: &str, args: &[S]) -> Result<String, ToolError> {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    debug!(program, ?args, "Executing external tool");

    let output = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ToolError::launch(program, e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let kind = match output.status.code() {
            Some(code) => ToolFailure::ExitCode(code),
            None => ToolFailure::Signal,
        };
        return Err(ToolError {
            program: program.to_string(),
            kind,
            stderr,
            stdout,
        });
    }

    debug!(program, stdout_len = stdout.len(), "External tool completed");
    Ok(stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let out = run_tool("sh", &["-c", "echo hello"]).await.unwrap();
        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_both_streams() {
        let err = run_tool("sh", &["-c", "echo partial; echo broken >&2; exit 3"])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolFailure::ExitCode(3));
        assert_eq!(err.stdout, "partial\n");
        assert_eq!(err.stderr, "broken\n");
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "sh exited with status 3: broken");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run_tool("/nonexistent/definitely-not-a-tool", &["-version"])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolFailure::NotFound);
        assert!(!err.is_transient());
    }
}
