use thiserror::Error;

use crate::process::{ToolError, ToolFailure};

#[derive(Error, Debug)]
pub enum SubgenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{tool} not properly installed: {role} {path} is not accessible ({reason})")]
    ToolMissing {
        tool: String,
        role: &'static str,
        path: String,
        reason: String,
    },

    #[error("Audio extraction failed: {0}")]
    Extraction(#[source] ToolError),

    #[error("Transcription failed: {0}")]
    Transcription(#[source] ToolError),
}

impl SubgenError {
    /// Whether a retry of the failed operation could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SubgenError::Extraction(e) | SubgenError::Transcription(e) => e.is_transient(),
            _ => false,
        }
    }

    /// The captured tool failure, if this error came from an external program.
    pub fn tool_error(&self) -> Option<&ToolError> {
        match self {
            SubgenError::Extraction(e) | SubgenError::Transcription(e) => Some(e),
            _ => None,
        }
    }

    /// Single descriptive message for whoever asked for the subtitles.
    ///
    /// Exit codes and full captured streams stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            SubgenError::ToolMissing { path, .. } => format!(
                "Required dependencies not found. Please check the configuration ({})",
                path
            ),
            SubgenError::Extraction(e) | SubgenError::Transcription(e) => {
                if matches!(e.kind, ToolFailure::NotFound) {
                    return format!(
                        "Required dependencies not found. Please check the configuration ({})",
                        e.program
                    );
                }
                match e.stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
                    Some(line) => format!("Processing error: {}", line),
                    None => "Error generating subtitles".to_string(),
                }
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SubgenError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_error(kind: ToolFailure, stderr: &str) -> ToolError {
        ToolError {
            program: "ffmpeg".to_string(),
            kind,
            stderr: stderr.to_string(),
            stdout: String::new(),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(SubgenError::Extraction(tool_error(ToolFailure::ExitCode(1), "")).is_transient());
        assert!(!SubgenError::Extraction(tool_error(ToolFailure::NotFound, "")).is_transient());
        assert!(!SubgenError::ToolMissing {
            tool: "whisper.cpp".to_string(),
            role: "executable",
            path: "/opt/whisper-cli".to_string(),
            reason: "No such file or directory".to_string(),
        }
        .is_transient());
    }

    #[test]
    fn test_user_message_uses_last_stderr_line() {
        let err = SubgenError::Transcription(tool_error(
            ToolFailure::ExitCode(2),
            "loading model\nerror: failed to read audio\n\n",
        ));
        assert_eq!(err.user_message(), "Processing error: error: failed to read audio");
    }

    #[test]
    fn test_user_message_for_missing_tool() {
        let err = SubgenError::Extraction(tool_error(ToolFailure::NotFound, ""));
        assert!(err.user_message().starts_with("Required dependencies not found"));
        assert!(err.user_message().contains("ffmpeg"));
    }
}
