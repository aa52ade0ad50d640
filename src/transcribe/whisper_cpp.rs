use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{Result, SubgenError};
use crate::process::run_tool;
use super::Transcriber;

const TOOL_NAME: &str = "whisper.cpp";

/// Runs the whisper.cpp CLI (`whisper-cli -m <model> -f <audio>`).
pub struct WhisperCppTranscriber {
    config: TranscriberConfig,
}

impl WhisperCppTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, audio_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            self.config.model_path.to_string_lossy().to_string(),
            "-f".to_string(),
            audio_path.to_string_lossy().to_string(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    fn missing(role: &'static str, path: &Path, reason: impl ToString) -> SubgenError {
        SubgenError::ToolMissing {
            tool: TOOL_NAME.to_string(),
            role,
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperCppTranscriber {
    async fn check_access(&self) -> Result<()> {
        debug!(
            executable = %self.config.binary_path,
            model = %self.config.model_path.display(),
            "Checking transcriber paths"
        );

        let executable = resolve_executable(&self.config.binary_path);
        ensure_executable(&executable)
            .await
            .map_err(|e| Self::missing("executable", &executable, e))?;
        ensure_readable(&self.config.model_path)
            .await
            .map_err(|e| Self::missing("model", &self.config.model_path, e))?;

        debug!("Found both transcriber executable and model");
        Ok(())
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        info!("Transcribing audio: {}", audio_path.display());

        let stdout = run_tool(&self.config.binary_path, &self.build_args(audio_path))
            .await
            .map_err(SubgenError::Transcription)?;

        info!(bytes = stdout.len(), "Transcription completed");
        Ok(stdout)
    }
}

/// Bare program names are looked up on `PATH`; anything with a directory
/// component is used as given.
fn resolve_executable(binary: &str) -> PathBuf {
    let path = Path::new(binary);
    if path.components().count() > 1 {
        return path.to_path_buf();
    }

    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(binary))
                .find(|candidate| candidate.is_file())
        })
        .unwrap_or_else(|| path.to_path_buf())
}

async fn ensure_executable(path: &Path) -> std::io::Result<()> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(std::io::Error::other("not a regular file"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "not executable",
            ));
        }
    }

    Ok(())
}

async fn ensure_readable(path: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(path).await.map(|_| ())
}
