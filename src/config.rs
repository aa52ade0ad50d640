use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{Result, SubgenError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub transcriber: TranscriberConfig,
    pub storage: StorageConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Sample rate of the extracted waveform (whisper.cpp expects 16kHz)
    pub sample_rate: u32,
    /// Number of audio channels to downmix to
    pub channels: u32,
    /// PCM codec used for the extracted waveform
    pub audio_codec: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path to the whisper-cli executable, or a bare name looked up on PATH
    pub binary_path: String,
    /// Path to the ggml model file
    pub model_path: PathBuf,
    /// Extra arguments appended after the model and audio arguments
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Staging area for accepted uploads
    pub uploads_dir: PathBuf,
    /// Where generated subtitle files are written
    pub output_dir: PathBuf,
    /// Prefix of the public reference returned for each subtitle file
    pub public_prefix: String,
    /// Seconds a generated subtitle file is kept before deletion
    pub retention_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts for a retried tool invocation, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each subsequent one
    pub base_delay_ms: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            sample_rate: 16000,
            channels: 1,
            audio_codec: "pcm_s16le".to_string(),
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper.cpp/build/bin/whisper-cli".to_string(),
            model_path: PathBuf::from("whisper.cpp/models/ggml-base.en.bin"),
            extra_args: vec!["-of".to_string(), "srt".to_string()],
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("downloads"),
            public_prefix: "/downloads".to_string(),
            retention_secs: 5 * 60,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl StorageConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubgenError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubgenError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubgenError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.media.binary_path.trim().is_empty() {
            return Err(SubgenError::Config("media.binary_path must not be empty".to_string()));
        }
        if self.transcriber.binary_path.trim().is_empty() {
            return Err(SubgenError::Config("transcriber.binary_path must not be empty".to_string()));
        }
        if self.transcriber.model_path.as_os_str().is_empty() {
            return Err(SubgenError::Config("transcriber.model_path must not be empty".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(SubgenError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}
