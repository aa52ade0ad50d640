// Media processing: audio extraction through ffmpeg.
//
// - Commands: argument-list builder for ffmpeg invocations
// - FfmpegProcessor: MediaProcessor implementation driving those commands

pub mod commands;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub use commands::*;

use crate::config::MediaConfig;
use crate::error::{Result, SubgenError};

/// Media operations the subtitle pipeline needs from an external tool.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Extract a mono 16-bit PCM waveform suitable for transcription.
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;
}

/// FFmpeg-based media processor
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        let command = self.command_builder.extract_audio(video_path, audio_path, &self.config);
        command.execute().await.map_err(SubgenError::Extraction)?;

        info!("Audio extraction completed");
        Ok(())
    }
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Arc<dyn MediaProcessor> {
        Arc::new(FfmpegProcessor::new(config))
    }
}
