// Transcription backends.
//
// The pipeline only needs raw timestamped text on stdout; turning it into a
// subtitle track is the job of `crate::subtitle`. To add another backend,
// implement `Transcriber` and extend the factory.

pub mod whisper_cpp;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::TranscriberConfig;
use crate::error::Result;

pub use whisper_cpp::WhisperCppTranscriber;

/// Speech-to-text through an external program
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Verify the executable and model can be used, without running anything.
    async fn check_access(&self) -> Result<()>;

    /// Transcribe a 16kHz mono waveform, returning the tool's raw output.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_default(config: TranscriberConfig) -> Arc<dyn Transcriber> {
        Arc::new(WhisperCppTranscriber::new(config))
    }
}
