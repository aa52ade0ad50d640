use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::artifact::{remove_file_best_effort, Artifact, ArtifactManager};
use crate::config::Config;
use crate::error::{Result, SubgenError};
use crate::job::{JobStage, MediaJob};
use crate::media::{MediaProcessor, MediaProcessorFactory};
use crate::retry::RetryPolicy;
use crate::subtitle::normalize_transcript;
use crate::transcribe::{Transcriber, TranscriberFactory};

/// Drives one media file through extraction, transcription and normalization
/// to a persisted subtitle file.
///
/// A single `Workflow` is shared by every job; jobs only touch their own
/// files, so any number may run at once.
pub struct Workflow {
    media: Arc<dyn MediaProcessor>,
    transcriber: Arc<dyn Transcriber>,
    artifacts: Arc<ArtifactManager>,
    retry: RetryPolicy,
}

impl Workflow {
    pub fn new(
        media: Arc<dyn MediaProcessor>,
        transcriber: Arc<dyn Transcriber>,
        artifacts: Arc<ArtifactManager>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            media,
            transcriber,
            artifacts,
            retry,
        }
    }

    /// Wire up the ffmpeg and whisper.cpp backends described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            MediaProcessorFactory::create_processor(config.media.clone()),
            TranscriberFactory::create_default(config.transcriber.clone()),
            Arc::new(ArtifactManager::from_config(&config.storage)),
            RetryPolicy::from(&config.retry),
        )
    }

    pub fn artifacts(&self) -> &Arc<ArtifactManager> {
        &self.artifacts
    }

    /// Generate subtitles for `job`.
    ///
    /// The job's source and intermediate audio are removed whatever the
    /// outcome. On success the subtitle file is scheduled for deletion after
    /// the retention window.
    pub async fn generate(&self, mut job: MediaJob) -> Result<Artifact> {
        info!(job = %job.id, file = %job.original_name, "Generating subtitles");

        match self.run_stages(&mut job).await {
            Ok(artifact) => Ok(artifact),
            Err(e) => {
                let failed_in = job.stage();
                job.advance(JobStage::Failed);
                match e.tool_error() {
                    Some(tool) => error!(
                        job = %job.id,
                        stage = %failed_in,
                        program = %tool.program,
                        failure = %tool.kind,
                        stderr = %tool.stderr,
                        stdout = %tool.stdout,
                        "Subtitle generation failed"
                    ),
                    None => error!(job = %job.id, stage = %failed_in, error = %e, "Subtitle generation failed"),
                }

                remove_file_best_effort(&job.source_path, "uploaded file").await;
                remove_file_best_effort(&job.audio_path, "extracted audio").await;
                Err(e)
            }
        }
    }

    async fn run_stages(&self, job: &mut MediaJob) -> Result<Artifact> {
        job.advance(JobStage::ExtractingAudio);
        self.extract_audio(&job.source_path, &job.audio_path).await?;

        job.advance(JobStage::Transcribing);
        self.transcriber.check_access().await?;
        let raw = self.transcribe(&job.audio_path).await?;

        job.advance(JobStage::Normalizing);
        let track = normalize_transcript(&raw);
        if track.is_empty() {
            warn!(job = %job.id, "Transcript contained no usable cues");
        }

        let mut artifact = self.artifacts.persist(&track).await?;
        job.advance(JobStage::Persisted);

        remove_file_best_effort(&job.audio_path, "extracted audio").await;
        remove_file_best_effort(&job.source_path, "uploaded file").await;
        self.artifacts
            .schedule_expiry(&mut artifact, self.artifacts.retention());

        job.advance(JobStage::Completed);
        info!(job = %job.id, reference = %artifact.reference, cues = artifact.cue_count, "Subtitles ready");
        Ok(artifact)
    }

    /// Extract audio only, with the same retry policy as the pipeline.
    pub async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        let media = &self.media;
        self.retry
            .run_if(
                "audio extraction",
                move || media.extract_audio(video_path, audio_path),
                SubgenError::is_transient,
            )
            .await
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let transcriber = &self.transcriber;
        self.retry
            .run_if(
                "transcription",
                move || transcriber.transcribe(audio_path),
                SubgenError::is_transient,
            )
            .await
    }
}
