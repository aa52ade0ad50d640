use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, SubgenError};

/// Container formats accepted for subtitle generation.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "mpeg", "mpg",
];

pub fn is_supported_media<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Stages of a subtitle generation run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Received,
    ExtractingAudio,
    Transcribing,
    Normalizing,
    Persisted,
    Completed,
    Failed,
}

impl JobStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStage::Completed | JobStage::Failed)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Received => "received",
            JobStage::ExtractingAudio => "extracting_audio",
            JobStage::Transcribing => "transcribing",
            JobStage::Normalizing => "normalizing",
            JobStage::Persisted => "persisted",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One upload-to-subtitle request and the files it owns.
#[derive(Debug, Clone)]
pub struct MediaJob {
    pub id: String,
    pub original_name: String,
    pub source_path: PathBuf,
    pub audio_path: PathBuf,
    pub created_at: DateTime<Utc>,
    stage: JobStage,
}

impl MediaJob {
    /// Wrap an upload that already sits at a job-unique path.
    pub fn new<P: Into<PathBuf>>(source_path: P) -> Self {
        let source_path = source_path.into();
        let original_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            id: short_id(),
            original_name,
            audio_path: audio_path_for(&source_path),
            source_path,
            created_at: Utc::now(),
            stage: JobStage::Received,
        }
    }

    /// Accept `input` as an upload: reject missing or unsupported files, then
    /// copy it into `uploads_dir` under a name no other job will use.
    ///
    /// The pipeline deletes its source when done, so it only ever sees the copy.
    pub async fn stage_upload<P: AsRef<Path>, Q: AsRef<Path>>(input: P, uploads_dir: Q) -> Result<Self> {
        let input = input.as_ref();
        let uploads_dir = uploads_dir.as_ref();

        if !fs::try_exists(input).await.unwrap_or(false) {
            return Err(SubgenError::FileNotFound(input.display().to_string()));
        }
        if !is_supported_media(input) {
            return Err(SubgenError::UnsupportedFormat(format!(
                "{} is not a video file",
                input.display()
            )));
        }

        let original_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| SubgenError::UnsupportedFormat(input.display().to_string()))?;

        fs::create_dir_all(uploads_dir).await?;

        let id = short_id();
        let staged = uploads_dir.join(format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            id,
            original_name
        ));
        fs::copy(input, &staged).await?;
        debug!(input = %input.display(), staged = %staged.display(), "Staged upload");

        Ok(Self {
            id,
            original_name,
            audio_path: audio_path_for(&staged),
            source_path: staged,
            created_at: Utc::now(),
            stage: JobStage::Received,
        })
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    pub(crate) fn advance(&mut self, next: JobStage) {
        debug_assert!(!self.stage.is_terminal(), "job {} already {}", self.id, self.stage);
        info!(job = %self.id, from = %self.stage, to = %next, "Job stage transition");
        self.stage = next;
    }
}

/// The extracted waveform sits next to its source: `<source>.wav`.
fn audio_path_for(source: &Path) -> PathBuf {
    let mut path = source.as_os_str().to_owned();
    path.push(".wav");
    PathBuf::from(path)
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
