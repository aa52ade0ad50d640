//! Generated subtitle files: persistence, public references and timed expiry.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::subtitle::SubtitleTrack;

/// A persisted subtitle file and the reference handed out for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "srtUrl")]
    pub reference: String,
    pub path: PathBuf,
    pub cue_count: usize,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Artifact {
    /// The artifact as a JSON object, with the reference under `srtUrl`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

struct PendingExpiry {
    path: PathBuf,
    handle: JoinHandle<()>,
}

type PendingMap = HashMap<String, PendingExpiry>;

/// Owns generated subtitle files until their retention window elapses.
pub struct ArtifactManager {
    output_dir: PathBuf,
    public_prefix: String,
    retention: Duration,
    pending: Arc<Mutex<PendingMap>>,
    expired: Arc<Notify>,
}

impl ArtifactManager {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(output_dir: P, public_prefix: S, retention: Duration) -> Self {
        Self {
            output_dir: output_dir.into(),
            public_prefix: public_prefix.into(),
            retention,
            pending: Arc::new(Mutex::new(HashMap::new())),
            expired: Arc::new(Notify::new()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.output_dir, &config.public_prefix, config.retention())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Write `track` to a new, uniquely named file in the output directory.
    pub async fn persist(&self, track: &SubtitleTrack) -> Result<Artifact> {
        fs::create_dir_all(&self.output_dir).await?;

        let file_name = format!(
            "{}-{}-subtitles.srt",
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let path = self.output_dir.join(&file_name);
        fs::write(&path, track.to_srt()).await?;

        let reference = format!("{}/{}", self.public_prefix.trim_end_matches('/'), file_name);
        info!(reference = %reference, cues = track.len(), "Subtitle file written");

        Ok(Artifact {
            reference,
            path,
            cue_count: track.len(),
            created_at: Utc::now(),
            expires_at: None,
        })
    }

    /// Delete the artifact's file once `delay` has elapsed.
    ///
    /// Deletion errors are logged and dropped. Scheduling the same reference
    /// again replaces the earlier timer.
    pub fn schedule_expiry(&self, artifact: &mut Artifact, delay: Duration) {
        let reference = artifact.reference.clone();
        let path = artifact.path.clone();
        let pending = Arc::clone(&self.pending);
        let expired = Arc::clone(&self.expired);

        artifact.expires_at = chrono::Duration::from_std(delay)
            .ok()
            .map(|d| Utc::now() + d);

        // Held across spawn so the task cannot unregister before it is registered.
        let mut timers = lock(&self.pending);
        let task_reference = reference.clone();
        let task_path = path.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            remove_file_best_effort(&task_path, "expired subtitle file").await;
            lock(&pending).remove(&task_reference);
            expired.notify_waiters();
            debug!(reference = %task_reference, "Subtitle file expired");
        });

        if let Some(previous) = timers.insert(reference, PendingExpiry { path, handle }) {
            previous.handle.abort();
        }
    }

    /// References whose expiry has not fired yet.
    pub fn pending(&self) -> Vec<String> {
        let mut references: Vec<String> = lock(&self.pending).keys().cloned().collect();
        references.sort();
        references
    }

    pub fn is_pending(&self, reference: &str) -> bool {
        lock(&self.pending).contains_key(reference)
    }

    /// Wait until no expiry is pending.
    ///
    /// Timers stay registered while waiting, so `shutdown` can still cancel
    /// them if this future is dropped.
    pub async fn wait_for_expiry(&self) {
        info!(count = lock(&self.pending).len(), "Waiting for subtitle files to expire");

        loop {
            // Registered before the check so a removal in between is not missed.
            let notified = self.expired.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if lock(&self.pending).is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Cancel outstanding timers and delete their files now.
    pub async fn shutdown(&self) {
        let drained: Vec<PendingExpiry> = lock(&self.pending).drain().map(|(_, p)| p).collect();
        info!(count = drained.len(), "Removing unexpired subtitle files");

        for pending in drained {
            pending.handle.abort();
            remove_file_best_effort(&pending.path, "subtitle file at shutdown").await;
        }
        self.expired.notify_waiters();
    }
}

fn lock(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    // A panicked holder cannot leave the map half-updated; keep using it.
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Delete `path`, logging instead of failing. Deleting a missing file is fine.
pub async fn remove_file_best_effort(path: &Path, what: &str) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Deleted {}", what),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "{} already gone", what)
        }
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete {}", what),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::normalize_transcript;

    fn sample_track() -> SubtitleTrack {
        normalize_transcript("[00:00:01.000 --> 00:00:02.500]   - Hello there")
    }

    #[tokio::test]
    async fn test_persist_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path().join("downloads"), "/downloads/", Duration::from_secs(300));

        let artifact = manager.persist(&sample_track()).await.unwrap();

        assert!(artifact.reference.starts_with("/downloads/"));
        assert!(artifact.reference.ends_with("-subtitles.srt"));
        assert!(!artifact.reference.contains("//"));
        assert_eq!(artifact.cue_count, 1);
        let content = std::fs::read_to_string(&artifact.path).unwrap();
        assert_eq!(content, "1\n00:00:01,000 --> 00:00:02,500\nHello there\n\n");
    }

    #[tokio::test]
    async fn test_json_uses_public_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path(), "/downloads", Duration::from_secs(300));

        let mut artifact = manager.persist(&sample_track()).await.unwrap();
        let json = artifact.to_json().unwrap();
        assert_eq!(json["srtUrl"], serde_json::json!(artifact.reference));
        assert_eq!(json["cueCount"], 1);
        assert!(json["expiresAt"].is_null());

        manager.schedule_expiry(&mut artifact, manager.retention());
        assert!(artifact.to_json().unwrap()["expiresAt"].is_string());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_persist_uses_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path(), "/downloads", Duration::from_secs(300));

        let a = manager.persist(&sample_track()).await.unwrap();
        let b = manager.persist(&SubtitleTrack::new()).await.unwrap();

        assert_ne!(a.path, b.path);
        assert_eq!(std::fs::read_to_string(&b.path).unwrap(), "");
    }

    #[tokio::test]
    async fn test_expiry_deletes_file_and_unregisters() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path(), "/downloads", Duration::from_millis(20));

        let mut artifact = manager.persist(&sample_track()).await.unwrap();
        manager.schedule_expiry(&mut artifact, manager.retention());
        assert!(manager.is_pending(&artifact.reference));
        assert!(artifact.expires_at.is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!artifact.path.exists());
        assert!(!manager.is_pending(&artifact.reference));
    }

    #[tokio::test]
    async fn test_expiry_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path(), "/downloads", Duration::from_millis(10));

        let mut artifact = manager.persist(&sample_track()).await.unwrap();
        std::fs::remove_file(&artifact.path).unwrap();
        manager.schedule_expiry(&mut artifact, Duration::from_millis(10));

        manager.wait_for_expiry().await;
        assert!(manager.pending().is_empty());
    }

    #[tokio::test]
    async fn test_independent_timers() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path(), "/downloads", Duration::from_secs(300));

        let mut short = manager.persist(&sample_track()).await.unwrap();
        let mut long = manager.persist(&sample_track()).await.unwrap();
        manager.schedule_expiry(&mut short, Duration::from_millis(10));
        manager.schedule_expiry(&mut long, Duration::from_secs(300));

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!short.path.exists());
        assert!(long.path.exists());
        assert_eq!(manager.pending(), vec![long.reference.clone()]);

        manager.shutdown().await;
        assert!(!long.path.exists());
        assert!(manager.pending().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_expiry_returns_after_last_timer() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path(), "/downloads", Duration::from_millis(10));

        let mut first = manager.persist(&sample_track()).await.unwrap();
        let mut second = manager.persist(&sample_track()).await.unwrap();
        manager.schedule_expiry(&mut first, Duration::from_millis(10));
        manager.schedule_expiry(&mut second, Duration::from_millis(60));

        manager.wait_for_expiry().await;

        assert!(!first.path.exists());
        assert!(!second.path.exists());
        assert!(manager.pending().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_deletes_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path(), "/downloads", Duration::from_secs(300));

        let mut artifact = manager.persist(&sample_track()).await.unwrap();
        manager.schedule_expiry(&mut artifact, manager.retention());

        let (interrupt, interrupted) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = interrupt.send(());
        });

        tokio::select! {
            _ = manager.wait_for_expiry() => panic!("expiry finished before the interrupt"),
            _ = interrupted => {
                assert!(manager.is_pending(&artifact.reference));
                manager.shutdown().await;
            }
        }

        assert!(!artifact.path.exists());
        assert!(manager.pending().is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        remove_file_best_effort(&dir.path().join("never-existed.wav"), "audio").await;
    }
}
