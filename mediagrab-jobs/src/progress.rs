//! Progress mapping and metadata publication.
//!
//! Engine events are mapped onto a fixed percentage scale and written to the
//! metadata store through a reporter that enforces monotonicity: observed
//! stages and percentages only move forward, so jittery engine output never
//! makes the published progress bounce backwards.

use tracing::warn;
use uuid::Uuid;

use mediagrab_queue::Stage;
use mediagrab_store::{MetaStore, ProgressRecord, ResultRecord};

use crate::engine::EngineEvent;
use crate::error::JobError;
use crate::state::{JobState, StateTracker};

/// Published immediately after a job is picked up.
pub const INIT_PROGRESS: u8 = 1;
/// Transfer progress maps linearly into `[DOWNLOAD_FLOOR, DOWNLOAD_FLOOR + DOWNLOAD_SPAN]`.
pub const DOWNLOAD_FLOOR: u8 = 5;
pub const DOWNLOAD_SPAN: u8 = 80;
/// The downloader committed to its final output file.
pub const DESTINATION_CHECKPOINT: u8 = 86;
/// Merge / extract post-processing started.
pub const POSTPROCESS_CHECKPOINT: u8 = 90;
/// Artifact selection and transcode.
pub const FINALIZING_CHECKPOINT: u8 = 95;
pub const DONE: u8 = 100;

/// Map an engine event onto a stage and percentage.
pub fn map_event(event: &EngineEvent) -> (Stage, u8) {
    match event {
        EngineEvent::Transfer(fraction) => {
            let fraction = fraction.clamp(0.0, 1.0);
            let pct = DOWNLOAD_FLOOR + (fraction * f64::from(DOWNLOAD_SPAN)).round() as u8;
            (Stage::Downloading, pct)
        }
        EngineEvent::Destination => (Stage::Postprocessing, DESTINATION_CHECKPOINT),
        EngineEvent::Postprocess => (Stage::Postprocessing, POSTPROCESS_CHECKPOINT),
    }
}

/// Per-job progress publisher. Owns the state tracker for its job and is the
/// sole writer of that job's metadata record.
pub struct ProgressReporter {
    store: MetaStore,
    job_id: Uuid,
    tracker: StateTracker,
    stage: Stage,
    progress: u8,
}

impl ProgressReporter {
    pub fn new(store: MetaStore, job_id: Uuid) -> Self {
        Self {
            store,
            job_id,
            tracker: StateTracker::new(),
            stage: Stage::Init,
            progress: 0,
        }
    }

    /// Mark the job as picked up.
    pub async fn begin(&mut self) -> Result<(), JobError> {
        self.publish(Stage::Init, INIT_PROGRESS).await
    }

    /// Publish a running update. Stage and progress are clamped to never
    /// regress below what was already published.
    pub async fn report(&mut self, stage: Stage, progress: u8) -> Result<(), JobError> {
        let stage = stage.max(self.stage);
        let progress = progress.max(self.progress);
        self.publish(stage, progress).await
    }

    async fn publish(&mut self, stage: Stage, progress: u8) -> Result<(), JobError> {
        self.tracker.advance(JobState::Running { stage, progress })?;
        self.stage = stage;
        self.progress = progress;
        self.store
            .write(self.job_id, &ProgressRecord::running(stage, progress))
            .await?;
        Ok(())
    }

    /// Publish the terminal finished record with the result fields.
    pub async fn finish(&mut self, result: &ResultRecord) -> Result<(), JobError> {
        self.tracker.advance(JobState::Finished)?;
        self.store
            .write(self.job_id, &ProgressRecord::finished(result))
            .await?;
        Ok(())
    }

    /// Publish the terminal failed record. The stage the job failed in is
    /// preserved so callers can tell where it went wrong.
    pub async fn fail(&mut self, error: &JobError) {
        if let Err(state_err) = self.tracker.advance(JobState::Failed) {
            warn!(job_id = %self.job_id, error = %state_err, "failure write rejected");
            return;
        }
        let record = ProgressRecord::failed(self.stage, &error.to_string());
        if let Err(store_err) = self.store.write(self.job_id, &record).await {
            warn!(job_id = %self.job_id, error = %store_err, "failed to publish failure record");
        }
    }
}

#[cfg(test)]
mod tests {
    use mediagrab_queue::JobStatus;
    use mediagrab_store::{MemoryBackend, MetaStore};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn store() -> MetaStore {
        MetaStore::new(Arc::new(MemoryBackend::new()), Duration::from_secs(60))
    }

    #[test]
    fn transfer_maps_into_download_band() {
        assert_eq!(map_event(&EngineEvent::Transfer(0.0)), (Stage::Downloading, 5));
        assert_eq!(map_event(&EngineEvent::Transfer(0.5)), (Stage::Downloading, 45));
        assert_eq!(map_event(&EngineEvent::Transfer(1.0)), (Stage::Downloading, 85));
    }

    #[test]
    fn checkpoints_map_to_fixed_percentages() {
        assert_eq!(
            map_event(&EngineEvent::Destination),
            (Stage::Postprocessing, 86)
        );
        assert_eq!(
            map_event(&EngineEvent::Postprocess),
            (Stage::Postprocessing, 90)
        );
    }

    #[test]
    fn out_of_range_fractions_are_clamped() {
        assert_eq!(map_event(&EngineEvent::Transfer(1.5)), (Stage::Downloading, 85));
        assert_eq!(map_event(&EngineEvent::Transfer(-0.1)), (Stage::Downloading, 5));
    }

    #[tokio::test]
    async fn reporter_publishes_running_updates() {
        let store = store();
        let id = Uuid::new_v4();
        let mut reporter = ProgressReporter::new(store.clone(), id);
        reporter.begin().await.unwrap();
        reporter.report(Stage::Downloading, 45).await.unwrap();

        let record = store.read(id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Running);
        assert_eq!(record.stage, Stage::Downloading);
        assert_eq!(record.progress, 45);
    }

    #[tokio::test]
    async fn reporter_clamps_regressions() {
        let store = store();
        let id = Uuid::new_v4();
        let mut reporter = ProgressReporter::new(store.clone(), id);
        reporter.begin().await.unwrap();
        reporter.report(Stage::Postprocessing, 86).await.unwrap();
        // A late transfer event must not pull progress back down.
        reporter.report(Stage::Downloading, 60).await.unwrap();

        let record = store.read(id).await.unwrap().unwrap();
        assert_eq!(record.stage, Stage::Postprocessing);
        assert_eq!(record.progress, 86);
    }

    #[tokio::test]
    async fn finish_publishes_result_fields() {
        let store = store();
        let id = Uuid::new_v4();
        let mut reporter = ProgressReporter::new(store.clone(), id);
        reporter.begin().await.unwrap();
        let result = ResultRecord {
            file_name: "clip.mp4".to_string(),
            file_path: "/srv/storage/clip.mp4".to_string(),
            download_url: ResultRecord::download_url_for(id),
        };
        reporter.finish(&result).await.unwrap();

        let record = store.read(id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Finished);
        assert_eq!(record.progress, 100);
        assert_eq!(record.filename.as_deref(), Some("clip.mp4"));
        assert_eq!(record.download_url, Some(format!("/download/{id}")));
    }

    #[tokio::test]
    async fn fail_preserves_stage_and_message() {
        let store = store();
        let id = Uuid::new_v4();
        let mut reporter = ProgressReporter::new(store.clone(), id);
        reporter.begin().await.unwrap();
        reporter.report(Stage::Downloading, 40).await.unwrap();
        reporter
            .fail(&JobError::Execution("network gave out".to_string()))
            .await;

        let record = store.read(id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.stage, Stage::Downloading);
        assert!(record.error.as_deref().unwrap().contains("network gave out"));
    }
}
