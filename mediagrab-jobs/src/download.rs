//! Job execution.
//!
//! [`DownloadExecutor`] turns one dequeued descriptor into an artifact on
//! disk and a terminal metadata record, publishing progress along the way.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use mediagrab_queue::{
    JobDescriptor, JobQueue, JobStatus, OutputKind, Stage, DEFAULT_AUDIO_BITRATE,
};
use mediagrab_store::{MetaStore, ResultRecord};

use crate::artifact::{sanitize_title, select_artifact};
use crate::engine::{FetchSpec, MediaEngine};
use crate::error::JobError;
use crate::progress::{self, map_event, ProgressReporter};

pub struct DownloadExecutor {
    store: MetaStore,
    queue: Arc<dyn JobQueue>,
    engine: Arc<dyn MediaEngine>,
    storage_root: PathBuf,
}

impl DownloadExecutor {
    pub fn new(
        store: MetaStore,
        queue: Arc<dyn JobQueue>,
        engine: Arc<dyn MediaEngine>,
        storage_root: PathBuf,
    ) -> Self {
        Self {
            store,
            queue,
            engine,
            storage_root,
        }
    }

    /// Run one job to a terminal state. Errors are absorbed into the job's
    /// failure record; the worker loop never sees them.
    pub async fn execute(&self, descriptor: JobDescriptor) {
        let job_id = descriptor.id;
        let mut reporter = ProgressReporter::new(self.store.clone(), job_id);
        info!(%job_id, url = %descriptor.source_url, "job started");

        match self.run(&descriptor, &mut reporter).await {
            Ok(result) => {
                if let Err(err) = reporter.finish(&result).await {
                    error!(%job_id, error = %err, "failed to publish finished record");
                }
                if let Err(err) = self.queue.mark_status(job_id, JobStatus::Finished, None).await {
                    error!(%job_id, error = %err, "failed to mark queue status");
                }
                info!(%job_id, file = %result.file_name, "job finished");
            }
            Err(err) => {
                error!(%job_id, error = %err, "job failed");
                reporter.fail(&err).await;
                if let Err(mark_err) = self
                    .queue
                    .mark_status(job_id, JobStatus::Failed, Some(err.to_string()))
                    .await
                {
                    error!(%job_id, error = %mark_err, "failed to mark queue status");
                }
            }
        }
    }

    async fn run(
        &self,
        descriptor: &JobDescriptor,
        reporter: &mut ProgressReporter,
    ) -> Result<ResultRecord, JobError> {
        reporter.begin().await?;
        self.queue
            .mark_status(descriptor.id, JobStatus::Running, None)
            .await
            .map_err(|err| JobError::Execution(err.to_string()))?;

        self.engine.resolve_tools().await?;

        let work_dir = descriptor.work_dir(&self.storage_root);
        tokio::fs::create_dir_all(&work_dir).await?;

        let bitrate = descriptor.bitrate.unwrap_or(DEFAULT_AUDIO_BITRATE);
        let spec = FetchSpec {
            job_id: descriptor.id,
            source_url: descriptor.source_url.clone(),
            output_kind: descriptor.output_kind,
            quality: descriptor.quality.clone(),
            bitrate,
            work_dir: work_dir.clone(),
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Arc::clone(&self.engine);
        let fetch_spec = spec.clone();
        let fetch = tokio::spawn(async move { engine.fetch(fetch_spec, tx).await });

        while let Some(event) = rx.recv().await {
            let (stage, pct) = map_event(&event);
            reporter.report(stage, pct).await?;
        }

        fetch
            .await
            .map_err(|_| JobError::Execution("engine task panicked".to_string()))??;

        reporter
            .report(Stage::Finalizing, progress::FINALIZING_CHECKPOINT)
            .await?;

        let artifact = match descriptor.output_kind {
            OutputKind::Video => select_artifact(&work_dir, Some("mp4")).await?,
            OutputKind::Audio => {
                let fetched = select_artifact(&work_dir, None).await?;
                let already_mp3 = fetched
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("mp3"))
                    .unwrap_or(false);
                if already_mp3 {
                    fetched
                } else {
                    let stem = fetched
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| descriptor.id.to_string());
                    let output = work_dir.join(format!("{}.mp3", sanitize_title(&stem)));
                    // Spawned like the fetch above, so an engine panic
                    // surfaces as a failed job instead of unwinding through
                    // the worker loop.
                    let engine = Arc::clone(&self.engine);
                    let (source, target) = (fetched.clone(), output.clone());
                    let transcode = tokio::spawn(async move {
                        engine.transcode_audio(&source, &target, bitrate).await
                    });
                    transcode
                        .await
                        .map_err(|_| {
                            JobError::Execution("engine task panicked".to_string())
                        })??;
                    output
                }
            }
        };

        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| JobError::Execution("artifact has no file name".to_string()))?;
        let file_path = tokio::fs::canonicalize(&artifact)
            .await
            .unwrap_or(artifact)
            .to_string_lossy()
            .into_owned();

        Ok(ResultRecord {
            file_name,
            file_path,
            download_url: ResultRecord::download_url_for(descriptor.id),
        })
    }
}
