//! Job control surface

use crate::job::{JobHandle, JobReporter};
use crate::output::find_output_file;
use crate::pipeline::{build_preview, run_generate};
use crate::types::*;
use proxy_fetch::Fetcher;
use proxy_layout::DeckPreview;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Starts generation jobs and answers status, cancel and download requests.
///
/// Cheap to clone. Every job shares one image cache and rate limiter through
/// the manager's [`Fetcher`].
#[derive(Clone)]
pub struct JobManager {
    jobs: Arc<Mutex<HashMap<JobId, JobHandle>>>,
    fetcher: Fetcher,
    output_root: PathBuf,
}

impl JobManager {
    pub fn new(fetcher: Fetcher, output_root: impl Into<PathBuf>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            fetcher,
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Plan the requested decks without downloading images or writing files
    pub async fn start_preview(&self, request: &PreviewRequest) -> Result<Vec<DeckPreview>> {
        build_preview(&self.fetcher, request).await
    }

    /// Queue a generation job and return immediately
    pub fn start_generate(&self, request: GenerateRequest) -> JobId {
        let id = JobId::new();
        let (handle, reporter) = JobHandle::spawn(id);
        self.lock_jobs().insert(id, handle);

        // Each job purges only what it downloaded itself
        let fetcher = self.fetcher.fork();
        let output_root = self.output_root.clone();
        tokio::spawn(async move {
            log::info!("Job {id} started");
            reporter.started();
            let outcome = run_generate(&fetcher, &output_root, &request, &reporter).await;
            finish(&reporter, outcome);
            log::info!("Job {id} finished");
        });

        id
    }

    pub fn get_status(&self, id: JobId) -> Option<JobSnapshot> {
        self.lock_jobs().get(&id).map(JobHandle::snapshot)
    }

    /// Request cooperative cancellation; the job stops before its next deck
    pub fn cancel(&self, id: JobId) -> Result<()> {
        let jobs = self.lock_jobs();
        let handle = jobs.get(&id).ok_or(RuntimeError::JobNotFound(id))?;
        handle.cancel();
        log::info!("Cancellation requested for job {id}");
        Ok(())
    }

    /// Wait for a job to reach a final status
    pub async fn wait(&self, id: JobId) -> Result<JobSnapshot> {
        let handle = self
            .lock_jobs()
            .get(&id)
            .cloned()
            .ok_or(RuntimeError::JobNotFound(id))?;
        Ok(handle.wait().await)
    }

    /// Read an output file by bare name, searching the whole output root
    pub async fn download(&self, filename: &str) -> Result<Vec<u8>> {
        let path = find_output_file(&self.output_root, filename).await?;
        Ok(tokio::fs::read(path).await?)
    }

    /// Drop a finished job from the table, returning its final snapshot.
    /// Running jobs stay until they finish.
    pub fn forget(&self, id: JobId) -> Result<JobSnapshot> {
        let mut jobs = self.lock_jobs();
        let snapshot = jobs
            .get(&id)
            .map(JobHandle::snapshot)
            .ok_or(RuntimeError::JobNotFound(id))?;
        if !snapshot.status.is_finished() {
            return Err(RuntimeError::JobStillRunning(id));
        }
        jobs.remove(&id);
        Ok(snapshot)
    }

    /// Drop every finished job; returns how many were removed
    pub fn forget_finished(&self) -> usize {
        let mut jobs = self.lock_jobs();
        let before = jobs.len();
        jobs.retain(|_, handle| !handle.snapshot().status.is_finished());
        before - jobs.len()
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        self.lock_jobs().keys().copied().collect()
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, JobHandle>> {
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A job fails only when it produced nothing
fn finish(reporter: &JobReporter, outcome: Result<GenerateSummary>) {
    match outcome {
        Ok(summary) if summary.cancelled => {
            reporter.message(format!(
                "Cancelled after {} deck(s), {} file(s) written",
                summary.decks_processed,
                summary.files.len()
            ));
            reporter.finish(JobStatus::Cancelled, None);
        }
        Ok(summary) if summary.statistics.pages == 0 => {
            reporter.finish(JobStatus::Failed, Some("No pages could be produced".to_string()));
        }
        Ok(summary) => {
            reporter.message(format!(
                "Done: {} page(s) across {} file(s)",
                summary.statistics.pages,
                summary.files.len()
            ));
            reporter.finish(JobStatus::Completed, None);
        }
        Err(e) => reporter.finish(JobStatus::Failed, Some(e.to_string())),
    }
}
