//! Per-job state
//!
//! The pipeline never touches job state directly: it sends [`JobUpdate`]s
//! through a [`JobReporter`], and a collector task applies them in order.
//! Pollers only ever see cloned snapshots.

use crate::types::{JobId, JobSnapshot, JobStatus};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

/// Updates sent from the pipeline to the job record
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    Started,
    Progress(u8),
    Message(String),
    FileWritten(PathBuf),
    Finished {
        status: JobStatus,
        error: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct JobState {
    status: JobStatus,
    progress: u8,
    messages: Vec<String>,
    files: Vec<PathBuf>,
    error: Option<String>,
}

impl JobState {
    fn new() -> Self {
        Self {
            status: JobStatus::Queued,
            progress: 0,
            messages: Vec::new(),
            files: Vec::new(),
            error: None,
        }
    }

    fn apply(&mut self, update: JobUpdate) {
        // A finished job is frozen
        if self.status.is_finished() {
            return;
        }
        match update {
            JobUpdate::Started => self.status = JobStatus::Running,
            JobUpdate::Progress(value) => {
                // Only completion reaches 100
                self.progress = self.progress.max(value.min(99));
            }
            JobUpdate::Message(message) => self.messages.push(message),
            JobUpdate::FileWritten(path) => self.files.push(path),
            JobUpdate::Finished { status, error } => {
                if status == JobStatus::Completed {
                    self.progress = 100;
                }
                self.status = status;
                self.error = error;
            }
        }
    }
}

/// Shared handle to one job's state
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    state: Arc<Mutex<JobState>>,
    cancel: Arc<AtomicBool>,
    finished: watch::Receiver<bool>,
}

impl JobHandle {
    /// Create a job and the reporter its pipeline writes to.
    ///
    /// Must be called inside a tokio runtime: a collector task is spawned
    /// to apply updates.
    pub fn spawn(id: JobId) -> (Self, JobReporter) {
        let state = Arc::new(Mutex::new(JobState::new()));
        let cancel = Arc::new(AtomicBool::new(false));
        let (update_tx, mut update_rx) = mpsc::unbounded_channel::<JobUpdate>();
        let (finished_tx, finished_rx) = watch::channel(false);

        let collector_state = state.clone();
        tokio::spawn(async move {
            while let Some(update) = update_rx.recv().await {
                let mut state = lock(&collector_state);
                state.apply(update);
                if state.status.is_finished() {
                    let _ = finished_tx.send(true);
                }
            }
            // The pipeline went away without finishing (panic or abort)
            let mut state = lock(&collector_state);
            if !state.status.is_finished() {
                state.apply(JobUpdate::Finished {
                    status: JobStatus::Failed,
                    error: Some("Job stopped unexpectedly".to_string()),
                });
            }
            let _ = finished_tx.send(true);
        });

        let handle = Self {
            id,
            state,
            cancel: cancel.clone(),
            finished: finished_rx,
        };
        let reporter = JobReporter {
            tx: update_tx,
            cancel,
        };
        (handle, reporter)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = lock(&self.state);
        JobSnapshot {
            id: self.id,
            status: state.status,
            progress: state.progress,
            messages: state.messages.clone(),
            files: state.files.clone(),
            error: state.error.clone(),
        }
    }

    /// Ask the pipeline to stop at the next deck boundary
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Wait until the job reaches a final status
    pub async fn wait(&self) -> JobSnapshot {
        let mut finished = self.finished.clone();
        let _ = finished.wait_for(|done| *done).await;
        self.snapshot()
    }
}

fn lock(state: &Mutex<JobState>) -> std::sync::MutexGuard<'_, JobState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The pipeline's write side of a job
#[derive(Debug, Clone)]
pub struct JobReporter {
    tx: mpsc::UnboundedSender<JobUpdate>,
    cancel: Arc<AtomicBool>,
}

impl JobReporter {
    /// A reporter not attached to any job; updates are only logged
    pub fn detached() -> Self {
        let (tx, _) = mpsc::unbounded_channel();
        Self {
            tx,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    fn send(&self, update: JobUpdate) {
        // The job record may already be gone; nothing to do then
        let _ = self.tx.send(update);
    }

    pub fn started(&self) {
        self.send(JobUpdate::Started);
    }

    /// Log a message and append it to the job's message list
    pub fn message(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        self.send(JobUpdate::Message(message));
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.send(JobUpdate::Message(message));
    }

    /// Append to the message list only; for text already logged elsewhere
    pub fn note(&self, message: impl Into<String>) {
        self.send(JobUpdate::Message(message.into()));
    }

    /// Report overall progress as a fraction in `0.0..=1.0`
    pub fn progress(&self, fraction: f32) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).floor() as u8;
        self.send(JobUpdate::Progress(percent));
    }

    pub fn file_written(&self, path: PathBuf) {
        self.send(JobUpdate::FileWritten(path));
    }

    pub fn finish(&self, status: JobStatus, error: Option<String>) {
        if let Some(error) = &error {
            log::error!("{error}");
        }
        self.send(JobUpdate::Finished { status, error });
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let mut state = JobState::new();
        state.apply(JobUpdate::Progress(40));
        state.apply(JobUpdate::Progress(20));
        assert_eq!(state.progress, 40);

        state.apply(JobUpdate::Progress(100));
        assert_eq!(state.progress, 99);

        state.apply(JobUpdate::Finished {
            status: JobStatus::Completed,
            error: None,
        });
        assert_eq!(state.progress, 100);
    }

    #[test]
    fn test_finished_job_is_frozen() {
        let mut state = JobState::new();
        state.apply(JobUpdate::Finished {
            status: JobStatus::Cancelled,
            error: None,
        });
        state.apply(JobUpdate::Message("late".to_string()));
        state.apply(JobUpdate::Started);

        assert_eq!(state.status, JobStatus::Cancelled);
        assert!(state.messages.is_empty());
    }

    #[tokio::test]
    async fn test_handle_collects_updates() {
        let (handle, reporter) = JobHandle::spawn(JobId::new());
        assert_eq!(handle.snapshot().status, JobStatus::Queued);

        reporter.started();
        reporter.message("Fetching deck");
        reporter.progress(0.5);
        reporter.file_written(PathBuf::from("out/Deck_Standard.pdf"));
        reporter.finish(JobStatus::Completed, None);

        let snapshot = handle.wait().await;
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.messages, ["Fetching deck"]);
        assert_eq!(snapshot.file_names(), ["Deck_Standard.pdf"]);
    }

    #[tokio::test]
    async fn test_dropped_reporter_fails_job() {
        let (handle, reporter) = JobHandle::spawn(JobId::new());
        reporter.started();
        drop(reporter);

        let snapshot = handle.wait().await;
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert!(snapshot.error.is_some());
    }

    #[test]
    fn test_cancel_flag_reaches_reporter() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let reporter = JobReporter {
            tx,
            cancel: cancel.clone(),
        };
        assert!(!reporter.is_cancelled());
        cancel.store(true, Ordering::SeqCst);
        assert!(reporter.is_cancelled());
    }
}
