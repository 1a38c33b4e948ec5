use proxy_fetch::FetchError;
use proxy_fetch::deck::{BoardFilter, DeckSource, parse_sources};
use proxy_layout::{FormatMode, LayoutError, PlanStatistics, SheetOptions};
use proxy_pdf::PdfError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Pdf(#[from] PdfError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Job not found: {0}")]
    JobNotFound(JobId),
    #[error("Job still running: {0}")]
    JobStillRunning(JobId),
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
    #[error("No decks to process")]
    NoDecks,
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Handle to a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(JobId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Read-only view of a job for pollers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    /// 0..=100, never decreases
    pub progress: u8,
    pub messages: Vec<String>,
    pub files: Vec<PathBuf>,
    pub error: Option<String>,
}

impl JobSnapshot {
    /// Output file names, as accepted by `JobManager::download`
    pub fn file_names(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|f| f.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }
}

/// Parameters for a PDF generation job
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub sources: Vec<DeckSource>,
    /// Batch runs write under a timestamped `Batch_*` folder and, in smart
    /// mode, combine every deck's double-faced cards into one document
    pub batch: bool,
    pub sheet: SheetOptions,
    pub boards: BoardFilter,
    pub default_back: Option<PathBuf>,
    /// Delete images downloaded by this job once it finishes
    pub purge_new: bool,
}

impl GenerateRequest {
    pub fn new(sources: Vec<DeckSource>) -> Self {
        Self {
            batch: sources.len() > 1,
            sources,
            sheet: SheetOptions::default(),
            boards: BoardFilter::default(),
            default_back: None,
            purge_new: false,
        }
    }

    /// Parse free-form input: one source per line, several lines make a batch
    pub fn from_input(input: &str) -> Result<Self> {
        let sources = parse_sources(input)
            .into_iter()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if sources.is_empty() {
            return Err(RuntimeError::NoDecks);
        }
        Ok(Self::new(sources))
    }

    pub fn format(&self) -> FormatMode {
        self.sheet.format
    }
}

/// Parameters for a preview; nothing is downloaded or written
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub sources: Vec<DeckSource>,
    pub format: FormatMode,
    pub boards: BoardFilter,
}

impl PreviewRequest {
    pub fn from_input(input: &str, format: FormatMode) -> Result<Self> {
        let request = GenerateRequest::from_input(input)?;
        Ok(Self {
            sources: request.sources,
            format,
            boards: BoardFilter::default(),
        })
    }
}

/// What a finished generation produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateSummary {
    pub files: Vec<PathBuf>,
    pub statistics: PlanStatistics,
    pub decks_processed: usize,
    pub cancelled: bool,
}
