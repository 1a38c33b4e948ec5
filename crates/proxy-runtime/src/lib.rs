mod job;
mod manager;
pub mod output;
mod pipeline;
mod types;

pub use job::{JobHandle, JobReporter, JobUpdate};
pub use manager::JobManager;
pub use pipeline::{build_preview, footer_title, run_generate};
pub use types::*;

// Re-export types from library crates
pub use proxy_fetch::deck::{BoardFilter, DeckSource};
pub use proxy_fetch::{FetchOptions, Fetcher};
pub use proxy_layout::{DeckPreview, FormatMode, PaperSize, PlanStatistics, SheetOptions};
