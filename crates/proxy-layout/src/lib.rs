pub mod constants;
mod geometry;
mod manifest;
mod options;
mod plan;
mod preview;
mod stats;
mod types;

pub use geometry::{CutLine, LayoutGeometry, LineOrientation, mirrored_col};
pub use manifest::DfcManifest;
pub use options::*;
pub use plan::{double_sided_batch, expand_counts, plan, standard_batch};
pub use preview::{DeckPreview, PreviewBatch, PreviewPage};
pub use stats::{PlanStatistics, calculate_statistics};
pub use types::*;
