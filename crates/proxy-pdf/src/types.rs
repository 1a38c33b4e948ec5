use image::RgbImage;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("Layout error: {0}")]
    Layout(#[from] proxy_layout::LayoutError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("No pages to render")]
    NoPages,
}

pub type Result<T> = std::result::Result<T, PdfError>;

/// An image placed in a card slot
#[derive(Debug, Clone)]
pub enum CardImage {
    /// Decoded lazily from disk (cache entries)
    File(PathBuf),
    /// Already decoded, e.g. the resized default back
    Decoded { key: String, image: Arc<RgbImage> },
}

impl CardImage {
    /// Identity used to embed each distinct image once per document
    pub fn key(&self) -> String {
        match self {
            CardImage::File(path) => path.display().to_string(),
            CardImage::Decoded { key, .. } => format!("decoded:{key}"),
        }
    }
}

impl From<PathBuf> for CardImage {
    fn from(path: PathBuf) -> Self {
        CardImage::File(path)
    }
}
