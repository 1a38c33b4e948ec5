use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network failure: {0}")]
    NetworkFailure(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failure: {0}")]
    ValidationFailure(String),
    #[error("Cache IO failure: {0}")]
    CacheIo(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Which printed face of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Back,
}

impl Face {
    pub fn name(self) -> &'static str {
        match self {
            Face::Front => "front",
            Face::Back => "back",
        }
    }
}

/// One decklist line, before expansion by `count`
#[derive(Debug, Clone, PartialEq)]
pub struct CardEntry {
    pub count: u32,
    pub name: String,
    pub set_code: String,
    pub collector_number: String,
    pub lang: String,
    pub scryfall_id: Option<String>,
    /// Layout hint from the deck source. `None` means unknown; the back face
    /// is requested to decide.
    pub is_double_faced: Option<bool>,
    pub front_image_id: Option<String>,
    pub back_image_id: Option<String>,
}

impl CardEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            count: 1,
            name: name.into(),
            set_code: String::new(),
            collector_number: String::new(),
            lang: "en".to_string(),
            scryfall_id: None,
            is_double_faced: None,
            front_image_id: None,
            back_image_id: None,
        }
    }

    /// Cache identity: the Scryfall id, or `set-number-lang` when there is none.
    pub fn identity(&self) -> Option<String> {
        if let Some(id) = self.scryfall_id.as_deref().filter(|id| !id.is_empty()) {
            return Some(id.to_string());
        }
        if self.set_code.is_empty() || self.collector_number.is_empty() {
            return None;
        }
        Some(format!(
            "{}-{}-{}",
            self.set_code.to_lowercase(),
            self.collector_number,
            self.lang
        ))
    }

    /// External image identifier for a face
    pub fn image_id(&self, face: Face) -> Option<&str> {
        let specific = match face {
            Face::Front => self.front_image_id.as_deref(),
            Face::Back => self.back_image_id.as_deref(),
        };
        specific
            .or(self.scryfall_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn image_key(&self, face: Face) -> Option<ImageKey> {
        self.identity().map(|identity| ImageKey::new(identity, face))
    }
}

/// Cache key for one face of one card printing
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageKey {
    pub identity: String,
    pub back: bool,
}

impl ImageKey {
    pub fn new(identity: impl Into<String>, face: Face) -> Self {
        Self {
            identity: identity.into(),
            back: face == Face::Back,
        }
    }

    pub fn face(&self) -> Face {
        if self.back { Face::Back } else { Face::Front }
    }

    /// File name inside the cache directory
    pub fn file_name(&self) -> String {
        let safe: String = self
            .identity
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .take(100)
            .collect();
        let suffix = if self.back { "_back" } else { "" };
        format!("{safe}{suffix}.png")
    }
}

/// A parsed deck from any source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Deck {
    pub name: Option<String>,
    pub author: Option<String>,
    pub cards: Vec<CardEntry>,
    /// Recoverable problems found while reading the source
    pub warnings: Vec<String>,
}

impl Deck {
    /// Number of physical cards after expanding counts
    pub fn card_count(&self) -> usize {
        self.cards.iter().map(|c| c.count as usize).sum()
    }

    /// Cards ordered by name, case-insensitive
    pub fn sort_by_name(&mut self) {
        self.cards.sort_by_key(|c| c.name.to_lowercase());
    }
}

/// Result of fetching one face
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Served from the cache without network access
    Cached(PathBuf),
    /// Downloaded during this run
    Fetched(PathBuf),
    /// The face does not exist upstream (e.g. a single-faced card's back)
    Absent,
    /// Retries exhausted; rendered as an empty slot
    Missing(String),
}

impl FetchOutcome {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            FetchOutcome::Cached(p) | FetchOutcome::Fetched(p) => Some(p),
            FetchOutcome::Absent | FetchOutcome::Missing(_) => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            FetchOutcome::Cached(p) | FetchOutcome::Fetched(p) => Some(p),
            FetchOutcome::Absent | FetchOutcome::Missing(_) => None,
        }
    }
}

/// A decklist entry with its images resolved to cache paths
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCard {
    pub entry: CardEntry,
    pub front: Option<PathBuf>,
    pub back: Option<PathBuf>,
    pub is_double_faced: bool,
}
