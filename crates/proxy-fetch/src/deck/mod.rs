//! Decklist sources
//!
//! An input line is either a deck-service URL or a path to a CSV export,
//! optionally followed by `|custom name`. Multi-line input is a batch.

mod archidekt;
mod csv_file;

pub use archidekt::{ArchidektDeck, deck_id_from_url, fetch_archidekt_deck, parse_archidekt_json};
pub use csv_file::{load_from_csv, parse_csv, save_deck_list, write_deck_list};

use crate::transport::Transport;
use crate::types::{Deck, FetchError, Result};
use std::path::{Path, PathBuf};

/// Which board categories to keep from a deck service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardFilter {
    pub include_sideboard: bool,
    pub include_maybeboard: bool,
}

/// Where a deck comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckSource {
    Archidekt {
        deck_id: String,
        custom_name: Option<String>,
    },
    Csv {
        path: PathBuf,
        custom_name: Option<String>,
    },
}

impl DeckSource {
    /// Parse one input line. Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> Option<Result<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (target, custom_name) = match line.split_once('|') {
            Some((target, name)) => {
                let name = name.trim();
                (target.trim(), (!name.is_empty()).then(|| name.to_string()))
            }
            None => (line, None),
        };

        if target.starts_with("http") {
            Some(
                deck_id_from_url(target)
                    .map(|deck_id| DeckSource::Archidekt {
                        deck_id,
                        custom_name,
                    })
                    .ok_or_else(|| {
                        FetchError::ValidationFailure(format!("Invalid Archidekt URL: {target}"))
                    }),
            )
        } else {
            Some(Ok(DeckSource::Csv {
                path: PathBuf::from(target),
                custom_name,
            }))
        }
    }

    pub fn custom_name(&self) -> Option<&str> {
        match self {
            DeckSource::Archidekt { custom_name, .. } | DeckSource::Csv { custom_name, .. } => {
                custom_name.as_deref()
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DeckSource::Archidekt { deck_id, .. } => format!("Archidekt deck {deck_id}"),
            DeckSource::Csv { path, .. } => format!("CSV {}", path.display()),
        }
    }
}

/// Parse every line of a (possibly multi-line) input string
pub fn parse_sources(input: &str) -> Vec<Result<DeckSource>> {
    input.lines().filter_map(DeckSource::parse_line).collect()
}

/// Read a batch file: one `url[|custom name]` per line, `#` comments
pub async fn load_batch_file(path: impl AsRef<Path>) -> Result<Vec<Result<DeckSource>>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(parse_sources(&contents))
}

/// Load a deck from its source. The custom name, if any, replaces the
/// source's own name.
pub async fn load_deck(
    source: &DeckSource,
    transport: &dyn Transport,
    filter: BoardFilter,
) -> Result<Deck> {
    let mut deck = match source {
        DeckSource::Archidekt { deck_id, .. } => {
            fetch_archidekt_deck(transport, deck_id, filter).await?
        }
        DeckSource::Csv { path, .. } => {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(FetchError::NotFound(format!(
                    "CSV file not found: {}",
                    path.display()
                )));
            }
            load_from_csv(path).await?
        }
    };

    if let Some(name) = source.custom_name() {
        deck.name = Some(name.to_string());
    }
    deck.sort_by_name();
    log::info!("Found {} cards for {}.", deck.card_count(), source.describe());
    Ok(deck)
}
