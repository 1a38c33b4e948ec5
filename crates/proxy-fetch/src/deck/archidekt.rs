//! Archidekt deck API client

use super::BoardFilter;
use crate::transport::{Transport, TransportError};
use crate::types::{CardEntry, Deck, FetchError, Result};
use serde::Deserialize;

const ARCHIDEKT_API: &str = "https://archidekt.com/api/decks";

/// Scryfall layouts printed on two physical faces
const DOUBLE_FACED_LAYOUTS: &[&str] = &[
    "transform",
    "modal_dfc",
    "double_faced_token",
    "reversible_card",
];

#[derive(Debug, Deserialize)]
pub struct ArchidektDeck {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner: Option<ArchidektOwner>,
    pub cards: Vec<ArchidektEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ArchidektOwner {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArchidektEntry {
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub card: ArchidektCard,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchidektCard {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub collector_number: Option<String>,
    #[serde(default)]
    pub edition: ArchidektEdition,
    #[serde(default)]
    pub oracle_card: ArchidektOracle,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArchidektEdition {
    #[serde(default)]
    pub editioncode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArchidektOracle {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
}

fn one() -> u32 {
    1
}

/// Extract the numeric deck id from a `.../decks/<id>/...` URL
pub fn deck_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/decks/")?;
    let id: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    (!id.is_empty()).then_some(id)
}

/// Convert an API response into a deck. Entries without a name and boards
/// excluded by `filter` are dropped.
pub fn parse_archidekt_json(bytes: &[u8], filter: BoardFilter) -> Result<Deck> {
    let data: ArchidektDeck = serde_json::from_slice(bytes)
        .map_err(|e| FetchError::ValidationFailure(format!("Unexpected API response: {e}")))?;

    let mut deck = Deck {
        name: data.name.filter(|n| !n.is_empty()),
        author: data.owner.and_then(|o| o.username),
        ..Default::default()
    };

    for entry in data.cards {
        let categories = entry.categories.unwrap_or_default();
        let in_category = |name: &str| categories.iter().any(|c| c == name);
        if in_category("Maybeboard") && !filter.include_maybeboard {
            continue;
        }
        if in_category("Sideboard") && !filter.include_sideboard {
            continue;
        }

        let card = entry.card;
        let Some(name) = card.oracle_card.name.filter(|n| !n.is_empty()) else {
            continue;
        };
        if entry.quantity == 0 {
            continue;
        }

        let mut parsed = CardEntry::new(name);
        parsed.count = entry.quantity;
        parsed.set_code = card.edition.editioncode.unwrap_or_default().to_lowercase();
        parsed.collector_number = card.collector_number.unwrap_or_default();
        if let Some(lang) = card.oracle_card.lang.filter(|l| !l.is_empty()) {
            parsed.lang = lang;
        }
        parsed.scryfall_id = card.uid.filter(|id| !id.is_empty());
        parsed.is_double_faced = card
            .oracle_card
            .layout
            .as_deref()
            .filter(|layout| DOUBLE_FACED_LAYOUTS.contains(layout))
            .map(|_| true);
        deck.cards.push(parsed);
    }

    if deck.cards.is_empty() {
        deck.warnings.push("No cards found in deck".to_string());
    }
    Ok(deck)
}

pub async fn fetch_archidekt_deck(
    transport: &dyn Transport,
    deck_id: &str,
    filter: BoardFilter,
) -> Result<Deck> {
    log::info!("Fetching deck {deck_id} from Archidekt...");
    let url = format!("{ARCHIDEKT_API}/{deck_id}/");

    let bytes = transport.get(&url).await.map_err(|e| match e {
        TransportError::NotFound(status) => {
            FetchError::NotFound(format!("Deck {deck_id} (status {status})"))
        }
        other => FetchError::NetworkFailure(format!("Failed to fetch deck {deck_id}: {other}")),
    })?;

    let mut deck = parse_archidekt_json(&bytes, filter)?;
    if deck.name.is_none() {
        deck.name = Some(format!("Deck_{deck_id}"));
    }
    Ok(deck)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "Izzet Spells",
        "owner": {"username": "planeswalker"},
        "cards": [
            {"quantity": 4, "categories": ["Instant"],
             "card": {"uid": "bolt-id", "collectorNumber": "146",
                      "edition": {"editioncode": "M10"},
                      "oracleCard": {"name": "Lightning Bolt", "layout": "normal"}}},
            {"quantity": 2, "categories": null,
             "card": {"uid": "delver-id", "collectorNumber": "51",
                      "edition": {"editioncode": "ISD"},
                      "oracleCard": {"name": "Delver of Secrets", "layout": "transform"}}},
            {"quantity": 1, "categories": ["Sideboard"],
             "card": {"uid": "side-id", "oracleCard": {"name": "Negate"}}},
            {"quantity": 1, "categories": ["Maybeboard"],
             "card": {"uid": "maybe-id", "oracleCard": {"name": "Opt"}}},
            {"quantity": 1, "card": {"uid": "nameless"}}
        ]
    }"#;

    #[test]
    fn test_deck_id_from_url() {
        assert_eq!(
            deck_id_from_url("https://archidekt.com/decks/987/izzet").as_deref(),
            Some("987")
        );
        assert_eq!(deck_id_from_url("https://archidekt.com/decks/"), None);
        assert_eq!(deck_id_from_url("https://example.com/"), None);
    }

    #[test]
    fn test_parse_default_filter() {
        let deck = parse_archidekt_json(SAMPLE.as_bytes(), BoardFilter::default()).unwrap();

        assert_eq!(deck.name.as_deref(), Some("Izzet Spells"));
        assert_eq!(deck.author.as_deref(), Some("planeswalker"));
        assert_eq!(deck.cards.len(), 2);
        assert_eq!(deck.card_count(), 6);

        let bolt = &deck.cards[0];
        assert_eq!(bolt.set_code, "m10");
        assert_eq!(bolt.scryfall_id.as_deref(), Some("bolt-id"));
        assert_eq!(bolt.is_double_faced, None);

        let delver = &deck.cards[1];
        assert_eq!(delver.is_double_faced, Some(true));
    }

    #[test]
    fn test_parse_with_boards() {
        let filter = BoardFilter {
            include_sideboard: true,
            include_maybeboard: true,
        };
        let deck = parse_archidekt_json(SAMPLE.as_bytes(), filter).unwrap();
        let names: Vec<_> = deck.cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Lightning Bolt", "Delver of Secrets", "Negate", "Opt"]);
    }

    #[test]
    fn test_parse_unexpected_response() {
        let result = parse_archidekt_json(br#"{"detail": "Not found."}"#, BoardFilter::default());
        assert!(matches!(result, Err(FetchError::ValidationFailure(_))));
    }
}
