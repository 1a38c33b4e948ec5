use crate::types::{CardEntry, Deck, FetchError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One row of `count,name,set_code,collector_number,lang,scryfall_id`
#[derive(Debug, Deserialize)]
struct CsvRow {
    count: String,
    name: String,
    #[serde(default)]
    set_code: String,
    #[serde(default)]
    collector_number: String,
    #[serde(default)]
    lang: String,
    #[serde(default)]
    scryfall_id: String,
}

impl CsvRow {
    fn into_entry(self) -> std::result::Result<CardEntry, String> {
        let name = self.name.trim().trim_matches('"').to_string();
        if name.is_empty() {
            return Err("missing card name".to_string());
        }
        let count: u32 = self
            .count
            .trim()
            .parse()
            .map_err(|_| format!("invalid count '{}' for {name}", self.count))?;
        if count == 0 {
            return Err(format!("count of 0 for {name}"));
        }

        let mut entry = CardEntry::new(name);
        entry.count = count;
        entry.set_code = self.set_code.trim().to_lowercase();
        entry.collector_number = self.collector_number.trim().to_string();
        let lang = self.lang.trim();
        if !lang.is_empty() {
            entry.lang = lang.to_string();
        }
        let id = self.scryfall_id.trim();
        if !id.is_empty() {
            entry.scryfall_id = Some(id.to_string());
        }
        Ok(entry)
    }
}

/// Parse CSV text. Malformed rows are skipped and reported in
/// `Deck::warnings`; a missing header is an error.
pub fn parse_csv(contents: &str) -> Result<Deck> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let headers = reader.headers()?.clone();
    for required in ["count", "name"] {
        if !headers.iter().any(|h| h == required) {
            return Err(FetchError::ValidationFailure(format!(
                "CSV header is missing '{required}' column"
            )));
        }
    }

    let mut deck = Deck {
        name: None,
        author: None,
        ..Default::default()
    };
    for (i, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1
        let line = i + 2;
        match result.map_err(|e| e.to_string()).and_then(CsvRow::into_entry) {
            Ok(entry) => deck.cards.push(entry),
            Err(reason) => {
                let warning = format!("Skipping CSV line {line}: {reason}");
                log::warn!("{warning}");
                deck.warnings.push(warning);
            }
        }
    }

    Ok(deck)
}

pub async fn load_from_csv(path: impl AsRef<Path>) -> Result<Deck> {
    let path = path.as_ref().to_owned();

    let contents = tokio::fs::read_to_string(&path).await?;

    let deck = tokio::task::spawn_blocking(move || parse_csv(&contents)).await??;

    Ok(deck)
}

/// Aggregated `deck_list.csv` snapshot, sorted by card name
pub fn write_deck_list(cards: &[CardEntry]) -> Result<Vec<u8>> {
    type Key = (String, String, String, String, String);

    let mut counts: BTreeMap<Key, u32> = BTreeMap::new();
    let mut order: Vec<Key> = Vec::new();
    for card in cards {
        let key = (
            card.scryfall_id.clone().unwrap_or_default(),
            card.lang.clone(),
            card.name.clone(),
            card.set_code.clone(),
            card.collector_number.clone(),
        );
        let count = counts.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            0
        });
        *count += card.count;
    }
    order.sort_by_key(|(_, _, name, _, _)| name.to_lowercase());

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "scryfall_id",
        "count",
        "lang",
        "name",
        "set_code",
        "collector_number",
    ])?;
    for key in &order {
        let (scryfall_id, lang, name, set_code, collector_number) = key;
        let count = counts[key].to_string();
        writer.write_record([
            scryfall_id.as_str(),
            count.as_str(),
            lang.as_str(),
            name.as_str(),
            set_code.as_str(),
            collector_number.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| FetchError::Io(e.into_error()))
}

pub async fn save_deck_list(cards: &[CardEntry], path: impl AsRef<Path>) -> Result<()> {
    let bytes = write_deck_list(cards)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "count,name,set_code,collector_number,lang,scryfall_id\n";

    #[test]
    fn test_parse_rows() {
        let text = format!(
            "{HEADER}4,Lightning Bolt,M10,146,en,abc\n1,\"Delver of Secrets\",ISD,51,en,def\n"
        );
        let deck = parse_csv(&text).unwrap();

        assert_eq!(deck.cards.len(), 2);
        assert_eq!(deck.cards[0].count, 4);
        assert_eq!(deck.cards[0].set_code, "m10");
        assert_eq!(deck.cards[1].name, "Delver of Secrets");
        assert_eq!(deck.cards[1].scryfall_id.as_deref(), Some("def"));
        assert_eq!(deck.card_count(), 5);
        assert!(deck.warnings.is_empty());
    }

    #[test]
    fn test_malformed_rows_skipped_with_warning() {
        let text = format!("{HEADER}x,Bad Count,m10,1,en,\n2,,m10,2,en,\n3,Island,neo,293,en,\n");
        let deck = parse_csv(&text).unwrap();

        assert_eq!(deck.cards.len(), 1);
        assert_eq!(deck.cards[0].name, "Island");
        assert_eq!(deck.warnings.len(), 2);
        assert!(deck.warnings[0].contains("line 2"));
    }

    #[test]
    fn test_missing_header_column() {
        let result = parse_csv("quantity,title\n1,Island\n");
        assert!(matches!(result, Err(FetchError::ValidationFailure(_))));
    }

    #[test]
    fn test_empty_scryfall_id_is_none() {
        let text = format!("{HEADER}1,Island,neo,293,,\n");
        let deck = parse_csv(&text).unwrap();
        assert_eq!(deck.cards[0].scryfall_id, None);
        assert_eq!(deck.cards[0].lang, "en");
        assert_eq!(deck.cards[0].identity().as_deref(), Some("neo-293-en"));
    }

    #[test]
    fn test_deck_list_aggregates_and_sorts() {
        let mut bolt = CardEntry::new("Lightning Bolt");
        bolt.scryfall_id = Some("abc".to_string());
        bolt.count = 2;
        let mut island = CardEntry::new("island");
        island.count = 1;

        let bytes = write_deck_list(&[bolt.clone(), island, bolt]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "scryfall_id,count,lang,name,set_code,collector_number");
        assert_eq!(lines[1], ",1,en,island,,");
        assert_eq!(lines[2], "abc,4,en,Lightning Bolt,,");
        assert_eq!(lines.len(), 3);
    }
}
