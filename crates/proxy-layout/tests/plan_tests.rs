use proxy_layout::*;

fn sfc(name: &str) -> SheetCard<String> {
    SheetCard::new(name, Some(format!("{name}.png")))
}

fn dfc(name: &str) -> SheetCard<String> {
    SheetCard::new(name, Some(format!("{name}.png"))).with_back(Some(format!("{name}_back.png")))
}

fn deck(sfcs: usize, dfcs: usize) -> Vec<SheetCard<String>> {
    let mut cards: Vec<_> = (0..sfcs).map(|i| sfc(&format!("single{i}"))).collect();
    cards.extend((0..dfcs).map(|i| dfc(&format!("double{i}"))));
    cards
}

#[test]
fn test_61_cards_make_7_pages() {
    let cards = deck(61, 0);
    let batches = plan(&cards, FormatMode::Single, None);

    assert_eq!(batches.len(), 1);
    let pages = &batches[0].pages;
    assert_eq!(pages.len(), 7);
    for page in &pages[..6] {
        assert_eq!(page.filled_slots(), 9);
    }
    assert_eq!(pages[6].filled_slots(), 7);
    assert!(pages[6].slots[7].is_none());
    assert!(pages[6].slots[8].is_none());

    let stats = calculate_statistics(&batches);
    assert_eq!(stats.cards, 61);
    assert_eq!(stats.pages, 7);
    assert_eq!(stats.blank_slots, 2);
}

#[test]
fn test_both_is_single_then_double() {
    let cards = deck(5, 7);
    let single = plan(&cards, FormatMode::Single, None);
    let double = plan(&cards, FormatMode::Double, None);
    let both = plan(&cards, FormatMode::Both, None);

    assert_eq!(both.len(), 2);
    assert_eq!(both[0], single[0]);
    assert_eq!(both[1], double[0]);
}

#[test]
fn test_double_pages_alternate_sides() {
    let cards = deck(0, 10);
    let batches = plan(&cards, FormatMode::Double, None);
    let sides: Vec<PageSide> = batches[0].pages.iter().map(|p| p.side).collect();

    assert_eq!(
        sides,
        [PageSide::Front, PageSide::Back, PageSide::Front, PageSide::Back]
    );
    // Second pair holds the tenth card; its back sits in the mirrored column
    assert_eq!(batches[0].pages[2].slots[0].as_deref(), Some("double9.png"));
    assert_eq!(
        batches[0].pages[3].slots[2].as_deref(),
        Some("double9_back.png")
    );
}

#[test]
fn test_smart_partitions_every_card_once() {
    let mut cards = deck(4, 3);
    // Interleave so the partition must preserve relative order
    cards.swap(1, 5);
    let batches = plan(&cards, FormatMode::Smart, None);

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].kind, BatchKind::Standard);
    assert_eq!(batches[1].kind, BatchKind::DoubleSided);

    let mut placed: Vec<String> = batches
        .iter()
        .flat_map(|b| b.card_names.iter().cloned())
        .collect();
    assert_eq!(placed.len(), cards.len());
    placed.sort();
    let mut expected: Vec<String> = cards.iter().map(|c| c.name.clone()).collect();
    expected.sort();
    assert_eq!(placed, expected);

    assert_eq!(
        batches[0].card_names,
        ["single0", "single2", "single3", "single1"]
    );
    assert_eq!(batches[1].card_names, ["double1", "double0", "double2"]);
}

#[test]
fn test_smart_without_single_faced_cards() {
    let batches = plan(&deck(0, 2), FormatMode::Smart, None);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].kind, BatchKind::DoubleSided);
    assert_eq!(batches[0].pages.len(), 2);
}

#[test]
fn test_missing_front_is_empty_slot() {
    let cards = vec![sfc("a"), SheetCard::new("missing", None), sfc("c")];
    let batches = plan(&cards, FormatMode::Single, None);
    let page = &batches[0].pages[0];

    assert!(page.slots[1].is_none());
    assert_eq!(page.slots[2].as_deref(), Some("c.png"));
    assert_eq!(batches[0].card_count(), 3);
}

#[test]
fn test_batch_combines_dfcs_across_decks() {
    let izzet = vec![sfc("Opt"), dfc("Delver of Secrets"), dfc("Brazen Borrower")];
    let golgari = vec![dfc("Bala Ged Recovery"), sfc("Forest"), dfc("Emeria's Call")];

    let mut combined = Vec::new();
    let mut manifest = DfcManifest::new();
    for (deck_name, cards) in [("Izzet", &izzet), ("Golgari", &golgari)] {
        for card in cards.iter().filter(|c| c.is_double_faced) {
            manifest.push(deck_name, card.name.clone());
            combined.push(card.clone());
        }
    }

    let batch = double_sided_batch(&combined, None);
    assert_eq!(batch.pages.len(), 2);
    assert_eq!(batch.pages[0].filled_slots(), 4);
    assert_eq!(batch.pages[1].filled_slots(), 4);

    assert_eq!(
        manifest.render().lines().collect::<Vec<_>>(),
        [
            "Izzet | Delver of Secrets",
            "Izzet | Brazen Borrower",
            "Golgari | Bala Ged Recovery",
            "Golgari | Emeria's Call",
        ]
    );
}

#[test]
fn test_preview_mirrors_plan() {
    let cards = deck(1, 1);
    let batches = plan(&cards, FormatMode::Smart, None);
    let preview = DeckPreview::new("Test Deck", Some("me".to_string()), &batches);

    assert_eq!(preview.batches.len(), 2);
    assert_eq!(preview.page_count(), 3);
    assert_eq!(preview.batches[0].label, "Standard");
    assert_eq!(preview.batches[1].label, "Double Sided");

    let back = &preview.batches[1].pages[1];
    assert_eq!(back.side, PageSide::Back);
    assert_eq!(back.cards.len(), 9);
    assert_eq!(back.cards[2], "double0_back.png");
    assert_eq!(back.cards[0], "");
}

#[test]
fn test_preview_json_shape() {
    let batches = plan(&deck(1, 0), FormatMode::Single, None);
    let preview = DeckPreview::new("Mono", None, &batches);
    let value: serde_json::Value = serde_json::from_str(&preview.to_json().unwrap()).unwrap();

    assert_eq!(value["name"], "Mono");
    assert_eq!(value["batches"][0]["pages"][0]["side"], "front");
    assert_eq!(value["batches"][0]["pages"][0]["cards"][0], "single0.png");
}

#[test]
fn test_statistics_double_sided_sheets() {
    let batches = plan(&deck(0, 10), FormatMode::Double, None);
    let stats = calculate_statistics(&batches);

    assert_eq!(stats.cards, 10);
    assert_eq!(stats.pages, 4);
    assert_eq!(stats.sheets, 2);
    assert_eq!(stats.filled_slots, 20);
    assert_eq!(stats.blank_slots, 16);
}
