//! Batch and page planning
//!
//! Cards fill pages left-to-right, top-to-bottom in the order given. A
//! batch's last page may be partly empty; the next batch always starts on a
//! fresh page.

use crate::constants::{GRID_COLS, SLOTS_PER_PAGE};
use crate::geometry::mirrored_col;
use crate::types::*;

/// Split `cards` into batches for `mode`.
///
/// `default_back` fills the back slot of any card without its own back
/// image in double-sided batches. Batches with no cards are omitted.
pub fn plan<R: Clone>(
    cards: &[SheetCard<R>],
    mode: FormatMode,
    default_back: Option<&R>,
) -> Vec<DeckBatch<R>> {
    let batches = match mode {
        FormatMode::Single => vec![standard_batch(cards)],
        FormatMode::Double => vec![double_sided_batch(cards, default_back)],
        FormatMode::Both => vec![
            standard_batch(cards),
            double_sided_batch(cards, default_back),
        ],
        FormatMode::Smart => {
            let (double_faced, single_faced): (Vec<_>, Vec<_>) =
                cards.iter().cloned().partition(|c| c.is_double_faced);
            vec![
                standard_batch(&single_faced),
                double_sided_batch(&double_faced, default_back),
            ]
        }
    };

    batches
        .into_iter()
        .filter(|batch| !batch.pages.is_empty())
        .collect()
}

/// Front pages only
pub fn standard_batch<R: Clone>(cards: &[SheetCard<R>]) -> DeckBatch<R> {
    let pages = cards.chunks(SLOTS_PER_PAGE).map(front_page).collect();

    DeckBatch {
        kind: BatchKind::Standard,
        label: BatchKind::Standard.label().to_string(),
        card_names: names(cards),
        pages,
    }
}

/// Each front page is followed by a page holding the same cards' backs,
/// columns mirrored
pub fn double_sided_batch<R: Clone>(
    cards: &[SheetCard<R>],
    default_back: Option<&R>,
) -> DeckBatch<R> {
    let mut pages = Vec::with_capacity(cards.len().div_ceil(SLOTS_PER_PAGE) * 2);
    for chunk in cards.chunks(SLOTS_PER_PAGE) {
        pages.push(front_page(chunk));
        pages.push(back_page(chunk, default_back));
    }

    DeckBatch {
        kind: BatchKind::DoubleSided,
        label: BatchKind::DoubleSided.label().to_string(),
        card_names: names(cards),
        pages,
    }
}

fn front_page<R: Clone>(chunk: &[SheetCard<R>]) -> Page<R> {
    let mut page = Page::empty(PageSide::Front);
    for (slot, card) in page.slots.iter_mut().zip(chunk) {
        *slot = card.front.clone();
    }
    page
}

fn back_page<R: Clone>(chunk: &[SheetCard<R>], default_back: Option<&R>) -> Page<R> {
    let mut page = Page::empty(PageSide::Back);
    for (index, card) in chunk.iter().enumerate() {
        let row = index / GRID_COLS;
        let col = mirrored_col(index % GRID_COLS);
        page.slots[row * GRID_COLS + col] = card.back.clone().or_else(|| default_back.cloned());
    }
    page
}

fn names<R>(cards: &[SheetCard<R>]) -> Vec<String> {
    cards.iter().map(|c| c.name.clone()).collect()
}

/// Repeat each item `count` times, preserving order
pub fn expand_counts<T: Clone>(items: impl IntoIterator<Item = (T, usize)>) -> Vec<T> {
    items
        .into_iter()
        .flat_map(|(item, count)| std::iter::repeat_n(item, count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sfc(n: usize) -> SheetCard<String> {
        SheetCard::new(format!("card{n}"), Some(format!("f{n}")))
    }

    fn dfc(n: usize) -> SheetCard<String> {
        SheetCard::new(format!("dfc{n}"), Some(format!("f{n}"))).with_back(Some(format!("b{n}")))
    }

    #[test]
    fn test_single_partial_last_page() {
        let cards: Vec<_> = (0..10).map(sfc).collect();
        let batches = plan(&cards, FormatMode::Single, None);

        assert_eq!(batches.len(), 1);
        let pages = &batches[0].pages;
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].filled_slots(), 9);
        assert_eq!(pages[1].filled_slots(), 1);
        assert_eq!(pages[1].slots[0].as_deref(), Some("f9"));
    }

    #[test]
    fn test_back_page_mirrors_columns() {
        let cards: Vec<_> = (0..4).map(dfc).collect();
        let batches = plan(&cards, FormatMode::Double, None);
        let back = &batches[0].pages[1];

        assert_eq!(back.side, PageSide::Back);
        assert_eq!(back.slots[2].as_deref(), Some("b0"));
        assert_eq!(back.slots[1].as_deref(), Some("b1"));
        assert_eq!(back.slots[0].as_deref(), Some("b2"));
        assert_eq!(back.slots[5].as_deref(), Some("b3"));
        assert_eq!(back.filled_slots(), 4);
    }

    #[test]
    fn test_double_uses_default_back() {
        let cards = vec![sfc(0), dfc(1)];
        let default_back = "default".to_string();
        let batches = plan(&cards, FormatMode::Double, Some(&default_back));
        let back = &batches[0].pages[1];

        assert_eq!(back.slots[2].as_deref(), Some("default"));
        assert_eq!(back.slots[1].as_deref(), Some("b1"));
    }

    #[test]
    fn test_double_without_default_leaves_blank() {
        let batches = plan(&[sfc(0)], FormatMode::Double, None);
        assert!(batches[0].pages[1].is_blank());
    }

    #[test]
    fn test_smart_omits_empty_batch() {
        let cards: Vec<_> = (0..3).map(sfc).collect();
        let batches = plan(&cards, FormatMode::Smart, None);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].kind, BatchKind::Standard);
    }

    #[test]
    fn test_empty_input_has_no_batches() {
        let cards: Vec<SheetCard<String>> = Vec::new();
        assert!(plan(&cards, FormatMode::Both, None).is_empty());
    }

    #[test]
    fn test_expand_counts() {
        let expanded = expand_counts([("a", 2), ("b", 0), ("c", 1)]);
        assert_eq!(expanded, ["a", "a", "c"]);
    }
}
