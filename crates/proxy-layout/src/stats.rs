use crate::constants::SLOTS_PER_PAGE;
use crate::types::*;

/// Counts for a set of planned batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanStatistics {
    pub batches: usize,
    /// Physical cards placed (a double-sided card counts once)
    pub cards: usize,
    pub pages: usize,
    /// Sheets of paper, counting a front/back pair as one
    pub sheets: usize,
    pub filled_slots: usize,
    pub blank_slots: usize,
}

/// Calculate statistics for planned batches
pub fn calculate_statistics<R>(batches: &[DeckBatch<R>]) -> PlanStatistics {
    let mut stats = PlanStatistics {
        batches: batches.len(),
        ..Default::default()
    };

    for batch in batches {
        stats.cards += batch.card_count();
        stats.pages += batch.pages.len();
        stats.sheets += match batch.kind {
            BatchKind::Standard => batch.pages.len(),
            BatchKind::DoubleSided => batch.pages.len().div_ceil(2),
        };

        let filled: usize = batch.pages.iter().map(Page::filled_slots).sum();
        stats.filled_slots += filled;
        stats.blank_slots += batch.pages.len() * SLOTS_PER_PAGE - filled;
    }

    stats
}

impl PlanStatistics {
    pub fn merge(self, other: PlanStatistics) -> PlanStatistics {
        PlanStatistics {
            batches: self.batches + other.batches,
            cards: self.cards + other.cards,
            pages: self.pages + other.pages,
            sheets: self.sheets + other.sheets,
            filled_slots: self.filled_slots + other.filled_slots,
            blank_slots: self.blank_slots + other.blank_slots,
        }
    }
}
