use crate::types::*;

/// Browser-facing view of a planned deck.
///
/// Slots hold image URLs; an empty string marks an empty slot. Slot order
/// matches the PDF: row-major from the top-left, backs already mirrored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeckPreview {
    pub name: String,
    pub author: Option<String>,
    pub batches: Vec<PreviewBatch>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreviewBatch {
    pub label: String,
    pub kind: BatchKind,
    pub pages: Vec<PreviewPage>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreviewPage {
    pub side: PageSide,
    pub cards: Vec<String>,
}

impl DeckPreview {
    pub fn new(name: impl Into<String>, author: Option<String>, batches: &[DeckBatch<String>]) -> Self {
        Self {
            name: name.into(),
            author,
            batches: batches.iter().map(PreviewBatch::from).collect(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.batches.iter().map(|b| b.pages.len()).sum()
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LayoutError::Config(format!("Failed to serialize preview: {}", e)))
    }
}

impl From<&DeckBatch<String>> for PreviewBatch {
    fn from(batch: &DeckBatch<String>) -> Self {
        Self {
            label: batch.label.clone(),
            kind: batch.kind,
            pages: batch
                .pages
                .iter()
                .map(|page| PreviewPage {
                    side: page.side,
                    cards: page
                        .slots
                        .iter()
                        .map(|slot| slot.clone().unwrap_or_default())
                        .collect(),
                })
                .collect(),
        }
    }
}
