use crate::constants::SLOTS_PER_PAGE;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    #[default]
    Letter,
    A4,
    Legal,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Portrait dimensions in millimeters
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }
}

/// How a deck is split into printable batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FormatMode {
    /// Fronts only
    #[default]
    Single,
    /// Front/back page pairs for every card
    Double,
    /// `Single` followed by `Double`
    Both,
    /// Single-faced cards front-only, double-faced cards as pairs
    Smart,
}

impl FormatMode {
    pub fn name(self) -> &'static str {
        match self {
            FormatMode::Single => "single",
            FormatMode::Double => "double",
            FormatMode::Both => "both",
            FormatMode::Smart => "smart",
        }
    }

    /// Whether any batch of this mode prints back faces
    pub fn needs_backs(self) -> bool {
        !matches!(self, FormatMode::Single)
    }
}

impl fmt::Display for FormatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatMode {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(FormatMode::Single),
            "double" => Ok(FormatMode::Double),
            "both" => Ok(FormatMode::Both),
            "smart" => Ok(FormatMode::Smart),
            other => Err(LayoutError::Config(format!("Unknown format mode '{other}'"))),
        }
    }
}

/// Which side of a printed sheet a page is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum PageSide {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BatchKind {
    /// Front pages only
    Standard,
    /// Alternating front and mirrored back pages
    DoubleSided,
}

impl BatchKind {
    pub fn label(self) -> &'static str {
        match self {
            BatchKind::Standard => "Standard",
            BatchKind::DoubleSided => "Double Sided",
        }
    }

    /// Suffix used in output file names, e.g. `Deck_Standard.pdf`
    pub fn file_suffix(self) -> &'static str {
        match self {
            BatchKind::Standard => "Standard",
            BatchKind::DoubleSided => "Double",
        }
    }
}

/// One physical card to place, with its image references.
///
/// `R` is whatever the consumer draws from: a cache path for PDF output, a
/// URL for previews.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetCard<R> {
    pub name: String,
    pub front: Option<R>,
    pub back: Option<R>,
    pub is_double_faced: bool,
}

impl<R> SheetCard<R> {
    pub fn new(name: impl Into<String>, front: Option<R>) -> Self {
        Self {
            name: name.into(),
            front,
            back: None,
            is_double_faced: false,
        }
    }

    pub fn with_back(mut self, back: Option<R>) -> Self {
        self.is_double_faced = true;
        self.back = back;
        self
    }

    /// Convert the image references, keeping the layout data
    pub fn map<S>(self, mut f: impl FnMut(R) -> S) -> SheetCard<S> {
        SheetCard {
            name: self.name,
            front: self.front.map(&mut f),
            back: self.back.map(&mut f),
            is_double_faced: self.is_double_faced,
        }
    }
}

/// A fixed-capacity grid of slots, row-major from the top-left
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub side: PageSide,
    /// Always `SLOTS_PER_PAGE` long; `None` is an empty slot
    pub slots: Vec<Option<R>>,
}

impl<R> Page<R> {
    pub fn empty(side: PageSide) -> Self {
        Self {
            side,
            slots: std::iter::repeat_with(|| None).take(SLOTS_PER_PAGE).collect(),
        }
    }

    pub fn filled_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_blank(&self) -> bool {
        self.filled_slots() == 0
    }
}

/// An ordered run of pages printed together as one document
#[derive(Debug, Clone, PartialEq)]
pub struct DeckBatch<R> {
    pub kind: BatchKind,
    pub label: String,
    /// Cards placed, in placement order
    pub card_names: Vec<String>,
    pub pages: Vec<Page<R>>,
}

impl<R> DeckBatch<R> {
    pub fn card_count(&self) -> usize {
        self.card_names.len()
    }
}

/// Axis-aligned rectangle in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mode_parse() {
        assert_eq!("smart".parse::<FormatMode>().unwrap(), FormatMode::Smart);
        assert_eq!(" Both ".parse::<FormatMode>().unwrap(), FormatMode::Both);
        assert!(matches!(
            "triple".parse::<FormatMode>(),
            Err(LayoutError::Config(_))
        ));
    }

    #[test]
    fn test_empty_page_has_nine_slots() {
        let page: Page<String> = Page::empty(PageSide::Front);
        assert_eq!(page.slots.len(), 9);
        assert!(page.is_blank());
    }

    #[test]
    fn test_sheet_card_map() {
        let card = SheetCard::new("Delver", Some(1)).with_back(Some(2));
        let mapped = card.map(|n| n * 10);
        assert_eq!(mapped.front, Some(10));
        assert_eq!(mapped.back, Some(20));
        assert!(mapped.is_double_faced);
    }
}
