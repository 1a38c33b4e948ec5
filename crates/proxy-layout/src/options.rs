use crate::constants::*;
use crate::geometry::LayoutGeometry;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sheet layout configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SheetOptions {
    pub format: FormatMode,
    pub paper_size: PaperSize,

    // Card grid
    pub card_width_mm: f32,
    pub card_height_mm: f32,
    /// Gap between adjacent cards
    pub padding_mm: f32,

    // Cut lines
    /// `#RRGGBB`
    pub cut_line_color: String,
    pub cut_line_thickness_mm: f32,

    pub show_footer: bool,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            format: FormatMode::Single,
            paper_size: PaperSize::Letter,
            card_width_mm: DEFAULT_CARD_WIDTH_MM,
            card_height_mm: DEFAULT_CARD_HEIGHT_MM,
            padding_mm: 0.0,
            cut_line_color: DEFAULT_CUT_LINE_COLOR.to_string(),
            cut_line_thickness_mm: DEFAULT_CUT_LINE_THICKNESS_MM,
            show_footer: true,
        }
    }
}

impl SheetOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| LayoutError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| LayoutError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if !is_positive(self.card_width_mm) || !is_positive(self.card_height_mm) {
            return Err(LayoutError::Config(
                "Card dimensions must be positive".to_string(),
            ));
        }
        if !is_non_negative(self.padding_mm) {
            return Err(LayoutError::Config(format!(
                "Padding must be non-negative, got {} mm",
                self.padding_mm
            )));
        }
        if !is_non_negative(self.cut_line_thickness_mm) {
            return Err(LayoutError::Config(
                "Cut line thickness must be non-negative".to_string(),
            ));
        }
        self.cut_line_rgb()?;

        let geometry = self.geometry();
        if !geometry.fits_page() {
            return Err(LayoutError::Config(format!(
                "A 3x3 grid of {}x{} mm cards with {} mm padding does not fit on a {}x{} mm page",
                self.card_width_mm,
                self.card_height_mm,
                self.padding_mm,
                geometry.page_width,
                geometry.page_height
            )));
        }

        Ok(())
    }

    pub fn geometry(&self) -> LayoutGeometry {
        LayoutGeometry::new(
            self.paper_size.dimensions_mm(),
            (self.card_width_mm, self.card_height_mm),
            self.padding_mm,
        )
    }

    /// Cut line color as RGB components in `0.0..=1.0`
    pub fn cut_line_rgb(&self) -> Result<(f32, f32, f32)> {
        parse_hex_color(&self.cut_line_color)
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn is_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

/// Parse `#RRGGBB` (leading `#` optional)
pub fn parse_hex_color(color: &str) -> Result<(f32, f32, f32)> {
    let hex = color.trim().trim_start_matches('#');
    let invalid = || LayoutError::Config(format!("Invalid color '{color}', expected #RRGGBB"));
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map(|v| v as f32 / 255.0)
            .map_err(|_| invalid())
    };
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#000000").unwrap(), (0.0, 0.0, 0.0));
        assert_eq!(parse_hex_color("ff0000").unwrap(), (1.0, 0.0, 0.0));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }
}
