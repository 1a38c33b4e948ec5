//! Shared constants for sheet layout
//!
//! All layout math happens in millimeters; PDF output converts to points at
//! the last moment.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4; // ≈ 2.83465

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

// =============================================================================
// Grid
// =============================================================================

pub const GRID_COLS: usize = 3;
pub const GRID_ROWS: usize = 3;

/// Card slots on one page
pub const SLOTS_PER_PAGE: usize = GRID_COLS * GRID_ROWS;

/// Standard card size (63 × 88 mm)
pub const DEFAULT_CARD_WIDTH_MM: f32 = 63.0;
pub const DEFAULT_CARD_HEIGHT_MM: f32 = 88.0;

// =============================================================================
// Marks and Footer
// =============================================================================

pub const DEFAULT_CUT_LINE_THICKNESS_MM: f32 = 0.2;

pub const DEFAULT_CUT_LINE_COLOR: &str = "#000000";

/// Distance from the bottom grid edge to the footer baseline
pub const FOOTER_BELOW_GRID_MM: f32 = 3.5;

/// Horizontal inset of the footer text from the grid edges
pub const FOOTER_INSET_MM: f32 = 1.0;

pub const FOOTER_FONT_SIZE_PT: f32 = 10.0;

/// Approximate character width ratio for Helvetica
pub const HELVETICA_CHAR_WIDTH_RATIO: f32 = 0.5;

// =============================================================================
// Default Back
// =============================================================================

/// Pixel size the default back image is resized to before embedding
pub const DEFAULT_BACK_SIZE_PX: (u32, u32) = (750, 1050);
