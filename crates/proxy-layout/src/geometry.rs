//! Card grid geometry
//!
//! Positions are computed in a top-left-origin millimeter frame, the way a
//! preview is drawn. [`LayoutGeometry::to_pdf_y`] converts to the PDF's
//! bottom-left origin.

use crate::constants::*;
use crate::types::Rect;

/// Orientation of a cut line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrientation {
    /// Constant x, spans the page height
    Vertical,
    /// Constant y, spans the page width
    Horizontal,
}

/// A full-bleed guide along one card edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutLine {
    pub orientation: LineOrientation,
    /// x for vertical lines, y (top-left frame) for horizontal lines
    pub position: f32,
    pub start: f32,
    pub end: f32,
}

impl CutLine {
    /// Segment endpoints `((x1, y1), (x2, y2))` in the top-left frame
    pub fn endpoints(&self) -> ((f32, f32), (f32, f32)) {
        match self.orientation {
            LineOrientation::Vertical => ((self.position, self.start), (self.position, self.end)),
            LineOrientation::Horizontal => {
                ((self.start, self.position), (self.end, self.position))
            }
        }
    }
}

/// Derived layout for a 3×3 card grid centered on a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub card_width: f32,
    pub card_height: f32,
    pub padding: f32,
    pub start_x: f32,
    pub start_y: f32,
}

impl LayoutGeometry {
    /// All arguments in millimeters
    pub fn new(page: (f32, f32), card: (f32, f32), padding: f32) -> Self {
        let (page_width, page_height) = page;
        let (card_width, card_height) = card;
        let grid_width = GRID_COLS as f32 * card_width + (GRID_COLS - 1) as f32 * padding;
        let grid_height = GRID_ROWS as f32 * card_height + (GRID_ROWS - 1) as f32 * padding;

        Self {
            page_width,
            page_height,
            card_width,
            card_height,
            padding,
            start_x: (page_width - grid_width) / 2.0,
            start_y: (page_height - grid_height) / 2.0,
        }
    }

    pub fn grid_width(&self) -> f32 {
        GRID_COLS as f32 * self.card_width + (GRID_COLS - 1) as f32 * self.padding
    }

    pub fn grid_height(&self) -> f32 {
        GRID_ROWS as f32 * self.card_height + (GRID_ROWS - 1) as f32 * self.padding
    }

    /// Whether the whole grid lies on the page
    pub fn fits_page(&self) -> bool {
        self.start_x >= 0.0 && self.start_y >= 0.0
    }

    /// Margins as `(left, right, top, bottom)`
    pub fn margins(&self) -> (f32, f32, f32, f32) {
        let right = self.page_width - self.start_x - self.grid_width();
        let bottom = self.page_height - self.start_y - self.grid_height();
        (self.start_x, right, self.start_y, bottom)
    }

    /// Slot bounds in the top-left frame
    pub fn slot_rect(&self, row: usize, col: usize) -> Rect {
        Rect::new(
            self.start_x + col as f32 * (self.card_width + self.padding),
            self.start_y + row as f32 * (self.card_height + self.padding),
            self.card_width,
            self.card_height,
        )
    }

    /// Slot bounds for a row-major slot index
    pub fn slot_rect_at(&self, index: usize) -> Rect {
        self.slot_rect(index / GRID_COLS, index % GRID_COLS)
    }

    /// Convert the top edge `y` of a box of height `h` to the PDF's
    /// bottom-left frame
    pub fn to_pdf_y(&self, y: f32, h: f32) -> f32 {
        self.page_height - y - h
    }

    /// A top-left-frame rectangle re-expressed with a bottom-left origin
    pub fn to_pdf_rect(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.x,
            self.to_pdf_y(rect.y, rect.height),
            rect.width,
            rect.height,
        )
    }

    /// Every card edge as a full-bleed line: 6 vertical, then 6 horizontal.
    ///
    /// Coincident lines (zero padding) are kept.
    pub fn cut_lines(&self) -> Vec<CutLine> {
        let mut lines = Vec::with_capacity(2 * (GRID_COLS + GRID_ROWS));

        for col in 0..GRID_COLS {
            let left = self.start_x + col as f32 * (self.card_width + self.padding);
            for x in [left, left + self.card_width] {
                lines.push(CutLine {
                    orientation: LineOrientation::Vertical,
                    position: x,
                    start: 0.0,
                    end: self.page_height,
                });
            }
        }

        for row in 0..GRID_ROWS {
            let top = self.start_y + row as f32 * (self.card_height + self.padding);
            for y in [top, top + self.card_height] {
                lines.push(CutLine {
                    orientation: LineOrientation::Horizontal,
                    position: y,
                    start: 0.0,
                    end: self.page_width,
                });
            }
        }

        lines
    }

    /// Footer baseline, top-left frame
    pub fn footer_y(&self) -> f32 {
        self.start_y + self.grid_height() + FOOTER_BELOW_GRID_MM
    }

    /// Left edge of the footer title
    pub fn footer_left_x(&self) -> f32 {
        self.start_x + FOOTER_INSET_MM
    }

    /// Right edge the page number is aligned to
    pub fn footer_right_x(&self) -> f32 {
        self.start_x + self.grid_width() - FOOTER_INSET_MM
    }
}

impl Default for LayoutGeometry {
    fn default() -> Self {
        Self::new(
            crate::types::PaperSize::Letter.dimensions_mm(),
            (DEFAULT_CARD_WIDTH_MM, DEFAULT_CARD_HEIGHT_MM),
            0.0,
        )
    }
}

/// Column a card's back occupies so it lines up with its front when the
/// sheet is flipped on the long edge
pub fn mirrored_col(col: usize) -> usize {
    GRID_COLS - 1 - col
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn letter(padding: f32) -> LayoutGeometry {
        LayoutGeometry::new((215.9, 279.4), (63.0, 88.0), padding)
    }

    #[test]
    fn test_default_start_offsets() {
        let g = letter(0.0);
        assert!((g.start_x - 13.45).abs() < EPS);
        assert!((g.start_y - 7.7).abs() < EPS);
        assert!(g.fits_page());
    }

    #[test]
    fn test_margins_symmetric() {
        for padding in [0.0, 0.5, 1.0, 2.5, 3.0] {
            let (left, right, top, bottom) = letter(padding).margins();
            assert!((left - right).abs() < EPS, "padding {padding}");
            assert!((top - bottom).abs() < EPS, "padding {padding}");
        }
    }

    #[test]
    fn test_slot_rect() {
        let g = letter(2.0);
        let r = g.slot_rect(1, 2);
        assert!((r.x - (g.start_x + 2.0 * 65.0)).abs() < EPS);
        assert!((r.y - (g.start_y + 90.0)).abs() < EPS);
        assert_eq!(g.slot_rect_at(5), r);
    }

    #[test]
    fn test_pdf_y_round_trip() {
        let g = letter(1.0);
        let r = g.slot_rect(0, 0);
        let pdf = g.to_pdf_rect(r);
        // Top row sits at the top of the PDF page
        assert!((pdf.y + pdf.height - (g.page_height - g.start_y)).abs() < EPS);
        assert!((g.to_pdf_y(pdf.y, pdf.height) - r.y).abs() < EPS);
    }

    #[test]
    fn test_cut_lines_zero_padding_coincide() {
        let lines = letter(0.0).cut_lines();
        assert_eq!(lines.len(), 12);

        let xs: Vec<f32> = lines[..6].iter().map(|l| l.position).collect();
        // Right edge of column n meets left edge of column n+1
        assert!((xs[1] - xs[2]).abs() < EPS);
        assert!((xs[3] - xs[4]).abs() < EPS);

        let ys: Vec<f32> = lines[6..].iter().map(|l| l.position).collect();
        assert!((ys[1] - ys[2]).abs() < EPS);
        assert!((ys[3] - ys[4]).abs() < EPS);
    }

    #[test]
    fn test_cut_lines_gutter_equals_padding() {
        let lines = letter(3.0).cut_lines();
        let xs: Vec<f32> = lines[..6].iter().map(|l| l.position).collect();
        assert!((xs[2] - xs[1] - 3.0).abs() < EPS);
        assert!((xs[4] - xs[3] - 3.0).abs() < EPS);

        let ys: Vec<f32> = lines[6..].iter().map(|l| l.position).collect();
        assert!((ys[2] - ys[1] - 3.0).abs() < EPS);
    }

    #[test]
    fn test_cut_lines_full_bleed() {
        let g = letter(1.0);
        for line in g.cut_lines() {
            assert_eq!(line.start, 0.0);
            match line.orientation {
                LineOrientation::Vertical => assert_eq!(line.end, g.page_height),
                LineOrientation::Horizontal => assert_eq!(line.end, g.page_width),
            }
        }
    }

    #[test]
    fn test_footer_below_grid() {
        let g = letter(0.0);
        assert!((g.footer_y() - (g.start_y + 264.0 + 3.5)).abs() < EPS);
        assert!(g.footer_y() < g.page_height);
        assert!(g.footer_right_x() > g.footer_left_x());
    }

    #[test]
    fn test_mirrored_col() {
        assert_eq!(mirrored_col(0), 2);
        assert_eq!(mirrored_col(1), 1);
        assert_eq!(mirrored_col(2), 0);
    }
}
