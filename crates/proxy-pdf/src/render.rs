//! Page plans to PDF bytes

use crate::images::decode_file;
use crate::types::{CardImage, PdfError, Result};
use printpdf::{
    BuiltinFont, Color, Line, LinePoint, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt,
    RawImage, RawImageData, RawImageFormat, Rgb, TextItem, TextMatrix, XObjectId,
    XObjectTransform,
};
use proxy_layout::constants::{FOOTER_FONT_SIZE_PT, HELVETICA_CHAR_WIDTH_RATIO, mm_to_pt};
use proxy_layout::{DeckBatch, LayoutGeometry, Page, PageSide, SheetOptions};
use std::collections::HashMap;
use std::path::Path;

/// Render one batch into a standalone PDF.
///
/// `title` is the footer text; back pages get a ` (Backs)` suffix. Slots
/// whose image cannot be decoded are left empty.
pub fn generate_pdf_bytes(
    batch: &DeckBatch<CardImage>,
    options: &SheetOptions,
    title: &str,
) -> Result<Vec<u8>> {
    if batch.pages.is_empty() {
        return Err(PdfError::NoPages);
    }
    options.validate()?;

    let geometry = options.geometry();
    let (r, g, b) = options.cut_line_rgb()?;
    let color = Color::Rgb(Rgb::new(r, g, b, None));

    let mut doc = PdfDocument::new(title);
    let mut embedded = EmbeddedImages::default();
    let total = batch.pages.len();

    for (index, page) in batch.pages.iter().enumerate() {
        let mut ops = Vec::new();
        ops.extend(cut_line_ops(&geometry, &color, options.cut_line_thickness_mm));

        for (slot, image) in page.slots.iter().enumerate() {
            let Some(image) = image else { continue };
            match embedded.id_for(&mut doc, image) {
                Some((id, width_px, height_px)) => {
                    ops.push(image_op(&geometry, slot, id, width_px, height_px));
                }
                None => log::warn!("Leaving slot {} blank on page {}", slot + 1, index + 1),
            }
        }

        if options.show_footer {
            let (left, right) = footer_text(page, title, index, total);
            ops.extend(footer_ops(&geometry, &color, &left, &right));
        }

        doc.pages.push(PdfPage::new(
            Mm(geometry.page_width),
            Mm(geometry.page_height),
            ops,
        ));
    }

    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    for warning in &warnings {
        log::debug!("PDF writer: {warning:?}");
    }

    Ok(bytes)
}

pub async fn generate_pdf(
    batch: &DeckBatch<CardImage>,
    options: &SheetOptions,
    title: &str,
    output_path: impl AsRef<Path>,
) -> Result<()> {
    let batch = batch.clone();
    let options = options.clone();
    let title = title.to_string();
    let output_path = output_path.as_ref().to_owned();

    let bytes =
        tokio::task::spawn_blocking(move || generate_pdf_bytes(&batch, &options, &title)).await??;

    tokio::fs::write(&output_path, bytes).await?;
    log::info!("Wrote {}", output_path.display());

    Ok(())
}

/// Footer `(title, page number)` for the page at `index` of `total`
pub fn footer_text<R>(page: &Page<R>, title: &str, index: usize, total: usize) -> (String, String) {
    let left = match page.side {
        PageSide::Front => title.to_string(),
        PageSide::Back => format!("{title} (Backs)"),
    };
    (left, format!("{} / {}", index + 1, total))
}

/// Each distinct image is embedded once and reused across slots
#[derive(Default)]
struct EmbeddedImages {
    ids: HashMap<String, Option<(XObjectId, u32, u32)>>,
}

impl EmbeddedImages {
    fn id_for(&mut self, doc: &mut PdfDocument, image: &CardImage) -> Option<(XObjectId, u32, u32)> {
        self.ids
            .entry(image.key())
            .or_insert_with(|| {
                let decoded = match image {
                    CardImage::File(path) => match decode_file(path) {
                        Ok(decoded) => decoded,
                        Err(e) => {
                            log::warn!("Could not read image {}: {e}", path.display());
                            return None;
                        }
                    },
                    CardImage::Decoded { image, .. } => (**image).clone(),
                };
                let (width, height) = decoded.dimensions();
                let raw = RawImage {
                    pixels: RawImageData::U8(decoded.into_raw()),
                    width: width as usize,
                    height: height as usize,
                    data_format: RawImageFormat::RGB8,
                    tag: Vec::new(),
                };
                Some((doc.add_image(&raw), width, height))
            })
            .clone()
    }
}

/// Full-bleed guides at every card edge
fn cut_line_ops(geometry: &LayoutGeometry, color: &Color, thickness_mm: f32) -> Vec<Op> {
    let mut ops = vec![
        Op::SaveGraphicsState,
        Op::SetOutlineColor { col: color.clone() },
        Op::SetOutlineThickness {
            pt: Pt(mm_to_pt(thickness_mm)),
        },
    ];

    for line in geometry.cut_lines() {
        let ((x1, y1), (x2, y2)) = line.endpoints();
        ops.push(Op::DrawLine {
            line: Line {
                points: vec![
                    line_point(x1, geometry.page_height - y1),
                    line_point(x2, geometry.page_height - y2),
                ],
                is_closed: false,
            },
        });
    }

    ops.push(Op::RestoreGraphicsState);
    ops
}

fn line_point(x_mm: f32, y_mm: f32) -> LinePoint {
    LinePoint {
        p: Point {
            x: Pt(mm_to_pt(x_mm)),
            y: Pt(mm_to_pt(y_mm)),
        },
        bezier: false,
    }
}

/// Stretch an image over the slot rectangle
fn image_op(geometry: &LayoutGeometry, slot: usize, id: XObjectId, width_px: u32, height_px: u32) -> Op {
    let rect = geometry.to_pdf_rect(geometry.slot_rect_at(slot));

    // At 72 dpi one pixel is one point
    Op::UseXobject {
        id,
        transform: XObjectTransform {
            translate_x: Some(Pt(mm_to_pt(rect.x))),
            translate_y: Some(Pt(mm_to_pt(rect.y))),
            scale_x: Some(mm_to_pt(rect.width) / width_px as f32),
            scale_y: Some(mm_to_pt(rect.height) / height_px as f32),
            dpi: Some(72.0),
            ..Default::default()
        },
    }
}

fn footer_ops(geometry: &LayoutGeometry, color: &Color, left: &str, right: &str) -> Vec<Op> {
    let baseline = mm_to_pt(geometry.page_height - geometry.footer_y());
    let left_x = mm_to_pt(geometry.footer_left_x());
    let right_x = mm_to_pt(geometry.footer_right_x()) - helvetica_width(right, FOOTER_FONT_SIZE_PT);

    let mut ops = vec![Op::SaveGraphicsState, Op::SetFillColor { col: color.clone() }];
    for (x, text) in [(left_x, left), (right_x, right)] {
        ops.push(Op::StartTextSection);
        ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(FOOTER_FONT_SIZE_PT),
            font: BuiltinFont::Helvetica,
        });
        ops.push(Op::SetTextMatrix {
            matrix: TextMatrix::Translate(Pt(x), Pt(baseline)),
        });
        ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font: BuiltinFont::Helvetica,
        });
        ops.push(Op::EndTextSection);
    }
    ops.push(Op::RestoreGraphicsState);
    ops
}

/// Approximate rendered width in points, for right alignment
fn helvetica_width(text: &str, size_pt: f32) -> f32 {
    text.chars()
        .map(|c| match c {
            '0'..='9' => 0.556,
            ' ' | '/' => 0.278,
            _ => HELVETICA_CHAR_WIDTH_RATIO,
        })
        .sum::<f32>()
        * size_pt
}
