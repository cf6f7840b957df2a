use std::fmt::Write as _;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::core::model::{Detection, RasterPage};

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: i32 = 2;
const TEXT_WIDTH: usize = 24;

/// Renders word boxes onto a page and tabulates them for review.
#[derive(Debug, Clone, Default)]
pub struct DetectionReporter;

impl DetectionReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, detections: &[Detection], page: &RasterPage) -> (RgbImage, String) {
        (self.annotate(detections, page), self.table(detections))
    }

    pub fn annotate(&self, detections: &[Detection], page: &RasterPage) -> RgbImage {
        let mut canvas = page.image.clone();
        for d in detections.iter().filter(|d| d.is_word()) {
            for inset in 0..BOX_THICKNESS {
                let width = d.bbox.width as i32 - 2 * inset;
                let height = d.bbox.height as i32 - 2 * inset;
                if width <= 0 || height <= 0 {
                    break;
                }
                let rect = Rect::at(d.bbox.left + inset, d.bbox.top + inset)
                    .of_size(width as u32, height as u32);
                draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
            }
        }
        canvas
    }

    /// Fixed-width table with one row per word: text, confidence, left, top.
    pub fn table(&self, detections: &[Detection]) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<width$} {:>8} {:>6} {:>6}",
            "text",
            "conf",
            "left",
            "top",
            width = TEXT_WIDTH
        );
        let _ = writeln!(out, "{}", "-".repeat(TEXT_WIDTH + 23));
        for d in detections.iter().filter(|d| d.is_word()) {
            let text: String = d.text.trim().chars().take(TEXT_WIDTH).collect();
            let _ = writeln!(
                out,
                "{:<width$} {:>8.2} {:>6} {:>6}",
                text,
                d.confidence,
                d.bbox.left,
                d.bbox.top,
                width = TEXT_WIDTH
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::PixelBox;
    use crate::core::model::Level;

    fn detection(level: Level, text: &str, bbox: PixelBox) -> Detection {
        Detection {
            level,
            page_num: 1,
            block_num: 1,
            par_num: 1,
            line_num: 1,
            word_num: 1,
            bbox,
            confidence: 93.5,
            text: text.to_string(),
        }
    }

    fn blank_page() -> RasterPage {
        RasterPage {
            page_idx: 0,
            dpi: 100,
            image: RgbImage::from_pixel(100, 60, Rgb([255, 255, 255])),
        }
    }

    #[test]
    fn draws_only_word_boxes() {
        let detections = vec![
            detection(Level::Block, "", PixelBox::new(0, 0, 100, 60)),
            detection(Level::Word, "Horn", PixelBox::new(10, 10, 30, 20)),
        ];
        let page = blank_page();
        let (annotated, _) = DetectionReporter::new().render(&detections, &page);

        assert_eq!(annotated.get_pixel(10, 10), &BOX_COLOR);
        assert_eq!(annotated.get_pixel(11, 15), &BOX_COLOR);
        assert_eq!(annotated.get_pixel(25, 20), &Rgb([255, 255, 255]));
        // the block outline was not drawn
        assert_eq!(annotated.get_pixel(0, 0), &Rgb([255, 255, 255]));
        // source page untouched
        assert_eq!(page.image.get_pixel(10, 10), &Rgb([255, 255, 255]));
    }

    #[test]
    fn zero_sized_boxes_are_skipped() {
        let detections = vec![detection(Level::Word, "", PixelBox::new(5, 5, 0, 0))];
        let annotated = DetectionReporter::new().annotate(&detections, &blank_page());
        assert_eq!(annotated.get_pixel(5, 5), &Rgb([255, 255, 255]));
    }

    #[test]
    fn table_lists_words() {
        let detections = vec![
            detection(Level::Line, "", PixelBox::new(0, 0, 1, 1)),
            detection(Level::Word, "Horn", PixelBox::new(12, 34, 30, 20)),
        ];
        let table = DetectionReporter::new().table(&detections);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("text"));
        assert_eq!(
            lines[2],
            format!("{:<24} {:>8} {:>6} {:>6}", "Horn", "93.50", 12, 34)
        );
    }
}
