use std::collections::{BTreeMap, BTreeSet};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::core::geometry::PixelBox;
use crate::parser::PageRange;

/// Name used both as part name and pseudo-instrument when a page is
/// treated as a full score.
pub const FULL_SCORE: &str = "full score";

/// One PDF page rendered to a bitmap.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// 0-based index into the source document.
    pub page_idx: usize,
    pub dpi: u32,
    pub image: RgbImage,
}

impl RasterPage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// 1-based page number as printed in the PDF.
    pub fn page_number(&self) -> usize {
        self.page_idx + 1
    }
}

/// Structural level of an OCR row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Page = 1,
    Block = 2,
    Paragraph = 3,
    Line = 4,
    Word = 5,
}

impl TryFrom<u8> for Level {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::Page),
            2 => Ok(Level::Block),
            3 => Ok(Level::Paragraph),
            4 => Ok(Level::Line),
            5 => Ok(Level::Word),
            other => Err(other),
        }
    }
}

/// One OCR token with its position in the page/block/paragraph/line/word
/// hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub level: Level,
    pub page_num: u32,
    pub block_num: u32,
    pub par_num: u32,
    pub line_num: u32,
    pub word_num: u32,
    pub bbox: PixelBox,
    /// 0-100; the engine reports -1 for structural rows.
    pub confidence: f32,
    pub text: String,
}

impl Detection {
    pub fn is_word(&self) -> bool {
        self.level == Level::Word
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A keyword phrase accepted at a word position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordMatch {
    /// Index of the first word of the span within the page's word list.
    pub detection_index: usize,
    pub block_num: u32,
    pub instrument: String,
    pub keyword: String,
    pub detected_text: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartPrediction {
    pub name: String,
    pub instruments: BTreeSet<String>,
    /// `None` for the full-score fallback.
    pub block_num: Option<u32>,
    pub region: Option<PixelBox>,
}

impl PartPrediction {
    pub fn full_score() -> Self {
        Self {
            name: FULL_SCORE.to_string(),
            instruments: BTreeSet::from([FULL_SCORE.to_string()]),
            block_num: None,
            region: None,
        }
    }

    pub fn is_full_score(&self) -> bool {
        self.block_num.is_none() && self.name == FULL_SCORE
    }
}

/// Everything the detection pipeline learned about one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDetections {
    pub page_number: usize,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
    pub matches: Vec<KeywordMatch>,
    pub predictions: Vec<PartPrediction>,
}

/// A part spanning one or more consecutive pages of the sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetPart {
    pub name: String,
    pub instruments: BTreeSet<String>,
    /// 1-based and inclusive, always with an end.
    pub pages: PageRange,
}

impl SheetPart {
    pub fn from_page(&self) -> usize {
        self.pages.start
    }

    pub fn to_page(&self) -> usize {
        self.pages.end.unwrap_or(self.pages.start)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetDetections {
    pub sheet_name: String,
    pub pages: Vec<PageDetections>,
    pub parts: Vec<SheetPart>,
    /// Instrument name to the index in `parts` of the part it gets by
    /// default.
    pub default_parts: BTreeMap<String, usize>,
}

impl SheetDetections {
    pub fn part_names(&self) -> Vec<&str> {
        self.pages
            .iter()
            .flat_map(|page| page.predictions.iter())
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn default_part(&self, instrument: &str) -> Option<&SheetPart> {
        self.default_parts
            .get(instrument)
            .and_then(|&idx| self.parts.get(idx))
    }
}
