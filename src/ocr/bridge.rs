use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::geometry::PixelBox;
use crate::core::model::{Detection, Level, RasterPage};
use crate::core::{Result, SheetError};
use crate::ocr::TextDetector;

/// Sparse text: finds as much text as possible in no particular order,
/// which suits titles and part labels scattered around staves.
pub const DEFAULT_PSM: u8 = 11;

/// Engine mode selecting the LSTM recognizer only.
pub const LSTM_ONLY_OEM: u8 = 1;

const TSV_COLUMNS: usize = 12;

/// How tesseract is invoked for a detection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub binary: PathBuf,
    pub lang: String,
    pub psm: u8,
    /// `None` leaves the engine default.
    pub oem: Option<u8>,
    pub tessdata_dir: Option<PathBuf>,
    /// Word list (one per line) biasing recognition towards instrument names.
    pub user_words: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            lang: "eng".to_string(),
            psm: DEFAULT_PSM,
            oem: None,
            tessdata_dir: None,
            user_words: None,
        }
    }
}

/// Runs the `tesseract` binary on a page and reads its TSV output.
#[derive(Debug, Clone, Default)]
pub struct TesseractBridge {
    config: OcrConfig,
}

impl TesseractBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: OcrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    pub fn with_binary(mut self, binary: PathBuf) -> Self {
        self.config.binary = binary;
        self
    }

    pub fn with_lang(mut self, lang: String) -> Self {
        self.config.lang = lang;
        self
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.config.psm = psm;
        self
    }

    pub fn with_oem(mut self, oem: Option<u8>) -> Self {
        self.config.oem = oem;
        self
    }

    pub fn with_tessdata_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.tessdata_dir = dir;
        self
    }

    pub fn with_user_words(mut self, path: Option<PathBuf>) -> Self {
        self.config.user_words = path;
        self
    }

    /// `tesseract <image> stdout [options] tsv`
    fn command(&self, image: &Path) -> Command {
        let c = &self.config;
        let mut cmd = Command::new(&c.binary);
        cmd.arg(image).arg("stdout");
        if let Some(dir) = &c.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("-l").arg(&c.lang);
        if let Some(oem) = c.oem {
            cmd.arg("--oem").arg(oem.to_string());
        }
        cmd.arg("--psm").arg(c.psm.to_string());
        if let Some(words) = &c.user_words {
            cmd.arg("--user-words").arg(words);
        }
        cmd.arg("tsv");
        cmd
    }
}

impl TextDetector for TesseractBridge {
    fn detect(&self, page: &RasterPage) -> Result<Vec<Detection>> {
        let input = tempfile::Builder::new()
            .prefix("ocr-")
            .suffix(".png")
            .tempfile()?;
        page.image
            .save_with_format(input.path(), image::ImageFormat::Png)?;

        let binary = &self.config.binary;
        let output = self.command(input.path()).output().map_err(|e| {
            SheetError::DetectionEngine(format!("failed to invoke {}: {e}", binary.display()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SheetError::DetectionEngine(format!(
                "{} exited with {}: {}",
                binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        let detections = parse_tsv(&String::from_utf8_lossy(&output.stdout))?;
        debug!(
            page = page.page_number(),
            tokens = detections.len(),
            "ocr finished"
        );
        Ok(detections)
    }
}

/// Turns tesseract's TSV table into detections. The header row is skipped;
/// every other row must have all twelve columns.
pub fn parse_tsv(tsv: &str) -> Result<Vec<Detection>> {
    let mut detections = Vec::new();

    for (line_no, line) in tsv.lines().enumerate() {
        if line.is_empty() || line.starts_with("level") {
            continue;
        }
        let fields: Vec<&str> = line.splitn(TSV_COLUMNS, '\t').collect();
        if fields.len() < TSV_COLUMNS - 1 {
            return Err(malformed(line_no, "too few columns"));
        }

        let int = |idx: usize| -> Result<i64> {
            fields[idx]
                .trim()
                .parse::<i64>()
                .map_err(|_| malformed(line_no, "non-numeric column"))
        };
        let level_code = int(0)?;
        let level = u8::try_from(level_code)
            .ok()
            .and_then(|code| Level::try_from(code).ok())
            .ok_or_else(|| malformed(line_no, "unknown level"))?;
        let confidence = fields[10]
            .trim()
            .parse::<f32>()
            .map_err(|_| malformed(line_no, "non-numeric confidence"))?;

        detections.push(Detection {
            level,
            page_num: int(1)?.max(0) as u32,
            block_num: int(2)?.max(0) as u32,
            par_num: int(3)?.max(0) as u32,
            line_num: int(4)?.max(0) as u32,
            word_num: int(5)?.max(0) as u32,
            bbox: PixelBox::new(
                int(6)? as i32,
                int(7)? as i32,
                int(8)?.max(0) as u32,
                int(9)?.max(0) as u32,
            ),
            confidence,
            text: fields.get(11).map(|t| t.to_string()).unwrap_or_default(),
        });
    }

    Ok(detections)
}

fn malformed(line_no: usize, what: &str) -> SheetError {
    SheetError::DetectionEngine(format!("malformed OCR output at line {}: {what}", line_no + 1))
}
