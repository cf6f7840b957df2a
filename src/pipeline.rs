use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage};
use tracing::info;

use crate::core::model::{PageDetections, RasterPage, SheetDetections};
use crate::export::{DetectionReporter, Exporter, JsonExporter, TextExporter};
use crate::layout::{encode_pdf, LayoutCalculator, LayoutConfig, PageCompositor};
use crate::matching::{assemble_parts, InstrumentKeywordSet, PartPredictor, PredictorConfig};
use crate::ocr::{OcrConfig, PdfRasterizer, TesseractBridge, TextDetector};
use crate::parser::PageRange;

/// Upper bound on distinct images and on copies of each in one sheet.
pub const MAX_DISTINCT_IMAGES: usize = 64;
pub const MAX_REPEAT_COUNT: u32 = 64;

#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub input: PathBuf,
    pub pages: PageRange,
    pub dpi: u32,
    pub ocr: OcrConfig,
    pub predictor: PredictorConfig,
}

impl DetectionConfig {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            pages: PageRange::all(),
            dpi: 100,
            ocr: OcrConfig::default(),
            predictor: PredictorConfig::default(),
        }
    }

    /// File stem of the input, used to name the output directory.
    pub fn sheet_name(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sheet".to_string())
    }
}

/// Detections plus the annotated page images, in page order.
#[derive(Debug, Clone)]
pub struct SheetRun {
    pub detections: SheetDetections,
    pub annotated: Vec<(usize, RgbImage)>,
}

pub struct DetectionPipeline<D: TextDetector> {
    rasterizer: PdfRasterizer,
    detector: D,
    predictor: PartPredictor,
    reporter: DetectionReporter,
}

impl<D: TextDetector> DetectionPipeline<D> {
    pub fn new(rasterizer: PdfRasterizer, detector: D, predictor: PartPredictor) -> Self {
        Self {
            rasterizer,
            detector,
            predictor,
            reporter: DetectionReporter::new(),
        }
    }

    pub fn run(&self, config: &DetectionConfig, keywords: &InstrumentKeywordSet) -> Result<SheetRun> {
        let pages = self
            .rasterizer
            .rasterize(&config.input, config.dpi, config.pages)
            .with_context(|| format!("failed to rasterize {}", config.input.display()))?;
        self.detect_pages(&config.sheet_name(), &pages, keywords)
    }

    /// Runs OCR and prediction page by page, then joins the pages into
    /// parts. The first OCR failure aborts the run.
    pub fn detect_pages(
        &self,
        sheet_name: &str,
        pages: &[RasterPage],
        keywords: &InstrumentKeywordSet,
    ) -> Result<SheetRun> {
        let mut detected = Vec::with_capacity(pages.len());
        let mut annotated = Vec::with_capacity(pages.len());

        for page in pages {
            let detections = self
                .detector
                .detect(page)
                .with_context(|| format!("OCR failed on page {}", page.page_number()))?;
            let prediction = self.predictor.predict_page(&detections, keywords);
            info!(
                page = page.page_number(),
                tokens = detections.len(),
                matches = prediction.matches.len(),
                parts = prediction.predictions.len(),
                "page analysed"
            );

            annotated.push((page.page_number(), self.reporter.annotate(&detections, page)));
            detected.push(PageDetections {
                page_number: page.page_number(),
                width: page.width(),
                height: page.height(),
                detections,
                matches: prediction.matches,
                predictions: prediction.predictions,
            });
        }

        let assembly = assemble_parts(&detected, keywords);
        info!(sheet = sheet_name, parts = assembly.parts.len(), "parts assembled");

        Ok(SheetRun {
            detections: SheetDetections {
                sheet_name: sheet_name.to_string(),
                pages: detected,
                parts: assembly.parts,
                default_parts: assembly.default_parts,
            },
            annotated,
        })
    }
}

impl DetectionPipeline<TesseractBridge> {
    /// Pipeline driving the `tesseract` binary as configured in `config.ocr`.
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            PdfRasterizer::new(),
            TesseractBridge::from_config(config.ocr.clone()),
            PartPredictor::new(config.predictor),
        )
    }
}

/// Writes `{root}/{sheet_name}/boxes_{n}.png`, `predictions.txt` and
/// `predictions.json`. Returns the sheet directory.
pub fn export_run(run: &SheetRun, root: &Path) -> Result<PathBuf> {
    let dir = root.join(&run.detections.sheet_name);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    for (page_number, image) in &run.annotated {
        let path = dir.join(format!("boxes_{page_number}.png"));
        image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    TextExporter::new(dir.clone()).export(&run.detections)?;
    JsonExporter::new(dir.clone()).export(&run.detections)?;

    Ok(dir)
}

pub fn load_images(paths: &[PathBuf]) -> Result<Vec<DynamicImage>> {
    paths
        .iter()
        .map(|path| {
            image::open(path).with_context(|| format!("failed to open image {}", path.display()))
        })
        .collect()
}

/// Lays out `images` as circular buttons and returns the finished PDF.
pub fn generate_button_sheet(images: &[DynamicImage], config: &LayoutConfig) -> Result<Vec<u8>> {
    if images.len() > MAX_DISTINCT_IMAGES {
        anyhow::bail!(
            "cannot use more than {MAX_DISTINCT_IMAGES} distinct images at once (got {})",
            images.len()
        );
    }
    if !(1..=MAX_REPEAT_COUNT).contains(&config.repeat_count) {
        anyhow::bail!(
            "copies per image must be between 1 and {MAX_REPEAT_COUNT} (got {})",
            config.repeat_count
        );
    }

    let geometry = LayoutCalculator::new(config.clone()).compute(images.len())?;
    let pages = PageCompositor::new(geometry).compose(images);
    let pdf = encode_pdf(&pages, geometry.dpi)?;
    Ok(pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::core::geometry::PixelBox;
    use crate::core::model::{Detection, Level};
    use crate::core::SheetError;

    struct ScriptedDetector {
        calls: Cell<usize>,
        fail_on: Option<usize>,
    }

    impl TextDetector for ScriptedDetector {
        fn detect(&self, page: &RasterPage) -> crate::core::Result<Vec<Detection>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_on == Some(page.page_number()) {
                return Err(SheetError::DetectionEngine("engine crashed".to_string()));
            }
            Ok(vec![Detection {
                level: Level::Word,
                page_num: 1,
                block_num: 1,
                par_num: 1,
                line_num: 1,
                word_num: 1,
                bbox: PixelBox::new(2, 2, 6, 4),
                confidence: 95.0,
                text: "Tuba".to_string(),
            }])
        }
    }

    fn page(idx: usize) -> RasterPage {
        RasterPage {
            page_idx: idx,
            dpi: 100,
            image: RgbImage::new(20, 10),
        }
    }

    fn pipeline(fail_on: Option<usize>) -> DetectionPipeline<ScriptedDetector> {
        DetectionPipeline::new(
            PdfRasterizer::new(),
            ScriptedDetector {
                calls: Cell::new(0),
                fail_on,
            },
            PartPredictor::default(),
        )
    }

    fn keywords() -> InstrumentKeywordSet {
        InstrumentKeywordSet::from_yaml_str("Tuba: [tuba]\n").unwrap()
    }

    #[test]
    fn predicts_each_page() {
        let run = pipeline(None)
            .detect_pages("march", &[page(0), page(1)], &keywords())
            .unwrap();
        assert_eq!(run.detections.pages.len(), 2);
        assert_eq!(run.detections.part_names(), vec!["Tuba", "Tuba"]);
        assert_eq!(run.annotated[1].0, 2);

        // the label repeats on page 2, so both pages form one part
        assert_eq!(run.detections.parts.len(), 1);
        assert_eq!(run.detections.parts[0].pages, PageRange::new(1, Some(2)));
        let tuba = run.detections.default_part("Tuba").unwrap();
        assert_eq!((tuba.from_page(), tuba.to_page()), (1, 2));
    }

    #[test]
    fn ocr_failure_is_not_an_empty_page() {
        let pipeline = pipeline(Some(2));
        let err = pipeline
            .detect_pages("march", &[page(0), page(1), page(2)], &keywords())
            .unwrap_err();
        assert!(err.to_string().contains("page 2"));
        assert!(matches!(
            err.downcast_ref::<SheetError>(),
            Some(SheetError::DetectionEngine(_))
        ));
        assert_eq!(pipeline.detector.calls.get(), 2);
    }

    #[test]
    fn export_writes_known_layout() {
        let run = pipeline(None)
            .detect_pages("march", &[page(0)], &keywords())
            .unwrap();
        let root = tempfile::tempdir().unwrap();
        let dir = export_run(&run, root.path()).unwrap();

        assert_eq!(dir, root.path().join("march"));
        assert!(dir.join("boxes_1.png").exists());
        assert!(dir.join("predictions.txt").exists());
        let json = fs::read_to_string(dir.join("predictions.json")).unwrap();
        assert!(json.contains("\"sheet_name\": \"march\""));
    }

    #[test]
    fn tesseract_pipeline_follows_config() {
        let mut config = DetectionConfig::new(PathBuf::from("scores/march.pdf"));
        config.ocr.oem = Some(crate::ocr::bridge::LSTM_ONLY_OEM);
        config.predictor.max_part_blocks = 3;

        let pipeline = DetectionPipeline::from_config(&config);
        assert_eq!(pipeline.detector.config(), &config.ocr);
        assert_eq!(pipeline.predictor.config().max_part_blocks, 3);
        assert_eq!(config.sheet_name(), "march");
    }

    #[test]
    fn rejects_too_many_images() {
        let images = vec![DynamicImage::new_rgb8(2, 2); MAX_DISTINCT_IMAGES + 1];
        assert!(generate_button_sheet(&images, &LayoutConfig::default()).is_err());
    }

    #[test]
    fn layout_error_comes_before_compositing() {
        let config = LayoutConfig::default().with_diameter(400.0);
        let err = generate_button_sheet(&[DynamicImage::new_rgb8(2, 2)], &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::core::LayoutError>(),
            Some(crate::core::LayoutError::NonPositiveGrid { .. })
        ));
    }
}
