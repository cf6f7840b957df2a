pub mod bridge;
pub mod renderer;

pub use bridge::{OcrConfig, TesseractBridge};
pub use renderer::PdfRasterizer;

use crate::core::model::{Detection, RasterPage};
use crate::core::Result;

/// Produces every token the engine sees on a page, structural rows and
/// blank words included. An empty result means the engine ran and found
/// nothing; engine failures are errors.
pub trait TextDetector {
    fn detect(&self, page: &RasterPage) -> Result<Vec<Detection>>;
}
