pub mod json_export;
pub mod report;
pub mod text_export;

use anyhow::Result;

use crate::core::model::SheetDetections;

pub use json_export::JsonExporter;
pub use report::DetectionReporter;
pub use text_export::TextExporter;

pub trait Exporter {
    fn export(&self, sheet: &SheetDetections) -> Result<()>;
}
