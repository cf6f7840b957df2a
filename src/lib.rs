pub mod core;
pub mod export;
pub mod layout;
pub mod matching;
pub mod ocr;
pub mod parser;
pub mod pipeline;

pub use crate::core::model::{Detection, PartPrediction, RasterPage, SheetDetections};
pub use crate::core::{LayoutError, SheetError};
