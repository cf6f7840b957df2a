//! Error types shared by the detection and layout pipelines.

use std::path::PathBuf;

use thiserror::Error;

/// Layout parameters that cannot produce a printable grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The footprint does not fit the printable area even once.
    #[error("layout yields a non-positive grid ({columns} columns x {rows} rows)")]
    NonPositiveGrid { columns: i64, rows: i64 },
    /// Footprint plus spacing collapses to zero pixels on an axis.
    #[error("item footprint plus spacing is zero pixels wide or high")]
    ZeroFootprint,
    #[error("DPI must be positive")]
    ZeroDpi,
    /// A millimetre length below zero (or NaN).
    #[error("{field} must be a non-negative length")]
    NegativeLength { field: &'static str },
    /// No images or a zero repeat count.
    #[error("nothing to lay out ({images} images x {repeat} copies)")]
    EmptyInput { images: usize, repeat: u32 },
}

/// Errors surfaced by the core. None of them are retried.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("invalid PDF document {}: {reason}", .path.display())]
    InvalidDocument { path: PathBuf, reason: String },

    #[error(
        "page range {start}-{} is invalid for {} with {page_count} pages",
        display_end(.end),
        .path.display()
    )]
    PageRange {
        path: PathBuf,
        start: usize,
        end: Option<usize>,
        page_count: usize,
    },

    #[error("page rasterizer failed: {0}")]
    Rasterizer(String),

    #[error("OCR engine failed: {0}")]
    DetectionEngine(String),

    #[error("invalid keyword configuration: {0}")]
    KeywordConfig(String),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("image error")]
    Image(#[from] image::ImageError),

    #[error("PDF error")]
    Pdf(#[from] lopdf::Error),

    #[error("YAML error")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

fn display_end(end: &Option<usize>) -> String {
    end.map(|e| e.to_string()).unwrap_or_else(|| "end".to_string())
}

pub type Result<T, E = SheetError> = std::result::Result<T, E>;
