use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::core::model::RasterPage;
use crate::core::{Result, SheetError};
use crate::parser::{PageRange, PdfReader};

/// Renders PDF pages to bitmaps through poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    binary: PathBuf,
    scratch_root: Option<PathBuf>,
}

impl Default for PdfRasterizer {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
            scratch_root: None,
        }
    }
}

impl PdfRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: PathBuf) -> Self {
        self.binary = binary;
        self
    }

    /// Renders into a scratch directory under `root` instead of the system
    /// temp dir.
    pub fn with_scratch_root(mut self, root: PathBuf) -> Self {
        self.scratch_root = Some(root);
        self
    }

    pub fn rasterize(&self, pdf_path: &Path, dpi: u32, range: PageRange) -> Result<Vec<RasterPage>> {
        let reader = PdfReader::new(pdf_path.to_path_buf())?;
        let pages = reader.resolve_range(range)?;
        info!(
            path = %pdf_path.display(),
            dpi,
            first = pages.start + 1,
            last = pages.end,
            "rasterizing pages"
        );

        let scratch = match &self.scratch_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                tempfile::Builder::new().prefix("raster-").tempdir_in(root)?
            }
            None => tempfile::Builder::new().prefix("raster-").tempdir()?,
        };
        let prefix = scratch.path().join("page");

        // pdftoppm page numbers are 1-based and inclusive
        let status = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg((pages.start + 1).to_string())
            .arg("-l")
            .arg(pages.end.to_string())
            .arg(pdf_path)
            .arg(&prefix)
            .status()
            .map_err(|e| {
                SheetError::Rasterizer(format!("failed to invoke {}: {e}", self.binary.display()))
            })?;

        if !status.success() {
            return Err(SheetError::Rasterizer(format!(
                "{} exited with {status} on {}",
                self.binary.display(),
                pdf_path.display()
            )));
        }

        // Output names are `page-<n>.png` with n zero-padded to a common
        // width, so a lexical sort is page order.
        let mut rendered: Vec<PathBuf> = fs::read_dir(scratch.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        rendered.sort();

        if rendered.len() != pages.len() {
            return Err(SheetError::Rasterizer(format!(
                "expected {} rendered pages, found {}",
                pages.len(),
                rendered.len()
            )));
        }

        let mut out = Vec::with_capacity(rendered.len());
        for (page_idx, path) in pages.zip(rendered) {
            let image = image::open(&path)?.to_rgb8();
            debug!(
                page = page_idx + 1,
                width = image.width(),
                height = image.height(),
                "rendered page"
            );
            out.push(RasterPage {
                page_idx,
                dpi,
                image,
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pdf_fails_before_rendering() {
        let rasterizer = PdfRasterizer::new().with_binary(PathBuf::from("/nonexistent/pdftoppm"));
        let err = rasterizer
            .rasterize(Path::new("/nonexistent/score.pdf"), 100, PageRange::all())
            .unwrap_err();
        assert!(matches!(err, SheetError::InvalidDocument { .. }));
    }

    #[test]
    fn missing_binary_is_a_rasterizer_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score.pdf");
        let pdf = crate::layout::encode_pdf(&[image::RgbImage::new(8, 8)], 72).unwrap();
        fs::write(&path, pdf).unwrap();

        let err = PdfRasterizer::new()
            .with_binary(PathBuf::from("/nonexistent/pdftoppm"))
            .rasterize(&path, 100, PageRange::all())
            .unwrap_err();
        assert!(matches!(err, SheetError::Rasterizer(_)));
        assert!(err.to_string().starts_with("page rasterizer failed"));
    }
}
