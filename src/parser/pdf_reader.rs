use std::ops::Range;
use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::debug;

use crate::core::{Result, SheetError};
use crate::parser::page_range::PageRange;

#[derive(Debug, Clone)]
pub struct PdfReader {
    path: PathBuf,
}

impl PdfReader {
    pub fn new(path: PathBuf) -> Result<Self> {
        if !path.is_file() {
            return Err(SheetError::InvalidDocument {
                reason: "file does not exist".to_string(),
                path,
            });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> Result<usize> {
        Ok(self.load()?.get_pages().len())
    }

    /// Resolves a user page range against this document.
    pub fn resolve_range(&self, range: PageRange) -> Result<Range<usize>> {
        let page_count = self.page_count()?;
        range.resolve(&self.path, page_count)
    }

    /// Copies the pages in `range` into a standalone PDF, e.g. one part of a
    /// score that was uploaded as a single file.
    pub fn extract_pages(&self, range: PageRange) -> Result<Vec<u8>> {
        let mut doc = self.load()?;
        let pages = doc.get_pages();
        let keep = range.resolve(&self.path, pages.len())?;

        let drop: Vec<u32> = pages
            .keys()
            .copied()
            .filter(|number| !keep.contains(&(*number as usize - 1)))
            .collect();
        debug!(
            path = %self.path.display(),
            kept = keep.len(),
            dropped = drop.len(),
            "extracting page range"
        );
        doc.delete_pages(&drop);
        doc.prune_objects();

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }

    fn load(&self) -> Result<Document> {
        Document::load(&self.path).map_err(|e| SheetError::InvalidDocument {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}
