use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{Result, SheetError};

/// Inclusive 1-indexed page range as users write it: `"3"`, `"3-5"` or
/// `"3-"` for "through the last page".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl PageRange {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    pub fn single(page: usize) -> Self {
        Self::new(page, Some(page))
    }

    pub fn all() -> Self {
        Self::new(1, None)
    }

    /// Converts to a 0-indexed half-open range for a document with
    /// `page_count` pages. An end past the last page is clamped.
    pub fn resolve(&self, path: &Path, page_count: usize) -> Result<Range<usize>> {
        let invalid = || SheetError::PageRange {
            path: path.to_path_buf(),
            start: self.start,
            end: self.end,
            page_count,
        };

        if self.start == 0 || self.start > page_count {
            return Err(invalid());
        }
        let end = match self.end {
            Some(end) if end < self.start => return Err(invalid()),
            Some(end) => end.min(page_count),
            None => page_count,
        };
        Ok(self.start - 1..end)
    }
}

impl Default for PageRange {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) if end == self.start => write!(f, "{}", self.start),
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-", self.start),
        }
    }
}

impl FromStr for PageRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| format!("invalid page number '{}': {e}", part.trim()))
        };

        match s.split_once('-') {
            None => parse(s).map(PageRange::single),
            Some((start, end)) if end.trim().is_empty() => Ok(PageRange::new(parse(start)?, None)),
            Some((start, end)) => Ok(PageRange::new(parse(start)?, Some(parse(end)?))),
        }
    }
}
