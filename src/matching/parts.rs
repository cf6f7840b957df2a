//! Turns per-page predictions into parts spanning page ranges.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use tracing::debug;

use crate::core::model::{PageDetections, PartPrediction, SheetPart, FULL_SCORE};
use crate::matching::keywords::InstrumentKeywordSet;
use crate::parser::PageRange;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartAssembly {
    pub parts: Vec<SheetPart>,
    /// Instrument name to an index into `parts`.
    pub default_parts: BTreeMap<String, usize>,
}

/// Walks the pages in order. A page with predictions opens one part per
/// prediction, unless it repeats the names and instruments of the parts
/// still open, in which case those parts grow by a page. A page without
/// predictions continues the open parts. Pages before the first
/// prediction belong to no part.
///
/// Every instrument gets the first part listing it as its default. Those
/// listed in no part fall back to the first full score, if there is one.
pub fn assemble_parts(pages: &[PageDetections], keywords: &InstrumentKeywordSet) -> PartAssembly {
    let mut parts: Vec<SheetPart> = Vec::new();
    let mut open: Range<usize> = 0..0;

    for page in pages {
        let n = page.page_number;
        if page.predictions.is_empty() || repeats(&parts[open.clone()], &page.predictions) {
            if open.is_empty() {
                debug!(page = n, "page before any part label");
            }
            for part in &mut parts[open.clone()] {
                part.pages.end = Some(n);
            }
            continue;
        }

        let first = parts.len();
        parts.extend(page.predictions.iter().map(|p| SheetPart {
            name: p.name.clone(),
            instruments: p.instruments.clone(),
            pages: PageRange::single(n),
        }));
        open = first..parts.len();
    }

    let default_parts = default_parts(&parts, keywords);
    debug!(
        parts = parts.len(),
        defaults = default_parts.len(),
        "assembled parts"
    );
    PartAssembly {
        parts,
        default_parts,
    }
}

fn repeats(open: &[SheetPart], predictions: &[PartPrediction]) -> bool {
    !open.is_empty()
        && open.len() == predictions.len()
        && open
            .iter()
            .zip(predictions)
            .all(|(part, p)| part.name == p.name && part.instruments == p.instruments)
}

fn default_parts(parts: &[SheetPart], keywords: &InstrumentKeywordSet) -> BTreeMap<String, usize> {
    let mut defaults = BTreeMap::new();
    for (idx, part) in parts.iter().enumerate() {
        for instrument in part.instruments.iter().filter(|i| *i != FULL_SCORE) {
            defaults.entry(instrument.clone()).or_insert(idx);
        }
    }

    let full_score = parts
        .iter()
        .position(|part| part.instruments == BTreeSet::from([FULL_SCORE.to_string()]));
    if let Some(idx) = full_score {
        for instrument in keywords.instruments() {
            defaults.entry(instrument.to_string()).or_insert(idx);
        }
    }
    defaults
}
