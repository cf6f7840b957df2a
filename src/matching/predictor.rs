use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::model::{Detection, KeywordMatch, PartPrediction};
use crate::matching::keywords::InstrumentKeywordSet;
use crate::matching::matcher::{word_detections, KeywordMatcher, DEFAULT_SIMILARITY_THRESHOLD};

/// Pages with hits in more blocks than this are treated as a full score.
pub const DEFAULT_MAX_PART_BLOCKS: usize = 2;

/// Both values were picked empirically; they are tunable, not derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub similarity_threshold: f64,
    pub max_part_blocks: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_part_blocks: DEFAULT_MAX_PART_BLOCKS,
        }
    }
}

/// Outcome of matching and grouping one page.
#[derive(Debug, Clone, Default)]
pub struct PagePrediction {
    pub matches: Vec<KeywordMatch>,
    pub predictions: Vec<PartPrediction>,
}

#[derive(Debug, Clone)]
pub struct PartPredictor {
    config: PredictorConfig,
    matcher: KeywordMatcher,
}

impl Default for PartPredictor {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl PartPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            config,
            matcher: KeywordMatcher::new(config.similarity_threshold),
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Matches keywords against a page's detections and groups the hits
    /// into part predictions.
    pub fn predict_page(
        &self,
        detections: &[Detection],
        keywords: &InstrumentKeywordSet,
    ) -> PagePrediction {
        let words = word_detections(detections);
        let matches = self.matcher.find_matches(&words, keywords);
        let predictions = self.group(&words, &matches);
        PagePrediction {
            matches,
            predictions,
        }
    }

    /// One prediction per block holding a hit, or a single full-score
    /// prediction when hits are spread over too many blocks.
    pub fn group(&self, words: &[&Detection], matches: &[KeywordMatch]) -> Vec<PartPrediction> {
        let mut by_block: BTreeMap<u32, BTreeSet<String>> = BTreeMap::new();
        for m in matches {
            by_block
                .entry(m.block_num)
                .or_default()
                .insert(m.instrument.clone());
        }

        debug!(
            matches = matches.len(),
            blocks = by_block.len(),
            "grouped keyword matches"
        );

        if by_block.is_empty() {
            return Vec::new();
        }
        if by_block.len() > self.config.max_part_blocks {
            warn!(
                blocks = by_block.len(),
                limit = self.config.max_part_blocks,
                "instrument names spread over too many blocks, assuming full score"
            );
            return vec![PartPrediction::full_score()];
        }

        by_block
            .into_iter()
            .map(|(block_num, instruments)| {
                let in_block: Vec<&Detection> = words
                    .iter()
                    .copied()
                    .filter(|w| w.block_num == block_num)
                    .collect();
                let name = in_block
                    .iter()
                    .map(|w| w.text.trim())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                let region = in_block
                    .iter()
                    .map(|w| w.bbox)
                    .reduce(|acc, b| acc.union(&b));
                PartPrediction {
                    name,
                    instruments,
                    block_num: Some(block_num),
                    region,
                }
            })
            .collect()
    }
}
