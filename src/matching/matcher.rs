use crate::core::model::{Detection, KeywordMatch};
use crate::matching::compare::text_similarity;
use crate::matching::keywords::{word_count, InstrumentKeywordSet};

/// Similarity a span must strictly exceed to count as a keyword hit.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Word-level rows only; everything else is structure.
pub fn word_detections(detections: &[Detection]) -> Vec<&Detection> {
    detections.iter().filter(|d| d.is_word()).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordMatcher {
    threshold: f64,
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl KeywordMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Tries every keyword at every word position. A phrase of N words is
    /// compared against the next N words, and only when all of them belong
    /// to the same OCR block as the first. All hits are kept.
    pub fn find_matches(
        &self,
        words: &[&Detection],
        keywords: &InstrumentKeywordSet,
    ) -> Vec<KeywordMatch> {
        let mut matches = Vec::new();

        for (instrument, keyword) in keywords.pairs() {
            let n = word_count(keyword);
            if n == 0 || n > words.len() {
                continue;
            }
            for i in 0..=words.len() - n {
                let span = &words[i..i + n];
                let block = span[0].block_num;
                if span.iter().any(|w| w.block_num != block) {
                    continue;
                }

                let detected_text = span
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let similarity = text_similarity(&detected_text, keyword);
                if similarity > self.threshold {
                    matches.push(KeywordMatch {
                        detection_index: i,
                        block_num: block,
                        instrument: instrument.to_string(),
                        keyword: keyword.to_string(),
                        detected_text,
                        similarity,
                    });
                }
            }
        }

        matches
    }
}
