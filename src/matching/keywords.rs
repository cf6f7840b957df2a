use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::core::{Result, SheetError};

/// Instrument name to the phrases that identify its part, e.g.
///
/// ```yaml
/// Trompet: ["trompet", "trumpet", "tromba"]
/// Fløyte: ["fløyte", "flute"]
/// Altsaksofon: ["alto sax", "altsaksofon"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<String>>")]
pub struct InstrumentKeywordSet {
    instruments: BTreeMap<String, Vec<String>>,
}

impl InstrumentKeywordSet {
    pub fn new(instruments: BTreeMap<String, Vec<String>>) -> Result<Self> {
        if instruments.is_empty() {
            return Err(SheetError::KeywordConfig("no instruments defined".to_string()));
        }
        for (instrument, keywords) in &instruments {
            if instrument.trim().is_empty() {
                return Err(SheetError::KeywordConfig(
                    "instrument name must not be empty".to_string(),
                ));
            }
            if keywords.is_empty() {
                return Err(SheetError::KeywordConfig(format!(
                    "instrument '{instrument}' has no keywords"
                )));
            }
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(SheetError::KeywordConfig(format!(
                    "instrument '{instrument}' has an empty keyword"
                )));
            }
        }
        Ok(Self { instruments })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Instrument names in name order.
    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }

    /// Every `(instrument, keyword)` pair, instruments in name order and
    /// keywords in configured order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.instruments.iter().flat_map(|(instrument, keywords)| {
            keywords
                .iter()
                .map(move |keyword| (instrument.as_str(), keyword.as_str()))
        })
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for InstrumentKeywordSet {
    type Error = SheetError;

    fn try_from(value: BTreeMap<String, Vec<String>>) -> Result<Self> {
        Self::new(value)
    }
}

/// Number of whitespace-separated words in a keyword phrase.
pub fn word_count(keyword: &str) -> usize {
    keyword.split_whitespace().count()
}
