use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::model::{KeywordMatch, PartPrediction, SheetDetections, SheetPart};
use crate::export::Exporter;

/// Contents of `predictions.json`. Raw OCR rows stay out; they are in the
/// text report.
#[derive(Debug, Serialize)]
pub struct PredictionsFile<'a> {
    pub sheet_name: &'a str,
    pub parts: &'a [SheetPart],
    /// Instrument to the name and pages of its default part.
    pub default_parts: BTreeMap<&'a str, DefaultPart<'a>>,
    pub pages: Vec<PageSummary<'a>>,
}

#[derive(Debug, Serialize)]
pub struct DefaultPart<'a> {
    pub part: usize,
    pub name: &'a str,
    pub from_page: usize,
    pub to_page: usize,
}

#[derive(Debug, Serialize)]
pub struct PageSummary<'a> {
    pub page_number: usize,
    pub tokens: usize,
    pub predictions: &'a [PartPrediction],
    pub matches: &'a [KeywordMatch],
}

impl<'a> PredictionsFile<'a> {
    pub fn new(sheet: &'a SheetDetections) -> Self {
        let default_parts = sheet
            .default_parts
            .iter()
            .filter_map(|(instrument, &idx)| {
                let part = sheet.parts.get(idx)?;
                Some((
                    instrument.as_str(),
                    DefaultPart {
                        part: idx,
                        name: &part.name,
                        from_page: part.from_page(),
                        to_page: part.to_page(),
                    },
                ))
            })
            .collect();

        let pages = sheet
            .pages
            .iter()
            .map(|page| PageSummary {
                page_number: page.page_number,
                tokens: page.detections.len(),
                predictions: &page.predictions,
                matches: &page.matches,
            })
            .collect();

        Self {
            sheet_name: &sheet.sheet_name,
            parts: &sheet.parts,
            default_parts,
            pages,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, sheet: &SheetDetections) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join("predictions.json");
        let data = serde_json::to_string_pretty(&PredictionsFile::new(sheet))?;
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::PageDetections;
    use crate::parser::PageRange;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeSet;

    #[test]
    fn writes_parts_and_defaults() {
        let sheet = SheetDetections {
            sheet_name: "march".to_string(),
            pages: vec![PageDetections {
                page_number: 2,
                width: 10,
                height: 10,
                detections: vec![],
                matches: vec![],
                predictions: vec![],
            }],
            parts: vec![SheetPart {
                name: "Trompet 1".to_string(),
                instruments: BTreeSet::from(["Trompet".to_string()]),
                pages: PageRange::new(2, Some(3)),
            }],
            default_parts: BTreeMap::from([("Trompet".to_string(), 0), ("Tuba".to_string(), 7)]),
        };

        let dir = tempfile::tempdir().unwrap();
        JsonExporter::new(dir.path().to_path_buf())
            .export(&sheet)
            .unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("predictions.json")).unwrap())
                .unwrap();

        assert_eq!(written["sheet_name"], json!("march"));
        assert_eq!(
            written["parts"][0],
            json!({
                "name": "Trompet 1",
                "instruments": ["Trompet"],
                "pages": {"start": 2, "end": 3},
            })
        );
        // dangling indices are dropped
        assert_eq!(
            written["default_parts"],
            json!({"Trompet": {"part": 0, "name": "Trompet 1", "from_page": 2, "to_page": 3}})
        );
        assert_eq!(written["pages"][0]["page_number"], json!(2));
        assert_eq!(written["pages"][0]["tokens"], json!(0));
    }
}
