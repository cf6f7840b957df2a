use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::SheetDetections;
use crate::export::report::DetectionReporter;
use crate::export::Exporter;

/// Writes `predictions.txt`: a word table per page followed by the
/// predicted parts.
#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn render(sheet: &SheetDetections) -> String {
        let reporter = DetectionReporter::new();
        let mut out = String::new();

        for page in &sheet.pages {
            let _ = writeln!(out, "=== {} page {} ===\n", sheet.sheet_name, page.page_number);
            out.push_str(&reporter.table(&page.detections));
            out.push('\n');
            for m in &page.matches {
                let _ = writeln!(
                    out,
                    "match: '{}' ~ '{}' ({}) block {} similarity {:.3}",
                    m.detected_text, m.keyword, m.instrument, m.block_num, m.similarity
                );
            }
            out.push('\n');
        }

        for part in &sheet.parts {
            let instruments: Vec<&str> = part.instruments.iter().map(String::as_str).collect();
            let _ = writeln!(
                out,
                "part: {} pages {} [{}]",
                part.name,
                part.pages,
                instruments.join(", ")
            );
        }
        for instrument in sheet.default_parts.keys() {
            if let Some(part) = sheet.default_part(instrument) {
                let _ = writeln!(out, "default: {instrument} -> {} ({})", part.name, part.pages);
            }
        }
        if !sheet.parts.is_empty() {
            out.push('\n');
        }

        let part_names = sheet.part_names();
        let instruments: Vec<Vec<&str>> = sheet
            .pages
            .iter()
            .flat_map(|page| page.predictions.iter())
            .map(|p| p.instruments.iter().map(String::as_str).collect())
            .collect();
        let _ = writeln!(out, "partNames: {part_names:?}, instrumentses: {instruments:?}");
        out
    }
}

impl Exporter for TextExporter {
    fn export(&self, sheet: &SheetDetections) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        fs::write(self.out_dir.join("predictions.txt"), Self::render(sheet))?;
        Ok(())
    }
}
