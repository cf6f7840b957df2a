use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{LayoutError, Result};

const MM_PER_INCH: f64 = 25.4;

/// Physical layout of a button sheet. Lengths are millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub margin_top_mm: f64,
    pub margin_right_mm: f64,
    pub margin_bottom_mm: f64,
    pub margin_left_mm: f64,
    /// Visible face of one item.
    pub item_width_mm: f64,
    pub item_height_mm: f64,
    /// Wrapped around the back of the button; added on every side.
    pub backside_padding_mm: f64,
    pub spacing_mm: f64,
    pub outline_mm: f64,
    pub dpi: u32,
    /// Copies printed of every distinct image.
    pub repeat_count: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_top_mm: 3.0,
            margin_right_mm: 3.0,
            margin_bottom_mm: 3.0,
            margin_left_mm: 3.0,
            item_width_mm: 67.0,
            item_height_mm: 67.0,
            backside_padding_mm: 5.0,
            spacing_mm: 0.0,
            outline_mm: 0.5,
            dpi: 300,
            repeat_count: 1,
        }
    }
}

impl LayoutConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&yaml)?)
    }

    /// Sets a round item of the given visible diameter.
    pub fn with_diameter(mut self, diameter_mm: f64) -> Self {
        self.item_width_mm = diameter_mm;
        self.item_height_mm = diameter_mm;
        self
    }

    fn lengths(&self) -> [(&'static str, f64); 11] {
        [
            ("page_width_mm", self.page_width_mm),
            ("page_height_mm", self.page_height_mm),
            ("margin_top_mm", self.margin_top_mm),
            ("margin_right_mm", self.margin_right_mm),
            ("margin_bottom_mm", self.margin_bottom_mm),
            ("margin_left_mm", self.margin_left_mm),
            ("item_width_mm", self.item_width_mm),
            ("item_height_mm", self.item_height_mm),
            ("backside_padding_mm", self.backside_padding_mm),
            ("spacing_mm", self.spacing_mm),
            ("outline_mm", self.outline_mm),
        ]
    }
}

/// `floor(dpi * mm / 25.4)`
pub fn mm_to_px(mm: f64, dpi: u32) -> i64 {
    (dpi as f64 * mm / MM_PER_INCH).floor() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margins {
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    pub left: i64,
}

/// Pixel geometry derived from a [`LayoutConfig`] and an image count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutGeometry {
    pub dpi: u32,
    pub page_width: u32,
    pub page_height: u32,
    pub margins: Margins,
    pub footprint_width: u32,
    pub footprint_height: u32,
    pub spacing: u32,
    pub outline: u32,
    pub columns: u32,
    pub rows: u32,
    pub items_per_page: u32,
    pub total_images: usize,
    pub repeat_count: u32,
    pub total_pages: usize,
    pub origin_left: u32,
    pub origin_top: u32,
}

impl LayoutGeometry {
    pub fn grid_width(&self) -> u32 {
        self.columns * self.footprint_width + (self.columns - 1) * self.spacing
    }

    pub fn grid_height(&self) -> u32 {
        self.rows * self.footprint_height + (self.rows - 1) * self.spacing
    }

    /// Top-left pixel of the cell at `(row, col)`.
    pub fn cell_offset(&self, row: u32, col: u32) -> (u32, u32) {
        (
            self.origin_left + col * (self.footprint_width + self.spacing),
            self.origin_top + row * (self.footprint_height + self.spacing),
        )
    }

    /// Which source image goes into a cell, or `None` once all copies of
    /// every image are placed.
    pub fn image_index(&self, page: usize, row: u32, col: u32) -> Option<usize> {
        let cell = page * self.items_per_page as usize
            + row as usize * self.columns as usize
            + col as usize;
        let idx = cell / self.repeat_count as usize;
        (idx < self.total_images).then_some(idx)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutCalculator {
    config: LayoutConfig,
}

impl LayoutCalculator {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn compute(&self, total_images: usize) -> Result<LayoutGeometry, LayoutError> {
        let c = &self.config;
        if c.dpi == 0 {
            return Err(LayoutError::ZeroDpi);
        }
        // `!(v >= 0.0)` also rejects NaN
        if let Some((field, _)) = c.lengths().into_iter().find(|(_, v)| !(*v >= 0.0)) {
            return Err(LayoutError::NegativeLength { field });
        }
        if total_images == 0 || c.repeat_count == 0 {
            return Err(LayoutError::EmptyInput {
                images: total_images,
                repeat: c.repeat_count,
            });
        }

        let px = |mm: f64| mm_to_px(mm, c.dpi);
        let page_width = px(c.page_width_mm);
        let page_height = px(c.page_height_mm);
        let margins = Margins {
            top: px(c.margin_top_mm),
            right: px(c.margin_right_mm),
            bottom: px(c.margin_bottom_mm),
            left: px(c.margin_left_mm),
        };
        let padding = px(c.backside_padding_mm);
        let footprint_width = px(c.item_width_mm) + 2 * padding;
        let footprint_height = px(c.item_height_mm) + 2 * padding;
        let spacing = px(c.spacing_mm);
        let outline = px(c.outline_mm);

        if footprint_width <= 0 || footprint_height <= 0 {
            return Err(LayoutError::ZeroFootprint);
        }

        // One spacing unit is reserved even for a single column.
        let columns = (page_width - margins.left - margins.right - spacing)
            .div_euclid(footprint_width + spacing);
        let rows = (page_height - margins.top - margins.bottom - spacing)
            .div_euclid(footprint_height + spacing);
        if columns <= 0 || rows <= 0 {
            return Err(LayoutError::NonPositiveGrid { columns, rows });
        }

        let items_per_page = columns * rows;
        let total_items = total_images as i64 * c.repeat_count as i64;
        let total_pages = (total_items + items_per_page - 1) / items_per_page;

        let grid_width = columns * footprint_width + (columns - 1) * spacing;
        let grid_height = rows * footprint_height + (rows - 1) * spacing;

        let geometry = LayoutGeometry {
            dpi: c.dpi,
            page_width: page_width as u32,
            page_height: page_height as u32,
            margins,
            footprint_width: footprint_width as u32,
            footprint_height: footprint_height as u32,
            spacing: spacing as u32,
            outline: outline as u32,
            columns: columns as u32,
            rows: rows as u32,
            items_per_page: items_per_page as u32,
            total_images,
            repeat_count: c.repeat_count,
            total_pages: total_pages as usize,
            origin_left: ((page_width - grid_width) / 2) as u32,
            origin_top: ((page_height - grid_height) / 2) as u32,
        };
        info!(
            columns = geometry.columns,
            rows = geometry.rows,
            pages = geometry.total_pages,
            footprint = geometry.footprint_width,
            "computed button layout"
        );
        Ok(geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// 254 dpi makes one millimetre exactly ten pixels.
    fn bare(page_mm: f64, item_mm: f64) -> LayoutConfig {
        LayoutConfig {
            page_width_mm: page_mm,
            page_height_mm: page_mm,
            margin_top_mm: 0.0,
            margin_right_mm: 0.0,
            margin_bottom_mm: 0.0,
            margin_left_mm: 0.0,
            item_width_mm: item_mm,
            item_height_mm: item_mm,
            backside_padding_mm: 0.0,
            spacing_mm: 0.0,
            outline_mm: 0.0,
            dpi: 254,
            repeat_count: 1,
        }
    }

    #[test]
    fn converts_mm_with_floor() {
        assert_eq!(mm_to_px(210.0, 300), 2480);
        assert_eq!(mm_to_px(297.0, 300), 3507);
        assert_eq!(mm_to_px(0.5, 300), 5);
        assert_eq!(mm_to_px(100.0, 254), 1000);
    }

    #[test]
    fn default_a4_layout() {
        let geometry = LayoutCalculator::default().compute(5).unwrap();
        assert_eq!(geometry.page_width, 2480);
        assert_eq!(geometry.page_height, 3507);
        assert_eq!(geometry.footprint_width, 791 + 2 * 59);
        assert_eq!(geometry.columns, 2);
        assert_eq!(geometry.rows, 3);
        assert_eq!(geometry.items_per_page, 6);
        assert_eq!(geometry.total_pages, 1);
        assert_eq!(geometry.origin_left, (2480 - 2 * 909) / 2);
        assert_eq!(geometry.origin_top, (3507 - 3 * 909) / 2);
        assert_eq!(geometry.outline, 5);
    }

    #[test]
    fn zero_spacing_zero_margin_fills_page() {
        let geometry = LayoutCalculator::new(bare(100.0, 20.0)).compute(1).unwrap();
        assert_eq!(geometry.columns, 5);
        assert_eq!(geometry.rows, 5);
        assert_eq!(geometry.origin_left, 0);
        assert_eq!(geometry.grid_width(), 1000);
    }

    #[test]
    fn spacing_is_reserved_once_more_than_the_gaps() {
        // 5 * 200 + 4 * 10 = 1040 > 1000 - 10, so only four fit
        let config = LayoutConfig {
            spacing_mm: 1.0,
            ..bare(100.0, 20.0)
        };
        let geometry = LayoutCalculator::new(config).compute(1).unwrap();
        assert_eq!(geometry.columns, 4);
        assert_eq!(geometry.grid_width(), 4 * 200 + 3 * 10);
        assert_eq!(geometry.origin_left, (1000 - 830) / 2);
    }

    #[test]
    fn page_count_matches_ceiling() {
        // 40mm items on a 100x80mm page: 2 x 2 per page
        let config = LayoutConfig {
            page_height_mm: 80.0,
            repeat_count: 3,
            ..bare(100.0, 40.0)
        };
        let geometry = LayoutCalculator::new(config).compute(5).unwrap();
        assert_eq!(geometry.items_per_page, 4);
        assert_eq!(geometry.total_pages, 4);
    }

    #[test]
    fn page_count_is_monotonic() {
        let mut previous = 0;
        for images in 1..30 {
            for repeat in 1..5 {
                let config = LayoutConfig {
                    repeat_count: repeat,
                    ..bare(100.0, 30.0)
                };
                let geometry = LayoutCalculator::new(config).compute(images).unwrap();
                let expected = (images * repeat as usize).div_ceil(geometry.items_per_page as usize);
                assert_eq!(geometry.total_pages, expected);
                if repeat == 1 {
                    assert!(geometry.total_pages >= previous);
                    previous = geometry.total_pages;
                }
            }
        }
    }

    #[test]
    fn grid_fits_inside_page() {
        for item in [10.0, 23.0, 57.0, 67.0, 100.0, 140.0] {
            for spacing in [0.0, 1.5, 4.0] {
                let config = LayoutConfig {
                    item_width_mm: item,
                    item_height_mm: item,
                    spacing_mm: spacing,
                    ..LayoutConfig::default()
                };
                let g = LayoutCalculator::new(config).compute(3).unwrap();
                assert!(g.grid_width() + 2 * g.origin_left <= g.page_width);
                assert!(g.grid_height() + 2 * g.origin_top <= g.page_height);
            }
        }
    }

    #[test]
    fn oversized_item_is_rejected() {
        let err = LayoutCalculator::new(LayoutConfig::default().with_diameter(250.0))
            .compute(1)
            .unwrap_err();
        assert!(matches!(err, LayoutError::NonPositiveGrid { columns: 0, .. }));
    }

    #[test]
    fn negative_lengths_are_rejected() {
        // would otherwise squeeze a third column onto A4
        let config = LayoutConfig {
            spacing_mm: -20.0,
            ..LayoutConfig::default()
        };
        assert_eq!(
            LayoutCalculator::new(config).compute(20),
            Err(LayoutError::NegativeLength { field: "spacing_mm" })
        );

        let config = LayoutConfig {
            margin_left_mm: -3.0,
            ..LayoutConfig::default()
        };
        assert_eq!(
            LayoutCalculator::new(config).compute(1),
            Err(LayoutError::NegativeLength { field: "margin_left_mm" })
        );

        let config = LayoutConfig {
            backside_padding_mm: f64::NAN,
            ..LayoutConfig::default()
        };
        assert!(matches!(
            LayoutCalculator::new(config).compute(1),
            Err(LayoutError::NegativeLength { field: "backside_padding_mm" })
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            LayoutCalculator::default().compute(0),
            Err(LayoutError::EmptyInput { images: 0, repeat: 1 })
        );
    }

    #[test]
    fn image_index_stops_after_last_copy() {
        let config = LayoutConfig {
            repeat_count: 2,
            ..bare(100.0, 50.0)
        };
        let g = LayoutCalculator::new(config).compute(3).unwrap();
        assert_eq!(g.items_per_page, 4);
        assert_eq!(g.image_index(0, 0, 0), Some(0));
        assert_eq!(g.image_index(0, 0, 1), Some(0));
        assert_eq!(g.image_index(0, 1, 1), Some(1));
        assert_eq!(g.image_index(1, 0, 1), Some(2));
        assert_eq!(g.image_index(1, 1, 0), None);
    }

    #[test]
    fn reads_partial_yaml_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.yaml");
        fs::write(&path, "item_width_mm: 57\nitem_height_mm: 57\nrepeat_count: 4\n").unwrap();

        let config = LayoutConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.item_width_mm, 57.0);
        assert_eq!(config.repeat_count, 4);
        assert_eq!(config.dpi, 300);
    }
}
