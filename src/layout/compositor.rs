use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage, RgbImage};
use rayon::prelude::*;
use tracing::debug;

use crate::layout::calculator::LayoutGeometry;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OUTLINE: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Where a pixel centre lies relative to the ellipse inscribed in a
/// `width` x `height` box: 0 at the centre, 1 on the edge.
fn radial_distance(x: u32, y: u32, width: u32, height: u32) -> f64 {
    let rx = width as f64 / 2.0;
    let ry = height as f64 / 2.0;
    let nx = (x as f64 + 0.5 - rx) / rx;
    let ny = (y as f64 + 0.5 - ry) / ry;
    (nx * nx + ny * ny).sqrt()
}

/// Strokes the inscribed circle `width` pixels wide, inwards from its edge.
pub fn draw_outline(mut item: RgbaImage, width: u32) -> RgbaImage {
    if width == 0 {
        return item;
    }
    let (w, h) = item.dimensions();
    let radius = w.min(h) as f64 / 2.0;
    for (x, y, pixel) in item.enumerate_pixels_mut() {
        let r = radial_distance(x, y, w, h);
        if r <= 1.0 && (1.0 - r) * radius < width as f64 {
            *pixel = OUTLINE;
        }
    }
    item
}

/// Paints everything outside the inscribed circle opaque white.
pub fn whiten_outside(mut item: RgbaImage) -> RgbaImage {
    let (w, h) = item.dimensions();
    for (x, y, pixel) in item.enumerate_pixels_mut() {
        if radial_distance(x, y, w, h) > 1.0 {
            *pixel = WHITE;
        }
    }
    item
}

/// Lays images out on print pages following a computed geometry.
#[derive(Debug, Clone)]
pub struct PageCompositor {
    geometry: LayoutGeometry,
}

impl PageCompositor {
    pub fn new(geometry: LayoutGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &LayoutGeometry {
        &self.geometry
    }

    /// Resizes a source image to the footprint and cuts it to a
    /// white-backed circle with an outline.
    pub fn prepare_item(&self, image: &DynamicImage) -> RgbaImage {
        let g = &self.geometry;
        let resized = imageops::resize(
            &image.to_rgba8(),
            g.footprint_width,
            g.footprint_height,
            FilterType::CatmullRom,
        );
        whiten_outside(draw_outline(resized, g.outline))
    }

    /// Builds every page in order. `images` must be the images the geometry
    /// was computed for.
    pub fn compose(&self, images: &[DynamicImage]) -> Vec<RgbImage> {
        let items: Vec<RgbaImage> = images.par_iter().map(|img| self.prepare_item(img)).collect();
        (0..self.geometry.total_pages)
            .into_par_iter()
            .map(|page| self.compose_page(page, &items))
            .collect()
    }

    pub fn compose_page(&self, page: usize, items: &[RgbaImage]) -> RgbImage {
        let g = &self.geometry;
        let mut canvas = RgbaImage::from_pixel(g.page_width, g.page_height, WHITE);
        let mut placed = 0;

        'grid: for row in 0..g.rows {
            for col in 0..g.columns {
                let Some(idx) = g.image_index(page, row, col) else {
                    break 'grid;
                };
                let Some(item) = items.get(idx) else {
                    break 'grid;
                };
                let (left, top) = g.cell_offset(row, col);
                imageops::overlay(&mut canvas, item, left as i64, top as i64);
                placed += 1;
            }
        }

        debug!(page = page + 1, placed, "composited page");
        DynamicImage::ImageRgba8(canvas).to_rgb8()
    }
}
