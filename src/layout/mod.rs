pub mod calculator;
pub mod compositor;
pub mod pdf_writer;

pub use calculator::{LayoutCalculator, LayoutConfig, LayoutGeometry};
pub use compositor::PageCompositor;
pub use pdf_writer::encode_pdf;
