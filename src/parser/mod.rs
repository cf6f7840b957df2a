pub mod page_range;
pub mod pdf_reader;

pub use page_range::PageRange;
pub use pdf_reader::PdfReader;
