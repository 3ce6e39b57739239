pub mod data_url;
#[cfg(feature = "docx")]
pub mod docx;
pub mod library;
pub mod parser;
#[cfg(feature = "pdf")]
pub mod pdf;

pub use library::DocumentLibrary;
pub use parser::{DocumentParser, DocxTextExtractor, PdfTextExtractor};
