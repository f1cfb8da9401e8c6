//! Streaming PDF text extraction
//!
//! This library reads a PDF file once, front to back, without seeking or
//! loading it whole. Fonts, encodings and ToUnicode maps are picked up as they
//! go by, and text is handed out as soon as the pieces needed to decode it
//! have been seen. Document metadata comes from the trailer's `Info`
//! dictionary.

mod body;
mod content;
mod data;
mod document;
mod error;
mod extract;
mod fonts;
mod metadata;
mod object;
mod objstm;
mod output;
mod parser;
mod processor;
mod reader;
mod source;
mod types;
mod unicode;
mod utils;

// Re-export error type
pub use error::ParseError;

// Re-export extraction API
pub use extract::{PdfExtractor, PdfExtractorBuilder, from_bytes, from_path, from_reader};

// Re-export the streaming parser
pub use output::{StreamHandler, TextHandler};
pub use parser::{ParserConfig, PdfParser};

// Re-export public types
pub use metadata::{Metadata, is_pdf, pdf_date_to_xsd};
pub use object::{Dictionary, Number, PdfValue, Reference};
pub use types::TextOutput;
