use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::ParseError;
use crate::parser::{ParserConfig, PdfParser};
use crate::types::TextOutput;

fn extract_from_reader<R: Read>(config: ParserConfig, reader: R) -> TextOutput {
    let mut texts = Vec::new();
    let (metadata, error) = {
        let mut parser = PdfParser::with_config(config);
        parser.set_text_handler(|text: &str| texts.push(text.to_owned()));
        // the error is kept in the output along with the partial text
        let _ = parser.parse(reader);
        (parser.metadata().clone(), parser.error().map(str::to_owned))
    };
    TextOutput::new(texts, metadata, error)
}

/// Builder for configuring PDF extraction options.
///
/// # Examples
///
/// ```no_run
/// use pdf_stream_strings::PdfExtractor;
///
/// // Commit buffered text sooner on large files
/// let output = PdfExtractor::builder()
///     .memory_limit(500_000)
///     .check_interval(50)
///     .build()
///     .from_path("large.pdf")?;
/// # Ok::<(), pdf_stream_strings::ParseError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PdfExtractorBuilder {
    config: ParserConfig,
}

impl PdfExtractorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of buffered dictionaries and text above which waiting pages are
    /// committed with whatever fonts are known.
    pub fn memory_limit(mut self, bytes: usize) -> Self {
        self.config.memory_limit = bytes;
        self
    }

    /// How many top-level objects to read between memory checks.
    pub fn check_interval(mut self, objects: usize) -> Self {
        self.config.check_interval = objects;
        self
    }

    /// Build the extractor configuration.
    pub fn build(self) -> PdfExtractor {
        PdfExtractor {
            config: self.config,
        }
    }
}

/// PDF text extractor with configuration options.
///
/// # Examples
///
/// ```no_run
/// use pdf_stream_strings::PdfExtractor;
///
/// let output = PdfExtractor::default().from_path("file.pdf")?;
/// println!("{}", output);
///
/// if let Some(title) = output.metadata().title() {
///     println!("Title: {}", title);
/// }
/// if let Some(error) = output.error() {
///     eprintln!("stopped early: {}", error);
/// }
/// # Ok::<(), pdf_stream_strings::ParseError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    config: ParserConfig,
}

impl PdfExtractor {
    /// Create a builder for configuring extraction options.
    pub fn builder() -> PdfExtractorBuilder {
        PdfExtractorBuilder::new()
    }

    /// Extract text from a PDF file at the given path.
    ///
    /// Only failing to open the file is an error; problems inside the file
    /// are reported through [`TextOutput::error`].
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<TextOutput, ParseError> {
        let file = File::open(path)?;
        Ok(self.from_reader(BufReader::new(file)))
    }

    /// Extract text from a PDF in memory.
    pub fn from_bytes(self, bytes: &[u8]) -> TextOutput {
        self.from_reader(bytes)
    }

    /// Extract text from a PDF reader. The reader is consumed front to back
    /// exactly once.
    pub fn from_reader<R: Read>(self, reader: R) -> TextOutput {
        extract_from_reader(self.config, reader)
    }
}

impl From<ParserConfig> for PdfExtractor {
    fn from(config: ParserConfig) -> Self {
        PdfExtractor { config }
    }
}

/// Extract text from a PDF file at the given path using default settings.
///
/// This is a convenience function equivalent to `PdfExtractor::default().from_path(path)`.
///
/// # Examples
///
/// ```no_run
/// let output = pdf_stream_strings::from_path("file.pdf")?;
/// println!("{}", output);
/// # Ok::<(), pdf_stream_strings::ParseError>(())
/// ```
pub fn from_path<P: AsRef<Path>>(path: P) -> Result<TextOutput, ParseError> {
    PdfExtractor::default().from_path(path)
}

/// Extract text from a PDF in memory using default settings.
///
/// This is a convenience function equivalent to `PdfExtractor::default().from_bytes(bytes)`.
///
/// # Examples
///
/// ```no_run
/// let bytes = std::fs::read("file.pdf")?;
/// let output = pdf_stream_strings::from_bytes(&bytes);
/// println!("{}", output);
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn from_bytes(bytes: &[u8]) -> TextOutput {
    PdfExtractor::default().from_bytes(bytes)
}

/// Extract text from a PDF reader using default settings.
///
/// This is a convenience function equivalent to `PdfExtractor::default().from_reader(reader)`.
///
/// # Examples
///
/// ```no_run
/// use std::fs::File;
///
/// let file = File::open("file.pdf")?;
/// let output = pdf_stream_strings::from_reader(file);
/// println!("{}", output);
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn from_reader<R: Read>(reader: R) -> TextOutput {
    PdfExtractor::default().from_reader(reader)
}

