use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::{debug, error, trace, warn};

use crate::body::{BodyReader, IndirectObject};
use crate::document::Document;
use crate::error::ParseError;
use crate::metadata::Metadata;
use crate::object::{Dictionary, PdfValue, Reference};
use crate::objstm::ObjectStreamReader;
use crate::output::{StreamHandler, TextHandler};
use crate::processor::{ContentExtract, process_content};

/// Tuning for the memory governor.
///
/// Every `check_interval` top-level objects the parser estimates how much it
/// is holding on to. Above `memory_limit` bytes, pages still waiting for
/// fonts or resources are committed anyway with a fallback map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    pub memory_limit: usize,
    pub check_interval: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            memory_limit: 2_000_000,
            check_interval: 200,
        }
    }
}

enum Filter<'a> {
    None,
    Flate,
    Other(&'a [u8]),
}

fn stream_filter(dictionary: &Dictionary) -> Filter<'_> {
    let name = match dictionary.get(b"Filter") {
        None => return Filter::None,
        Some(PdfValue::Name(name)) => name.as_slice(),
        Some(PdfValue::Array(filters)) => match filters.as_slice() {
            [] => return Filter::None,
            [PdfValue::Name(name)] => name.as_slice(),
            _ => return Filter::Other(b"filter chain"),
        },
        Some(_) => return Filter::Other(b"malformed filter"),
    };
    match name {
        b"FlateDecode" | b"Fl" => Filter::Flate,
        other => Filter::Other(other),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Content,
    ObjectStream,
    Other,
}

fn stream_kind(dictionary: &Dictionary) -> StreamKind {
    if dictionary.is_type(b"ObjStm") {
        StreamKind::ObjectStream
    } else if !dictionary.has_key(b"Type") && !dictionary.has_key(b"Subtype") {
        StreamKind::Content
    } else {
        StreamKind::Other
    }
}

/// Hands text to the installed handler, or drops it.
struct TextSink<'a, 'h>(&'a mut Option<Box<dyn TextHandler + 'h>>);

impl TextHandler for TextSink<'_, '_> {
    fn handle_text(&mut self, text: &str) {
        if let Some(handler) = self.0.as_mut() {
            handler.handle_text(text);
        }
    }
}

/// Reads the decoded data of a stream for text and packed objects. Problems
/// inside the data are logged and end that stream only.
fn interpret<S: Read>(
    kind: StreamKind,
    reference: Reference,
    dictionary: &Dictionary,
    data: S,
    document: &mut Document,
) {
    match kind {
        StreamKind::Content => {
            let mut extract = ContentExtract::default();
            if let Err(e) = process_content(data, &mut extract) {
                warn!(%reference, "content stream: {}", e);
            }
            document.add_content(reference, extract);
        }
        StreamKind::ObjectStream => {
            document.mark_parsed(reference);
            let mut reader = match ObjectStreamReader::new(data, dictionary) {
                Ok(reader) => reader,
                Err(e) => {
                    warn!(%reference, "object stream: {}", e);
                    return;
                }
            };
            loop {
                match reader.next_object() {
                    Ok(Some((packed, Some(dictionary)))) => document.add_dictionary(packed, dictionary),
                    Ok(Some((_, None))) => {}
                    Ok(None) => break,
                    Err(e) => {
                        warn!(%reference, "object stream: {}", e);
                        break;
                    }
                }
            }
        }
        StreamKind::Other => {
            document.mark_parsed(reference);
            trace!(%reference, "stream not interpreted");
        }
    }
}

/// Streams a PDF file once from start to end, handing extracted text to a
/// [`TextHandler`] as soon as the fonts it needs have been seen.
///
/// # Examples
///
/// ```no_run
/// use pdf_stream_strings::PdfParser;
///
/// let file = std::fs::File::open("file.pdf")?;
/// let mut texts = Vec::new();
/// let mut parser = PdfParser::new();
/// parser.set_text_handler(|text: &str| texts.push(text.to_owned()));
/// let result = parser.parse(file);
/// println!("{:?}", parser.metadata().title());
/// drop(parser);
/// println!("{}", texts.join("\n"));
/// result?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PdfParser<'h> {
    config: ParserConfig,
    text_handler: Option<Box<dyn TextHandler + 'h>>,
    stream_handler: Option<Box<dyn StreamHandler + 'h>>,
    metadata: Metadata,
    error: Option<String>,
}

impl Default for PdfParser<'_> {
    fn default() -> Self {
        Self::with_config(ParserConfig::default())
    }
}

impl<'h> PdfParser<'h> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        PdfParser {
            config,
            text_handler: None,
            stream_handler: None,
            metadata: Metadata::default(),
            error: None,
        }
    }

    pub fn set_text_handler(&mut self, handler: impl TextHandler + 'h) {
        self.text_handler = Some(Box::new(handler));
    }

    pub fn set_stream_handler(&mut self, handler: impl StreamHandler + 'h) {
        self.stream_handler = Some(Box::new(handler));
    }

    /// Metadata from the trailer's `Info` dictionary, available after
    /// [`PdfParser::parse`] returns.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The message of the error that stopped the last parse, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reads the whole of `reader`.
    ///
    /// Text is committed even when the file turns out to be broken: on error
    /// everything gathered so far is flushed before the error is returned.
    pub fn parse<R: Read>(&mut self, reader: R) -> Result<(), ParseError> {
        self.metadata = Metadata::default();
        self.error = None;

        let mut body = BodyReader::new(reader);
        let mut document = Document::new();
        let result = self.scan(&mut body, &mut document);
        if let Err(e) = &result {
            error!(offset = body.position(), "{}", e);
            self.error = Some(e.to_string());
        }

        document.commit(true, &mut TextSink(&mut self.text_handler));
        if let Some(info) = body
            .trailer()
            .and_then(|trailer| trailer.get(b"Info"))
            .and_then(|info| document.resolve(info))
        {
            self.metadata = Metadata::from_info(info);
        }
        result
    }

    fn scan<R: Read>(
        &mut self,
        body: &mut BodyReader<R>,
        document: &mut Document,
    ) -> Result<(), ParseError> {
        let mut count = 0usize;
        while let Some(object) = body.next_object()? {
            count += 1;
            let IndirectObject {
                reference,
                dictionary,
                has_stream,
            } = object;
            if let Some(dictionary) = dictionary {
                if has_stream {
                    if let Some(stream) = body.stream() {
                        self.route_stream(reference, &dictionary, stream, document);
                    }
                }
                document.add_dictionary(reference, dictionary);
            }

            if self.config.check_interval > 0 && count % self.config.check_interval == 0 {
                let size = document.memory_estimate();
                let force = size > self.config.memory_limit;
                if force {
                    debug!(size, limit = self.config.memory_limit, "memory limit exceeded");
                }
                document.commit(force, &mut TextSink(&mut self.text_handler));
            }
        }
        Ok(())
    }

    fn route_stream<S: Read>(
        &mut self,
        reference: Reference,
        dictionary: &Dictionary,
        raw: S,
        document: &mut Document,
    ) {
        match stream_filter(dictionary) {
            Filter::None => self.handle_stream(reference, dictionary, raw, document),
            Filter::Flate => {
                self.handle_stream(reference, dictionary, ZlibDecoder::new(raw), document)
            }
            Filter::Other(filter) => {
                debug!(%reference, filter = %String::from_utf8_lossy(filter), "unsupported filter");
                document.mark_parsed(reference);
                if self.stream_handler.is_some() {
                    self.forward(reference, raw);
                }
            }
        }
    }

    fn handle_stream<S: Read>(
        &mut self,
        reference: Reference,
        dictionary: &Dictionary,
        data: S,
        document: &mut Document,
    ) {
        let kind = stream_kind(dictionary);
        if self.stream_handler.is_some() {
            let data = self.forward(reference, data);
            interpret(kind, reference, dictionary, data.as_slice(), document);
        } else {
            interpret(kind, reference, dictionary, data, document);
        }
    }

    /// Reads a stream to its end and passes it to the stream handler.
    /// Whatever was read before an error is still passed on.
    fn forward<S: Read>(&mut self, reference: Reference, mut data: S) -> Vec<u8> {
        let mut buffer = Vec::new();
        if let Err(e) = data.read_to_end(&mut buffer) {
            warn!(%reference, "stream data: {}", e);
        }
        if let Some(handler) = self.stream_handler.as_mut() {
            handler.handle_stream(reference, &buffer);
        }
        buffer
    }
}
