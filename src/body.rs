//! Walks the top level of a PDF file: indirect objects, their streams, and the
//! cross-reference sections that sit between them.

use std::io::{self, ErrorKind, Read};

use memchr::memmem;
use tracing::trace;

use crate::error::ParseError;
use crate::object::{Dictionary, PdfValue, Reference};
use crate::reader::{ObjectReader, is_whitespace};

const ENDSTREAM: &[u8] = b"endstream";

/// One `N G obj ... endobj` block. Non-dictionary values are not kept.
#[derive(Debug)]
pub(crate) struct IndirectObject {
    pub(crate) reference: Reference,
    pub(crate) dictionary: Option<Dictionary>,
    pub(crate) has_stream: bool,
}

struct StreamState {
    /// Bytes left when the dictionary gave a direct `Length`.
    remaining: Option<u64>,
    done: bool,
}

pub(crate) struct BodyReader<R> {
    reader: ObjectReader<R>,
    trailer: Option<Dictionary>,
    stream: Option<StreamState>,
}

impl<R: Read> BodyReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        BodyReader {
            reader: ObjectReader::new(inner),
            trailer: None,
            stream: None,
        }
    }

    pub(crate) fn position(&self) -> u64 {
        self.reader.position()
    }

    /// The first `trailer` dictionary, or cross-reference stream dictionary,
    /// seen so far.
    pub(crate) fn trailer(&self) -> Option<&Dictionary> {
        self.trailer.as_ref()
    }

    /// Reads up to the next indirect object, skipping `xref` tables, trailers
    /// and `startxref`. An unread stream of the previous object is drained
    /// first.
    pub(crate) fn next_object(&mut self) -> Result<Option<IndirectObject>, ParseError> {
        self.finish_stream()?;
        loop {
            let Some(ch) = self.reader.skip_whitespace_or_comment()? else {
                return Ok(None);
            };
            if ch.is_ascii_digit() {
                return self.parse_indirect_object().map(Some);
            }
            let offset = self.reader.position();
            let keyword = self.reader.parse_keyword()?;
            match keyword.as_slice() {
                b"xref" => self.skip_xref()?,
                b"trailer" => self.parse_trailer()?,
                b"startxref" => {
                    self.reader.skip_whitespace_or_comment()?;
                    self.reader.skip_number()?;
                }
                _ => {
                    return Err(ParseError::syntax(
                        offset,
                        format!(
                            "unexpected {:?} between objects",
                            String::from_utf8_lossy(&keyword)
                        ),
                    ));
                }
            }
        }
    }

    /// The data of the current object's stream, if it has one and it has not
    /// been read to the end.
    pub(crate) fn stream(&mut self) -> Option<SubStream<'_, R>> {
        if self.stream.as_ref().is_some_and(|state| !state.done) {
            Some(SubStream { body: self })
        } else {
            None
        }
    }

    fn parse_indirect_object(&mut self) -> Result<IndirectObject, ParseError> {
        let index = self.reader.parse_number()?;
        self.reader.skip_whitespace_or_comment()?;
        let generation = self.reader.parse_number()?;
        self.reader.skip_whitespace_or_comment()?;
        self.reader.expect_keyword(b"obj")?;
        let reference = Reference::new(index.integer, generation.integer);

        let value = self
            .reader
            .parse_object()?
            .ok_or(ParseError::UnexpectedEof("object"))?;
        let dictionary = match value {
            PdfValue::Operator(keyword) if keyword == b"endobj" => {
                return Ok(IndirectObject {
                    reference,
                    dictionary: None,
                    has_stream: false,
                });
            }
            PdfValue::Dictionary(dictionary) => Some(dictionary),
            _ => None,
        };

        if self.reader.skip_whitespace_or_comment()?.is_none() {
            return Err(ParseError::UnexpectedEof("object"));
        }
        let offset = self.reader.position();
        match self.reader.parse_keyword()?.as_slice() {
            b"endobj" => Ok(IndirectObject {
                reference,
                dictionary,
                has_stream: false,
            }),
            b"stream" => {
                let Some(dictionary) = dictionary else {
                    return Err(ParseError::syntax(offset, "stream without a dictionary"));
                };
                let source = &mut self.reader.source;
                match source.peek()? {
                    Some(b'\r') => {
                        source.advance(1);
                        if source.peek()? == Some(b'\n') {
                            source.advance(1);
                        }
                    }
                    Some(b'\n') => source.advance(1),
                    _ => {}
                }
                let remaining = dictionary
                    .get(b"Length")
                    .and_then(PdfValue::as_number)
                    .filter(|n| !n.point && !n.is_negative())
                    .map(|n| n.integer as u64);
                trace!(%reference, ?remaining, "stream starts");
                // a cross-reference stream carries the trailer entries
                if self.trailer.is_none() && dictionary.is_type(b"XRef") {
                    self.trailer = Some(dictionary.clone());
                }
                self.stream = Some(StreamState {
                    remaining,
                    done: false,
                });
                Ok(IndirectObject {
                    reference,
                    dictionary: Some(dictionary),
                    has_stream: true,
                })
            }
            _ => Err(ParseError::syntax(offset, "keyword endobj not found")),
        }
    }

    fn finish_stream(&mut self) -> Result<(), ParseError> {
        if self.stream.is_none() {
            return Ok(());
        }
        io::copy(&mut SubStream { body: self }, &mut io::sink()).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                ParseError::UnexpectedEof("stream")
            } else {
                ParseError::IoError(e)
            }
        })?;
        self.stream = None;
        self.reader.skip_whitespace_or_comment()?;
        if self.reader.source.starts_with(ENDSTREAM)? {
            self.reader.source.advance(ENDSTREAM.len());
        }
        self.reader.skip_whitespace_or_comment()?;
        self.reader.expect_keyword(b"endobj")
    }

    fn skip_xref(&mut self) -> Result<(), ParseError> {
        loop {
            match self.reader.skip_whitespace_or_comment()? {
                Some(b) if b.is_ascii_digit() => self.reader.skip_number()?,
                Some(b'f' | b'n') => {
                    let next = self.reader.source.peek_at(1)?;
                    if next.is_some_and(|b| !is_whitespace(b)) {
                        return Ok(());
                    }
                    self.reader.source.advance(1);
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_trailer(&mut self) -> Result<(), ParseError> {
        let offset = self.reader.position();
        match self.reader.parse_object()? {
            Some(PdfValue::Dictionary(dictionary)) => {
                if self.trailer.is_none() {
                    self.trailer = Some(dictionary);
                }
                Ok(())
            }
            Some(_) => Err(ParseError::syntax(offset, "trailer is not a dictionary")),
            None => Err(ParseError::UnexpectedEof("trailer")),
        }
    }

    fn read_stream(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let BodyReader { reader, stream, .. } = self;
        let Some(state) = stream.as_mut() else {
            return Ok(0);
        };
        if state.done || out.is_empty() {
            return Ok(0);
        }
        let source = &mut reader.source;
        loop {
            let window = source.window();
            let n = match state.remaining {
                Some(0) => {
                    state.done = true;
                    return Ok(0);
                }
                Some(remaining) => window
                    .len()
                    .min(out.len())
                    .min(usize::try_from(remaining).unwrap_or(usize::MAX)),
                None => match memmem::find(window, ENDSTREAM) {
                    Some(0) => {
                        state.done = true;
                        return Ok(0);
                    }
                    Some(end) => end.min(out.len()),
                    // keep enough bytes back to catch a split keyword
                    None => window
                        .len()
                        .saturating_sub(ENDSTREAM.len() - 1)
                        .min(out.len()),
                },
            };
            if n > 0 {
                out[..n].copy_from_slice(&window[..n]);
                source.advance(n);
                if let Some(remaining) = state.remaining.as_mut() {
                    *remaining -= n as u64;
                }
                return Ok(n);
            }
            if !source.fill()? {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "stream data ends before endstream",
                ));
            }
        }
    }
}

/// Reader over the raw bytes of the current object's stream.
pub(crate) struct SubStream<'a, R> {
    body: &'a mut BodyReader<R>,
}

impl<R: Read> Read for SubStream<'_, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.body.read_stream(out)
    }
}
