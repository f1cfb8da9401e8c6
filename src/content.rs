//! Splits a decoded content stream into operators and their operands.

use std::io::Read;

use crate::error::ParseError;
use crate::object::PdfValue;
use crate::reader::{ObjectReader, is_delimiter, is_whitespace};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Operation {
    /// Empty for operands left over at the end of the stream.
    pub(crate) operator: Vec<u8>,
    pub(crate) operands: Vec<PdfValue>,
}

pub(crate) struct ContentReader<R> {
    reader: ObjectReader<R>,
}

impl<R: Read> ContentReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        ContentReader {
            reader: ObjectReader::new(inner),
        }
    }

    pub(crate) fn next_operation(&mut self) -> Result<Option<Operation>, ParseError> {
        let mut operands = Vec::new();
        loop {
            match self.reader.parse_object()? {
                None if operands.is_empty() => return Ok(None),
                None => {
                    return Ok(Some(Operation {
                        operator: Vec::new(),
                        operands,
                    }));
                }
                Some(PdfValue::Operator(operator)) => match operator.as_slice() {
                    b"true" | b"false" | b"null" => {}
                    b"ID" => {
                        self.skip_inline_image()?;
                        return Ok(Some(Operation { operator, operands }));
                    }
                    _ => return Ok(Some(Operation { operator, operands })),
                },
                Some(value) => operands.push(value),
            }
        }
    }

    /// Skips binary image data up to and including the `EI` that ends it.
    fn skip_inline_image(&mut self) -> Result<(), ParseError> {
        let source = &mut self.reader.source;
        loop {
            let Some(b) = source.next_byte()? else {
                return Err(ParseError::UnexpectedEof("inline image"));
            };
            if !is_whitespace(b) || !source.starts_with(b"EI")? {
                continue;
            }
            match source.peek_at(2)? {
                Some(c) if !is_whitespace(c) && !is_delimiter(c) => {}
                _ => {
                    source.advance(2);
                    return Ok(());
                }
            }
        }
    }
}
