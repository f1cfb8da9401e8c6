//! Reads the objects packed into an `/Type /ObjStm` stream.

use std::collections::VecDeque;
use std::io::Read;

use crate::error::ParseError;
use crate::object::{Dictionary, PdfValue, Reference};
use crate::reader::ObjectReader;

pub(crate) struct ObjectStreamReader<R> {
    reader: ObjectReader<R>,
    indices: VecDeque<i32>,
}

impl<R: Read> ObjectStreamReader<R> {
    /// Reads the `N` pairs of object number and offset that open the stream.
    /// Offsets are ignored; objects are read in order.
    pub(crate) fn new(inner: R, dictionary: &Dictionary) -> Result<Self, ParseError> {
        let count = dictionary
            .get(b"N")
            .and_then(PdfValue::as_number)
            .map_or(0, |n| n.integer.max(0) as usize);
        let mut reader = ObjectReader::new(inner);
        let mut indices = VecDeque::with_capacity(count.min(1024));
        for _ in 0..count {
            let index = Self::header_number(&mut reader)?;
            Self::header_number(&mut reader)?;
            indices.push_back(index);
        }
        Ok(ObjectStreamReader { reader, indices })
    }

    fn header_number(reader: &mut ObjectReader<R>) -> Result<i32, ParseError> {
        match reader.skip_whitespace_or_comment()? {
            Some(b) if b.is_ascii_digit() => Ok(reader.parse_number()?.integer),
            Some(_) => Err(ParseError::syntax(
                reader.position(),
                "expected a number in object stream header",
            )),
            None => Err(ParseError::UnexpectedEof("object stream header")),
        }
    }

    /// The next packed object, tagged with its declared number and generation
    /// 0. Only dictionaries are kept.
    pub(crate) fn next_object(&mut self) -> Result<Option<(Reference, Option<Dictionary>)>, ParseError> {
        let Some(index) = self.indices.pop_front() else {
            return Ok(None);
        };
        let value = self
            .reader
            .parse_object()?
            .ok_or(ParseError::UnexpectedEof("object stream"))?;
        let dictionary = match value {
            PdfValue::Dictionary(dictionary) => Some(dictionary),
            _ => None,
        };
        Ok(Some((Reference::new(index, 0), dictionary)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Number;

    fn header(n: i32) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert(&b"Type"[..], PdfValue::Name(b"ObjStm".to_vec()));
        dict.insert(&b"N"[..], PdfValue::Number(Number::from_integer(n)));
        dict
    }

    #[test]
    fn objects_are_tagged_with_declared_numbers() {
        let data = b"11 0 12 28 13 33\n<< /Type /Font /Encoding /WinAnsiEncoding >> 42 << /A 1 >>";
        let mut reader = ObjectStreamReader::new(&data[..], &header(3)).unwrap();

        let (reference, dict) = reader.next_object().unwrap().unwrap();
        assert_eq!(reference, Reference::new(11, 0));
        assert!(dict.unwrap().is_type(b"Font"));

        let (reference, dict) = reader.next_object().unwrap().unwrap();
        assert_eq!(reference, Reference::new(12, 0));
        assert!(dict.is_none());

        let (reference, dict) = reader.next_object().unwrap().unwrap();
        assert_eq!(reference, Reference::new(13, 0));
        assert!(dict.unwrap().has_key(b"A"));

        assert!(reader.next_object().unwrap().is_none());
    }

    #[test]
    fn short_stream_is_an_error() {
        let data = b"1 0 2 5 << >>";
        let mut reader = ObjectStreamReader::new(&data[..], &header(2)).unwrap();
        assert!(reader.next_object().unwrap().is_some());
        assert!(matches!(
            reader.next_object(),
            Err(ParseError::UnexpectedEof(_))
        ));

        assert!(ObjectStreamReader::new(&b"1 0"[..], &header(2)).is_err());
    }
}
