//! Reads one primitive PDF object at a time from a [`Source`].

use std::io::Read;

use crate::error::ParseError;
use crate::object::{Dictionary, Number, PdfValue, Reference};
use crate::source::Source;

/// Arrays and dictionaries nested deeper than this are rejected.
pub(crate) const MAX_NESTING_DEPTH: usize = 1000;

const MAX_FRACTION_DIGITS: u8 = 9;

pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c | 0x00)
}

pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_keyword_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'\'' || b == b'"' || b == b'*'
}

fn is_keyword_char(b: u8) -> bool {
    is_keyword_start(b) || b.is_ascii_digit()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

pub(crate) struct ObjectReader<R> {
    pub(crate) source: Source<R>,
}

impl<R: Read> ObjectReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        ObjectReader {
            source: Source::new(inner),
        }
    }

    pub(crate) fn position(&self) -> u64 {
        self.source.position()
    }

    /// Skips whitespace and `%` comments and returns the next byte, if any.
    pub(crate) fn skip_whitespace_or_comment(&mut self) -> Result<Option<u8>, ParseError> {
        loop {
            match self.source.peek()? {
                Some(b) if is_whitespace(b) => self.source.advance(1),
                Some(b'%') => {
                    self.source.advance(1);
                    while let Some(b) = self.source.peek()? {
                        if b == b'\r' || b == b'\n' {
                            break;
                        }
                        self.source.advance(1);
                    }
                }
                other => return Ok(other),
            }
        }
    }

    /// Parses the next object. Keywords are returned as [`PdfValue::Operator`].
    /// `Ok(None)` means the input is exhausted.
    pub(crate) fn parse_object(&mut self) -> Result<Option<PdfValue>, ParseError> {
        self.parse_value()
    }

    fn parse_value(&mut self) -> Result<Option<PdfValue>, ParseError> {
        let Some(ch) = self.skip_whitespace_or_comment()? else {
            return Ok(None);
        };
        if self.at_container_start(ch)? {
            self.parse_container().map(Some)
        } else {
            self.parse_scalar(ch).map(Some)
        }
    }

    fn at_container_start(&mut self, ch: u8) -> Result<bool, ParseError> {
        Ok(ch == b'[' || (ch == b'<' && self.source.peek_at(1)? == Some(b'<')))
    }

    /// Anything but an array or dictionary, starting at `ch`.
    fn parse_scalar(&mut self, ch: u8) -> Result<PdfValue, ParseError> {
        let value = match ch {
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.parse_number_or_reference()?,
            b'(' => PdfValue::String(self.parse_literal_string()?),
            b'/' => PdfValue::Name(self.parse_name()?),
            b'<' => PdfValue::String(self.parse_hex_string()?),
            c if is_keyword_start(c) => PdfValue::Operator(self.parse_keyword()?),
            c => {
                return Err(ParseError::syntax(
                    self.position(),
                    format!("invalid PDF object starting with {:?}", c as char),
                ));
            }
        };
        Ok(value)
    }

    /// Accumulates a run of decimal digits. Digits past `max_digits` are
    /// consumed but ignored; the integer value saturates.
    fn read_digits(&mut self, max_digits: u8) -> Result<(i32, u8), ParseError> {
        let mut value: i32 = 0;
        let mut count: u8 = 0;
        while let Some(b @ b'0'..=b'9') = self.source.peek()? {
            self.source.advance(1);
            if count < max_digits {
                value = value.saturating_mul(10).saturating_add((b - b'0') as i32);
                count += 1;
            }
        }
        Ok((value, count))
    }

    /// `[+-]?\d*(\.\d*)?`
    pub(crate) fn parse_number(&mut self) -> Result<Number, ParseError> {
        let mut negative = false;
        match self.source.peek()? {
            Some(b'-') => {
                negative = true;
                self.source.advance(1);
            }
            Some(b'+') => self.source.advance(1),
            _ => {}
        }
        let (integer, _) = self.read_digits(u8::MAX)?;
        let mut number = Number::from_integer(integer);
        if self.source.peek()? == Some(b'.') {
            self.source.advance(1);
            let (fraction, digits) = self.read_digits(MAX_FRACTION_DIGITS)?;
            number.point = true;
            number.fraction = fraction;
            number.fraction_digits = digits;
        }
        if negative {
            number.negative = true;
            number.integer = -number.integer;
            number.fraction = -number.fraction;
        }
        Ok(number)
    }

    pub(crate) fn skip_number(&mut self) -> Result<(), ParseError> {
        self.parse_number().map(|_| ())
    }

    /// A number, or an indirect reference when the number is followed by a
    /// second integer and a standalone `R`. Nothing past the first number is
    /// consumed unless the reference matches.
    fn parse_number_or_reference(&mut self) -> Result<PdfValue, ParseError> {
        let number = self.parse_number()?;
        if number.point || number.is_negative() {
            return Ok(PdfValue::Number(number));
        }
        match self.reference_lookahead()? {
            Some((generation, len)) => {
                self.source.advance(len);
                Ok(PdfValue::Reference(Reference::new(
                    number.integer,
                    generation,
                )))
            }
            None => Ok(PdfValue::Number(number)),
        }
    }

    /// Looks for `<ws>+<digits><ws>+R<delimiter>` ahead of the cursor and
    /// returns the generation number and the length of the match.
    fn reference_lookahead(&mut self) -> Result<Option<(i32, usize)>, ParseError> {
        let mut i = 0;
        while matches!(self.source.peek_at(i)?, Some(b) if is_whitespace(b)) {
            i += 1;
        }
        if i == 0 {
            return Ok(None);
        }
        let digits_start = i;
        let mut generation: i32 = 0;
        while let Some(b @ b'0'..=b'9') = self.source.peek_at(i)? {
            generation = generation.saturating_mul(10).saturating_add((b - b'0') as i32);
            i += 1;
        }
        if i == digits_start {
            return Ok(None);
        }
        let digits_end = i;
        while matches!(self.source.peek_at(i)?, Some(b) if is_whitespace(b)) {
            i += 1;
        }
        if i == digits_end || self.source.peek_at(i)? != Some(b'R') {
            return Ok(None);
        }
        match self.source.peek_at(i + 1)? {
            Some(b) if !is_whitespace(b) && !is_delimiter(b) => Ok(None),
            _ => Ok(Some((generation, i + 1))),
        }
    }

    fn parse_literal_string(&mut self) -> Result<Vec<u8>, ParseError> {
        self.source.advance(1);
        let mut out = Vec::new();
        let mut depth = 1;
        loop {
            let Some(c) = self.source.next_byte()? else {
                return Err(ParseError::UnexpectedEof("literal string"));
            };
            match c {
                b'(' => {
                    depth += 1;
                    out.push(c);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(c);
                }
                b'\\' => {
                    let Some(e) = self.source.next_byte()? else {
                        return Err(ParseError::UnexpectedEof("literal string"));
                    };
                    match e {
                        b'n' | b'r' | b't' => out.push(b' '),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'0'..=b'7' => {
                            let mut code = (e - b'0') as u32;
                            for _ in 0..2 {
                                match self.source.peek()? {
                                    Some(d @ b'0'..=b'7') => {
                                        code = code * 8 + (d - b'0') as u32;
                                        self.source.advance(1);
                                    }
                                    _ => break,
                                }
                            }
                            out.push(code as u8);
                        }
                        // escaped end of line continues the string
                        b'\r' => {
                            if self.source.peek()? == Some(b'\n') {
                                self.source.advance(1);
                            }
                        }
                        b'\n' => {}
                        other => out.push(other),
                    }
                }
                _ => out.push(c),
            }
        }
    }

    fn parse_hex_string(&mut self) -> Result<Vec<u8>, ParseError> {
        self.source.advance(1);
        let mut out = Vec::new();
        let mut high = None;
        loop {
            let Some(c) = self.source.next_byte()? else {
                return Err(ParseError::UnexpectedEof("hex string"));
            };
            if c == b'>' {
                if let Some(h) = high {
                    out.push(h << 4);
                }
                return Ok(out);
            }
            if is_whitespace(c) {
                continue;
            }
            let Some(v) = hex_value(c) else {
                return Err(ParseError::syntax(
                    self.position(),
                    "keyword > not found after hex string",
                ));
            };
            match high.take() {
                Some(h) => out.push(h << 4 | v),
                None => high = Some(v),
            }
        }
    }

    fn parse_name(&mut self) -> Result<Vec<u8>, ParseError> {
        self.source.advance(1);
        let mut name = Vec::new();
        while let Some(b) = self.source.peek()? {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.source.advance(1);
            if b == b'#' {
                let hi = self.source.peek_at(0)?.and_then(hex_value);
                let lo = self.source.peek_at(1)?.and_then(hex_value);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    name.push(hi << 4 | lo);
                    self.source.advance(2);
                    continue;
                }
            }
            name.push(b);
        }
        Ok(name)
    }

    pub(crate) fn parse_keyword(&mut self) -> Result<Vec<u8>, ParseError> {
        let mut keyword = Vec::new();
        while let Some(b) = self.source.peek()? {
            if !is_keyword_char(b) {
                break;
            }
            keyword.push(b);
            self.source.advance(1);
        }
        Ok(keyword)
    }

    /// Consumes `keyword` or fails without consuming anything.
    pub(crate) fn expect_keyword(&mut self, keyword: &[u8]) -> Result<(), ParseError> {
        if self.source.starts_with(keyword)? {
            self.source.advance(keyword.len());
            Ok(())
        } else if self.source.window().is_empty() {
            Err(ParseError::UnexpectedEof("keyword"))
        } else {
            Err(ParseError::syntax(
                self.position(),
                format!("keyword {} not found", String::from_utf8_lossy(keyword)),
            ))
        }
    }

    /// Opens the array or dictionary at the cursor.
    fn open_container(&mut self, stack: &mut Vec<Frame>) -> Result<(), ParseError> {
        if stack.len() >= MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep {
                offset: self.position(),
            });
        }
        if self.source.peek()? == Some(b'[') {
            self.source.advance(1);
            stack.push(Frame::Array(Vec::new()));
        } else {
            self.source.advance(2);
            stack.push(Frame::Dictionary(Dictionary::new(), None));
        }
        Ok(())
    }

    /// Parses nested arrays and dictionaries with an explicit stack of open
    /// containers, so deep input cannot exhaust the call stack.
    fn parse_container(&mut self) -> Result<PdfValue, ParseError> {
        let mut stack = Vec::new();
        self.open_container(&mut stack)?;
        loop {
            let Some(top) = stack.last_mut() else {
                return Err(ParseError::syntax(self.position(), "no open container"));
            };
            let Some(ch) = self.skip_whitespace_or_comment()? else {
                return Err(ParseError::UnexpectedEof(top.name()));
            };
            let closes = match top {
                Frame::Array(_) => ch == b']',
                Frame::Dictionary(_, None) => ch == b'>',
                Frame::Dictionary(_, Some(_)) => false,
            };
            let value = if closes {
                if ch == b']' {
                    self.source.advance(1);
                } else {
                    self.expect_keyword(b">>")?;
                }
                let Some(frame) = stack.pop() else {
                    return Err(ParseError::syntax(self.position(), "no open container"));
                };
                let value = frame.into_value();
                if stack.is_empty() {
                    return Ok(value);
                }
                value
            } else if let Frame::Dictionary(_, key @ None) = top {
                if ch != b'/' {
                    return Err(ParseError::syntax(
                        self.position(),
                        "expected a name as dictionary key",
                    ));
                }
                *key = Some(self.parse_name()?);
                continue;
            } else if self.at_container_start(ch)? {
                self.open_container(&mut stack)?;
                continue;
            } else {
                self.parse_scalar(ch)?
            };

            // keywords inside containers are dropped
            match stack.last_mut() {
                Some(Frame::Array(items)) => {
                    if !matches!(value, PdfValue::Operator(_)) {
                        items.push(value);
                    }
                }
                Some(Frame::Dictionary(dict, key)) => {
                    if let Some(key) = key.take() {
                        if !matches!(value, PdfValue::Operator(_)) {
                            dict.insert(key, value);
                        }
                    }
                }
                None => return Ok(value),
            }
        }
    }
}

/// An array or dictionary still being filled. A dictionary holds the key
/// waiting for its value.
enum Frame {
    Array(Vec<PdfValue>),
    Dictionary(Dictionary, Option<Vec<u8>>),
}

impl Frame {
    fn name(&self) -> &'static str {
        match self {
            Frame::Array(_) => "array",
            Frame::Dictionary(..) => "dictionary",
        }
    }

    fn into_value(self) -> PdfValue {
        match self {
            Frame::Array(items) => PdfValue::Array(items),
            Frame::Dictionary(dict, _) => PdfValue::Dictionary(dict),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(input: &[u8]) -> ObjectReader<&[u8]> {
        ObjectReader::new(input)
    }

    fn parse_all(input: &[u8]) -> Vec<PdfValue> {
        let mut r = reader(input);
        let mut out = Vec::new();
        while let Some(v) = r.parse_object().unwrap() {
            out.push(v);
        }
        out
    }

    #[test]
    fn numbers_round_trip_to_their_source_text() {
        for text in [
            "0", "17", "-3", "+42", "3.25", "-0.5", "0.05", "123.0001", "-0", "-0.0", "5.",
        ] {
            let mut r = reader(text.as_bytes());
            let n = r.parse_number().unwrap();
            let expected = text.trim_start_matches('+');
            assert_eq!(n.to_string(), expected, "{}", text);
        }
        let mut r = reader(b".5");
        assert_eq!(r.parse_number().unwrap().to_string(), "0.5");
    }

    #[test]
    fn reference_needs_trailing_r() {
        assert_eq!(
            parse_all(b"12 0 R"),
            vec![PdfValue::Reference(Reference::new(12, 0))]
        );
        assert_eq!(
            parse_all(b"12 0 obj"),
            vec![
                PdfValue::Number(Number::from_integer(12)),
                PdfValue::Number(Number::from_integer(0)),
                PdfValue::Operator(b"obj".to_vec()),
            ]
        );
    }

    #[test]
    fn color_operator_is_not_a_reference() {
        let values = parse_all(b"0 0 1 RG");
        assert_eq!(values.len(), 4);
        assert_eq!(values[3], PdfValue::Operator(b"RG".to_vec()));
    }

    #[test]
    fn literal_string_escapes() {
        let values = parse_all(b"(a\\nb\\tc\\(d\\)e\\\\f\\101\\7(nested))");
        assert_eq!(
            values,
            vec![PdfValue::String(b"a b c(d)e\\fA\x07(nested)".to_vec())]
        );
    }

    #[test]
    fn literal_and_hex_strings_agree() {
        let literal = parse_all(b"(\\110\\151 there)");
        let hex = parse_all(b"<48 69207468657265>");
        assert_eq!(literal, hex);
        assert_eq!(parse_all(b"<414>"), vec![PdfValue::String(b"A@".to_vec())]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut r = reader(b"(never closed");
        assert!(matches!(
            r.parse_object(),
            Err(ParseError::UnexpectedEof("literal string"))
        ));
    }

    #[test]
    fn bad_hex_digit_is_an_error() {
        let mut r = reader(b"<41zz>");
        assert!(matches!(r.parse_object(), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn names_stop_at_delimiters_and_decode_escapes() {
        assert_eq!(
            parse_all(b"/Type/Font /A#20B"),
            vec![
                PdfValue::Name(b"Type".to_vec()),
                PdfValue::Name(b"Font".to_vec()),
                PdfValue::Name(b"A B".to_vec()),
            ]
        );
    }

    #[test]
    fn dictionary_with_nested_values() {
        let values = parse_all(
            b"<< /Type /Page /Contents [4 0 R 5 0 R] % comment\n /Resources << /Font << /F1 7 0 R >> >> /Flag true >>",
        );
        let dict = values[0].as_dict().unwrap();
        assert!(dict.is_type(b"Page"));
        assert_eq!(dict.get(b"Contents").unwrap().as_array().unwrap().len(), 2);
        let resources = dict.get(b"Resources").unwrap().as_dict().unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(
            fonts.get(b"F1").unwrap().as_reference(),
            Some(Reference::new(7, 0))
        );
        assert!(!dict.has_key(b"Flag"));
    }

    #[test]
    fn nesting_limit_is_enforced() {
        let mut deep = vec![b'['; MAX_NESTING_DEPTH];
        deep.extend(vec![b']'; MAX_NESTING_DEPTH]);
        assert!(reader(&deep).parse_object().unwrap().is_some());

        let mut too_deep = vec![b'['; MAX_NESTING_DEPTH + 1];
        too_deep.extend(vec![b']'; MAX_NESTING_DEPTH + 1]);
        assert!(matches!(
            reader(&too_deep).parse_object(),
            Err(ParseError::NestingTooDeep { .. })
        ));

        let mut dicts = b"<</A ".repeat(MAX_NESTING_DEPTH + 1);
        dicts.extend(b">>".repeat(MAX_NESTING_DEPTH + 1));
        assert!(matches!(
            reader(&dicts).parse_object(),
            Err(ParseError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn mixed_containers_at_the_depth_limit() {
        let half = MAX_NESTING_DEPTH / 2;
        let mut input = b"<</K [".repeat(half);
        input.extend_from_slice(b"/leaf");
        input.extend(b"] >>".repeat(half));
        input.extend_from_slice(b" 7");

        let mut r = reader(&input);
        let mut value = r.parse_object().unwrap().unwrap();
        for _ in 0..half {
            let dict = value.as_dict().unwrap();
            let items = dict.get(b"K").unwrap().as_array().unwrap();
            value = items[0].clone();
        }
        assert_eq!(value, PdfValue::Name(b"leaf".to_vec()));
        assert_eq!(
            r.parse_object().unwrap(),
            Some(PdfValue::Number(Number::from_integer(7)))
        );
    }

    #[test]
    fn unterminated_containers() {
        assert!(matches!(
            reader(b"[1 [2").parse_object(),
            Err(ParseError::UnexpectedEof("array"))
        ));
        assert!(matches!(
            reader(b"<< /A [1] /B").parse_object(),
            Err(ParseError::UnexpectedEof("dictionary"))
        ));
        assert!(matches!(
            reader(b"<< /A >>").parse_object(),
            Err(ParseError::Syntax { .. })
        ));
        assert!(matches!(
            reader(b"<< 1 2 >>").parse_object(),
            Err(ParseError::Syntax { .. })
        ));
    }

    #[test]
    fn invalid_object_start() {
        let mut r = reader(b"  )");
        assert!(matches!(r.parse_object(), Err(ParseError::Syntax { offset: 2, .. })));
    }

    #[test]
    fn expect_keyword_reports_missing_keyword() {
        let mut r = reader(b"endobj");
        assert!(r.expect_keyword(b"obj").is_err());
        assert!(r.expect_keyword(b"endobj").is_ok());
        assert!(matches!(
            r.expect_keyword(b"obj"),
            Err(ParseError::UnexpectedEof(_))
        ));
    }
}
