//! The primitive PDF value types.
//!
//! Containers own their children outright. Indirect references are kept as
//! plain `(index, generation)` pairs and only resolved through the parser's
//! table of retained dictionaries, so values never form cycles.

use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::mem::size_of;

/// An indirect reference `N G R`, also used as the key of every parser table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    pub index: i32,
    pub generation: i32,
}

impl Reference {
    pub fn new(index: i32, generation: i32) -> Self {
        Reference { index, generation }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.index, self.generation)
    }
}

/// A decimal number kept as separate integer and fraction digits.
///
/// `integer` and `fraction` carry the sign of the number; `negative` records
/// it on its own so that `-0` and `-0.0` survive. `fraction` holds the digits
/// after the point as an integer and `fraction_digits` remembers how many
/// were read, so that `0.05` and `0.5` stay distinct. `point` is set when a
/// decimal point was written, even with no digits after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Number {
    pub integer: i32,
    pub fraction: i32,
    pub fraction_digits: u8,
    pub negative: bool,
    pub point: bool,
}

impl Number {
    pub fn from_integer(integer: i32) -> Self {
        Number {
            integer,
            negative: integer < 0,
            ..Number::default()
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn as_f64(&self) -> f64 {
        let fraction =
            self.fraction.unsigned_abs() as f64 / 10f64.powi(self.fraction_digits as i32);
        let magnitude = self.integer.unsigned_abs() as f64 + fraction;
        if self.negative { -magnitude } else { magnitude }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{}", self.integer.unsigned_abs())?;
        if self.point {
            f.write_str(".")?;
        }
        if self.fraction_digits > 0 {
            write!(
                f,
                "{:0width$}",
                self.fraction.unsigned_abs(),
                width = self.fraction_digits as usize
            )?;
        }
        Ok(())
    }
}

/// One parsed PDF value.
///
/// Keywords come back from the object reader as [`PdfValue::Operator`];
/// `true`, `false` and `null` are not modelled further and are dropped when
/// they appear inside arrays or dictionaries.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    String(Vec<u8>),
    Name(Vec<u8>),
    Operator(Vec<u8>),
    Number(Number),
    Reference(Reference),
    Array(Vec<PdfValue>),
    Dictionary(Dictionary),
}

impl PdfValue {
    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            PdfValue::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            PdfValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            PdfValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Reference> {
        match self {
            PdfValue::Reference(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfValue]> {
        match self {
            PdfValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PdfValue::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Rough number of heap and inline bytes held by this value.
    pub fn total_size(&self) -> usize {
        size_of::<PdfValue>()
            + match self {
                PdfValue::String(s) | PdfValue::Name(s) | PdfValue::Operator(s) => s.len(),
                PdfValue::Number(_) | PdfValue::Reference(_) => 0,
                PdfValue::Array(a) => a.iter().map(PdfValue::total_size).sum(),
                PdfValue::Dictionary(d) => d.total_size(),
            }
    }
}

fn write_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str(&String::from_utf8_lossy(bytes))
}

impl fmt::Display for PdfValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfValue::String(s) => {
                f.write_str("(")?;
                write_bytes(f, s)?;
                f.write_str(")")
            }
            PdfValue::Name(n) => {
                f.write_str("/")?;
                write_bytes(f, n)
            }
            PdfValue::Operator(o) => write_bytes(f, o),
            PdfValue::Number(n) => n.fmt(f),
            PdfValue::Reference(r) => r.fmt(f),
            PdfValue::Array(a) => {
                f.write_str("[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    v.fmt(f)?;
                }
                f.write_str("]")
            }
            PdfValue::Dictionary(d) => d.fmt(f),
        }
    }
}

/// A PDF dictionary. Key order is not preserved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary(HashMap<Vec<u8>, PdfValue>);

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&PdfValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: PdfValue) {
        self.0.insert(key.into(), value);
    }

    pub fn has_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_name(&self, key: &[u8]) -> Option<&[u8]> {
        self.get(key).and_then(PdfValue::as_name)
    }

    /// Whether the `Type` entry is the name `ty`.
    pub fn is_type(&self, ty: &[u8]) -> bool {
        self.get_name(b"Type") == Some(ty)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, Vec<u8>, PdfValue> {
        self.0.iter()
    }

    pub fn total_size(&self) -> usize {
        self.0
            .iter()
            .map(|(k, v)| size_of::<Vec<u8>>() + k.len() + v.total_size())
            .sum()
    }
}

impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        f.write_str("<<")?;
        for (key, value) in entries {
            f.write_str("/")?;
            write_bytes(f, key)?;
            write!(f, " {} ", value)?;
        }
        f.write_str(">>")
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a Vec<u8>, &'a PdfValue);
    type IntoIter = hash_map::Iter<'a, Vec<u8>, PdfValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_display_keeps_fraction_width() {
        let n = Number {
            fraction: 5,
            fraction_digits: 2,
            point: true,
            ..Number::default()
        };
        assert_eq!(n.to_string(), "0.05");

        let n = Number {
            fraction: -5,
            fraction_digits: 1,
            negative: true,
            point: true,
            ..Number::default()
        };
        assert_eq!(n.to_string(), "-0.5");
        assert!((n.as_f64() + 0.5).abs() < f64::EPSILON);

        assert_eq!(Number::from_integer(-17).to_string(), "-17");
        assert!(Number::from_integer(-17).is_negative());
        assert!(!Number::from_integer(0).is_negative());
    }

    #[test]
    fn negative_zero_and_bare_point() {
        let n = Number {
            negative: true,
            ..Number::default()
        };
        assert_eq!(n.to_string(), "-0");
        assert!(n.is_negative());

        let n = Number {
            integer: 5,
            point: true,
            ..Number::default()
        };
        assert_eq!(n.to_string(), "5.");
        assert!((n.as_f64() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dictionary_lookup_and_size() {
        let mut dict = Dictionary::new();
        dict.insert(&b"Type"[..], PdfValue::Name(b"Font".to_vec()));
        dict.insert(&b"First"[..], PdfValue::Number(Number::from_integer(32)));
        assert!(dict.is_type(b"Font"));
        assert!(!dict.is_type(b"Page"));
        assert_eq!(dict.get_name(b"Type"), Some(&b"Font"[..]));
        assert!(dict.get(b"Missing").is_none());

        let nested = PdfValue::Array(vec![PdfValue::Dictionary(dict.clone())]);
        assert!(nested.total_size() > dict.total_size());
    }

    #[test]
    fn display_renders_pdf_syntax() {
        let value = PdfValue::Array(vec![
            PdfValue::Reference(Reference::new(4, 0)),
            PdfValue::Name(b"F1".to_vec()),
            PdfValue::String(b"Hi".to_vec()),
        ]);
        assert_eq!(value.to_string(), "[4 0 R /F1 (Hi)]");
    }
}
