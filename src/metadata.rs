use std::collections::BTreeMap;

use crate::object::Dictionary;
use crate::utils::pdf_to_utf8;

/// The string entries of a document's `Info` dictionary.
///
/// Values are kept as written, so dates stay in the PDF `D:YYYYMMDDHHmmSSOHH'mm`
/// form; [`Metadata::creation_date`] and [`Metadata::modification_date`]
/// convert them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, String>,
}

impl Metadata {
    pub(crate) fn from_info(info: &Dictionary) -> Self {
        let entries = info
            .iter()
            .filter_map(|(key, value)| {
                let value = value.as_string()?;
                Some((String::from_utf8_lossy(key).into_owned(), pdf_to_utf8(value)))
            })
            .collect();
        Metadata { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn title(&self) -> Option<&str> {
        self.get("Title")
    }

    pub fn author(&self) -> Option<&str> {
        self.get("Author")
    }

    /// The `Keywords` entry split on whitespace.
    pub fn keywords(&self) -> Vec<&str> {
        self.get("Keywords")
            .map(|k| k.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// `CreationDate` as an XML Schema `dateTime`.
    pub fn creation_date(&self) -> Option<String> {
        self.get("CreationDate").and_then(pdf_date_to_xsd)
    }

    /// `ModDate` as an XML Schema `dateTime`.
    pub fn modification_date(&self) -> Option<String> {
        self.get("ModDate").and_then(pdf_date_to_xsd)
    }
}

/// Converts a PDF date such as `D:20230415103000+02'00` into
/// `2023-04-15T10:30:00+02:00`.
///
/// Only the year is required; missing fields default to the start of the
/// period and a missing time zone is left out. Returns `None` without a
/// four digit year.
pub fn pdf_date_to_xsd(date: &str) -> Option<String> {
    fn two_digits(s: &[u8], at: usize) -> Option<&str> {
        let bytes = s.get(at..at + 2)?;
        if !bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }
        std::str::from_utf8(bytes).ok()
    }

    let s = date.strip_prefix("D:").unwrap_or(date).as_bytes();
    let year = s.get(..4).filter(|y| y.iter().all(u8::is_ascii_digit))?;
    let year = std::str::from_utf8(year).ok()?;
    let mut parts = ["01", "01", "00", "00", "00"];
    let mut at = 4;
    for part in parts.iter_mut() {
        match two_digits(s, at) {
            Some(value) => *part = value,
            None => break,
        }
        at += 2;
    }
    let [month, day, hour, minute, second] = parts;
    let mut result = format!("{year}-{month}-{day}T{hour}:{minute}:{second}");

    if at == 14 {
        match s.get(14) {
            Some(b'Z') => result.push('Z'),
            Some(&sign @ (b'+' | b'-')) => {
                let zone_hour = two_digits(s, 15).unwrap_or("00");
                let zone_minute = match s.get(17) {
                    Some(b'\'') => two_digits(s, 18).unwrap_or("00"),
                    _ => "00",
                };
                result.push(sign as char);
                result.push_str(zone_hour);
                result.push(':');
                result.push_str(zone_minute);
            }
            _ => {}
        }
    }
    Some(result)
}

/// Whether `header` looks like the start of a PDF file.
pub fn is_pdf(header: &[u8]) -> bool {
    header.len() > 7 && header.starts_with(b"%PDF-1.")
}

impl From<&Dictionary> for Metadata {
    fn from(info: &Dictionary) -> Self {
        Metadata::from_info(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Number, PdfValue};

    #[test]
    fn dates() {
        assert_eq!(
            pdf_date_to_xsd("D:20230415103000+02'00").as_deref(),
            Some("2023-04-15T10:30:00+02:00")
        );
        assert_eq!(
            pdf_date_to_xsd("D:19991231235959Z").as_deref(),
            Some("1999-12-31T23:59:59Z")
        );
        assert_eq!(
            pdf_date_to_xsd("D:20010203-05").as_deref(),
            Some("2001-02-03T00:00:00")
        );
        assert_eq!(
            pdf_date_to_xsd("D:20010203040506-05").as_deref(),
            Some("2001-02-03T04:05:06-05:00")
        );
        assert_eq!(
            pdf_date_to_xsd("2004").as_deref(),
            Some("2004-01-01T00:00:00")
        );
        assert_eq!(pdf_date_to_xsd("D:12"), None);
        assert_eq!(pdf_date_to_xsd(""), None);
    }

    #[test]
    fn header_check() {
        assert!(is_pdf(b"%PDF-1.7\n"));
        assert!(!is_pdf(b"%PDF-1."));
        assert!(!is_pdf(b"%!PS-Adobe-3.0"));
    }

    #[test]
    fn info_strings() {
        let mut info = Dictionary::new();
        info.insert(&b"Title"[..], PdfValue::String(b"\xfe\xff\x00T\x00e\x00s\x00t".to_vec()));
        info.insert(&b"Keywords"[..], PdfValue::String(b"  pdf\tstreams text ".to_vec()));
        info.insert(&b"CreationDate"[..], PdfValue::String(b"D:20200101120000Z".to_vec()));
        info.insert(&b"Trapped"[..], PdfValue::Name(b"False".to_vec()));
        info.insert(&b"Pages"[..], PdfValue::Number(Number::from_integer(3)));

        let metadata = Metadata::from(&info);
        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata.title(), Some("Test"));
        assert_eq!(metadata.author(), None);
        assert_eq!(metadata.keywords(), vec!["pdf", "streams", "text"]);
        assert_eq!(metadata.get("CreationDate"), Some("D:20200101120000Z"));
        assert_eq!(
            metadata.creation_date().as_deref(),
            Some("2020-01-01T12:00:00Z")
        );
        assert_eq!(metadata.modification_date(), None);
    }
}
