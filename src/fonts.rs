use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::data::{
    GLYPH_NAMES, MAC_ROMAN_ENCODING, PDF_DOC_ENCODING, STANDARD_ENCODING, WIN_ANSI_ENCODING,
};
use crate::object::{Dictionary, PdfValue, Reference};
use crate::unicode::UnicodeMap;

/// Operands gathered from the `bfchar` and `bfrange` sections of one
/// ToUnicode stream.
#[derive(Debug, Default)]
pub(crate) struct ToUnicodeCommands {
    pub(crate) chars: Vec<PdfValue>,
    pub(crate) ranges: Vec<PdfValue>,
}

/// The parser tables a font needs to be resolved against.
pub(crate) struct FontContext<'a> {
    pub(crate) retained: &'a HashMap<Reference, Dictionary>,
    pub(crate) to_unicode: &'a HashMap<Reference, ToUnicodeCommands>,
    /// Streams that have been read already.
    pub(crate) parsed: &'a HashSet<Reference>,
}

fn encoding_table(name: &[u8]) -> Option<&'static [u16; 256]> {
    match name {
        b"WinAnsiEncoding" => Some(&WIN_ANSI_ENCODING),
        b"MacRomanEncoding" => Some(&MAC_ROMAN_ENCODING),
        b"StandardEncoding" => Some(&STANDARD_ENCODING),
        b"PDFDocEncoding" => Some(&PDF_DOC_ENCODING),
        _ => None,
    }
}

/// Unicode value of a glyph name from a `Differences` array.
pub(crate) fn glyph_to_unicode(name: &[u8]) -> Option<u16> {
    if let Ok(i) = GLYPH_NAMES.binary_search_by_key(&name, |&(n, _)| n.as_bytes()) {
        return Some(GLYPH_NAMES[i].1);
    }
    let hex = name.strip_prefix(b"uni").filter(|hex| hex.len() == 4)?;
    u16::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()
}

fn apply_differences(map: &mut UnicodeMap, differences: &[PdfValue]) {
    let mut code: Option<i64> = None;
    for item in differences {
        match item {
            PdfValue::Number(n) => code = Some(n.integer as i64),
            PdfValue::Name(name) => {
                let Some(c) = code else {
                    warn!("glyph name before any code in Differences");
                    continue;
                };
                match (u8::try_from(c), glyph_to_unicode(name)) {
                    (Ok(c), Some(unicode)) => map.set_code(c, unicode),
                    (Ok(_), None) => {
                        warn!("unknown glyph name '{}'", String::from_utf8_lossy(name))
                    }
                    (Err(_), _) => debug!("Differences code {} out of range", c),
                }
                code = Some(c + 1);
            }
            other => debug!("unexpected Differences entry {}", other),
        }
    }
}

fn encoding_dictionary_map(encoding: &Dictionary) -> UnicodeMap {
    let base = encoding
        .get_name(b"BaseEncoding")
        .and_then(encoding_table)
        .unwrap_or(&STANDARD_ENCODING);
    let mut map = UnicodeMap::with_base(base);
    if let Some(differences) = encoding.get(b"Differences").and_then(PdfValue::as_array) {
        apply_differences(&mut map, differences);
    }
    map
}

/// Map for a font's `Encoding` entry, or `None` while a referenced encoding
/// dictionary has not been seen yet.
fn encoding_map(encoding: Option<&PdfValue>, ctx: &FontContext<'_>) -> Option<UnicodeMap> {
    match encoding {
        None => Some(UnicodeMap::fallback()),
        Some(PdfValue::Name(name)) => match encoding_table(name) {
            Some(table) => Some(UnicodeMap::with_base(table)),
            None => {
                debug!("no base table for encoding {}", String::from_utf8_lossy(name));
                Some(UnicodeMap::fallback())
            }
        },
        Some(PdfValue::Dictionary(encoding)) => Some(encoding_dictionary_map(encoding)),
        Some(PdfValue::Reference(reference)) => {
            let encoding = ctx.retained.get(reference);
            if encoding.is_none() {
                debug!("encoding {} not resolved yet", reference);
            }
            encoding.map(encoding_dictionary_map)
        }
        Some(other) => {
            warn!("unexpected Encoding {}", other);
            Some(UnicodeMap::fallback())
        }
    }
}

/// Builds the map for a font dictionary: its ToUnicode CMap when it has one,
/// otherwise its encoding. `None` means something it depends on has not been
/// read yet.
pub(crate) fn unicode_map(font: &Dictionary, ctx: &FontContext<'_>) -> Option<UnicodeMap> {
    if let Some(reference) = font.get(b"ToUnicode").and_then(PdfValue::as_reference) {
        if let Some(commands) = ctx.to_unicode.get(&reference) {
            return Some(UnicodeMap::from_to_unicode(&commands.chars, &commands.ranges));
        }
        if !ctx.parsed.contains(&reference) {
            debug!("ToUnicode stream {} not read yet", reference);
            return None;
        }
        debug!("ToUnicode stream {} has no mappings", reference);
    }
    encoding_map(font.get(b"Encoding"), ctx)
}
