//! Turns character codes into text for one font.
//!
//! Lookup order for each position in a code string:
//!
//! 1. ToUnicode ranges (`bfchar` entries are one-code ranges), trying each
//!    range at the byte width of its source strings, then at the fewest bytes
//!    that hold its highest code,
//! 2. the base encoding table with `Differences` applied,
//! 3. printable ASCII passes through unchanged.
//!
//! Anything else contributes nothing. The ligatures U+FB00 to U+FB04 are
//! always spelled out as separate letters.

use std::collections::BTreeMap;

use tracing::warn;
use unicode_normalization::char::decompose_compatible;

use crate::object::PdfValue;
use crate::processor::RunPart;

#[derive(Debug, Clone)]
enum Target {
    /// UTF-16 units; the offset into the range is added to the last unit.
    Offset(Vec<u16>),
    /// One UTF-16 string per code in the range.
    Array(Vec<Vec<u16>>),
}

#[derive(Debug, Clone)]
struct CodeRange {
    high: u32,
    target: Target,
}

type RangeTable = BTreeMap<(u8, u32), CodeRange>;

#[derive(Debug, Clone, Default)]
pub(crate) struct UnicodeMap {
    /// Keyed by source width in bytes and lowest code.
    declared: RangeTable,
    /// The same ranges keyed by the fewest bytes that hold their high code,
    /// where that differs from the declared width.
    minimal: RangeTable,
    table: Option<Box<[u16; 256]>>,
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0, |acc, &b| acc << 8 | b as u32)
}

fn minimal_width(code: u32) -> u8 {
    match code {
        0..=0xff => 1,
        0x100..=0xffff => 2,
        0x1_0000..=0xff_ffff => 3,
        _ => 4,
    }
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    if bytes.len() == 1 {
        return vec![bytes[0] as u16];
    }
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

fn push_char(c: char, out: &mut String) {
    if ('\u{fb00}'..='\u{fb04}').contains(&c) {
        decompose_compatible(c, |d| out.push(d));
    } else {
        out.push(c);
    }
}

fn push_utf16(units: impl IntoIterator<Item = u16>, out: &mut String) {
    for c in char::decode_utf16(units).filter_map(Result::ok) {
        push_char(c, out);
    }
}

fn push_target(target: &Target, offset: u32, out: &mut String) {
    match target {
        Target::Offset(units) => {
            if let Some((last, head)) = units.split_last() {
                let last = last.wrapping_add(offset as u16);
                push_utf16(head.iter().copied().chain(Some(last)), out);
            }
        }
        Target::Array(items) => {
            if let Some(units) = items.get(offset as usize) {
                push_utf16(units.iter().copied(), out);
            }
        }
    }
}

/// Finds the range covering the start of `codes`, trying widths from one byte
/// up. Returns the bytes consumed, the offset into the range, and the range.
fn lookup<'a>(ranges: &'a RangeTable, codes: &[u8]) -> Option<(usize, u32, &'a CodeRange)> {
    if ranges.is_empty() {
        return None;
    }
    for width in 1..=4u8 {
        let w = width as usize;
        if w > codes.len() {
            break;
        }
        let code = code_of(&codes[..w]);
        if let Some((&(_, low), range)) = ranges.range((width, 0)..=(width, code)).next_back() {
            if code <= range.high {
                return Some((w, code - low, range));
            }
        }
    }
    None
}

impl UnicodeMap {
    /// No ranges and no base encoding: only printable ASCII survives.
    pub(crate) fn fallback() -> Self {
        Self::default()
    }

    pub(crate) fn with_base(table: &[u16; 256]) -> Self {
        UnicodeMap {
            table: Some(Box::new(*table)),
            ..Self::default()
        }
    }

    /// Overrides one single-byte code, as a `Differences` entry does.
    pub(crate) fn set_code(&mut self, code: u8, unicode: u16) {
        self.table.get_or_insert_with(|| Box::new([0; 256]))[code as usize] = unicode;
    }

    /// Builds a map from the operands collected out of a ToUnicode CMap.
    /// `bfchar` entries take precedence over overlapping `bfrange` entries.
    pub(crate) fn from_to_unicode(chars: &[PdfValue], ranges: &[PdfValue]) -> Self {
        let mut map = UnicodeMap::default();
        if chars.len() % 2 != 0 {
            warn!("odd number of bfchar operands: {}", chars.len());
        }
        for pair in chars.chunks_exact(2) {
            match (&pair[0], &pair[1]) {
                (PdfValue::String(src), PdfValue::String(dst)) if (1..=4).contains(&src.len()) => {
                    let code = code_of(src);
                    map.add_range(src.len() as u8, code, code, Target::Offset(utf16_units(dst)));
                }
                _ => warn!("malformed bfchar entry {} {}", pair[0], pair[1]),
            }
        }

        if ranges.len() % 3 != 0 {
            warn!("bfrange operands are not in triples: {}", ranges.len());
        }
        for triple in ranges.chunks_exact(3) {
            let (PdfValue::String(low), PdfValue::String(high)) = (&triple[0], &triple[1]) else {
                warn!("malformed bfrange bounds {} {}", triple[0], triple[1]);
                continue;
            };
            if !(1..=4).contains(&low.len()) || high.len() > 4 {
                warn!("unsupported bfrange code width {}", low.len());
                continue;
            }
            let (low_code, high_code) = (code_of(low), code_of(high));
            if high_code < low_code {
                warn!("empty bfrange {:x}..{:x}", low_code, high_code);
                continue;
            }
            let target = match &triple[2] {
                PdfValue::String(dst) => Target::Offset(utf16_units(dst)),
                PdfValue::Array(items) => Target::Array(
                    items
                        .iter()
                        .map(|item| item.as_string().map(utf16_units).unwrap_or_default())
                        .collect(),
                ),
                other => {
                    warn!("malformed bfrange destination {}", other);
                    continue;
                }
            };
            map.add_range(low.len() as u8, low_code, high_code, target);
        }
        map
    }

    fn add_range(&mut self, width: u8, low: u32, high: u32, target: Target) {
        let range = CodeRange { high, target };
        let minimal = minimal_width(high);
        if minimal != width {
            self.minimal
                .entry((minimal, low))
                .or_insert_with(|| range.clone());
        }
        self.declared.entry((width, low)).or_insert(range);
    }

    pub(crate) fn decode_run(&self, run: &[RunPart], out: &mut String) {
        for part in run {
            match part {
                RunPart::Codes(codes) => self.decode_codes(codes, out),
                RunPart::Space => out.push(' '),
            }
        }
    }

    pub(crate) fn decode(&self, codes: &[u8]) -> String {
        let mut out = String::new();
        self.decode_codes(codes, &mut out);
        out
    }

    fn decode_codes(&self, codes: &[u8], out: &mut String) {
        let mut rest = codes;
        while let Some(&first) = rest.first() {
            let hit = lookup(&self.declared, rest).or_else(|| lookup(&self.minimal, rest));
            if let Some((width, offset, range)) = hit {
                push_target(&range.target, offset, out);
                rest = &rest[width..];
                continue;
            }
            self.push_byte(first, out);
            rest = &rest[1..];
        }
    }

    fn push_byte(&self, b: u8, out: &mut String) {
        let unicode = self.table.as_ref().map_or(0, |table| table[b as usize]);
        if unicode != 0 {
            if let Some(c) = char::from_u32(unicode as u32) {
                push_char(c, out);
            }
        } else if (32..=126).contains(&b) {
            out.push(b as char);
        }
    }
}
