use std::io::Read;

use tracing::trace;

use crate::content::ContentReader;
use crate::error::ParseError;
use crate::object::PdfValue;

/// `TJ` adjustments larger than this, in thousandths of a text space unit,
/// are taken to separate words.
const WORD_GAP_THRESHOLD: f64 = 150.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RunPart {
    /// Undecoded character codes.
    Codes(Vec<u8>),
    /// A word gap from a `TJ` array. Always rendered as one space.
    Space,
}

/// A text operation saved from a content stream until its font is known.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TextCommand {
    /// `Tf`: the resource name of the font to switch to.
    Font(Vec<u8>),
    /// `Tj`, `'`, `"` or `TJ`.
    Text(Vec<RunPart>),
}

impl TextCommand {
    pub(crate) fn total_size(&self) -> usize {
        std::mem::size_of::<TextCommand>()
            + match self {
                TextCommand::Font(name) => name.len(),
                TextCommand::Text(parts) => parts
                    .iter()
                    .map(|part| match part {
                        RunPart::Codes(codes) => std::mem::size_of::<RunPart>() + codes.len(),
                        RunPart::Space => std::mem::size_of::<RunPart>(),
                    })
                    .sum(),
            }
    }
}

/// What a content stream contributes to text extraction.
#[derive(Debug, Default)]
pub(crate) struct ContentExtract {
    pub(crate) texts: Vec<TextCommand>,
    /// Operands of `beginbfchar ... endbfchar` sections, in order.
    pub(crate) bf_chars: Vec<PdfValue>,
    /// Operands of `beginbfrange ... endbfrange` sections, in order.
    pub(crate) bf_ranges: Vec<PdfValue>,
}

impl ContentExtract {
    pub(crate) fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.bf_chars.is_empty() && self.bf_ranges.is_empty()
    }
}

fn text_run(value: PdfValue) -> Option<Vec<RunPart>> {
    match value {
        PdfValue::String(codes) => Some(vec![RunPart::Codes(codes)]),
        PdfValue::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    PdfValue::String(codes) => Some(RunPart::Codes(codes)),
                    PdfValue::Number(n) if n.as_f64().abs() > WORD_GAP_THRESHOLD => {
                        Some(RunPart::Space)
                    }
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

fn save_text(extract: &mut ContentExtract, operand: Option<PdfValue>) {
    if let Some(run) = operand.and_then(text_run) {
        extract.texts.push(TextCommand::Text(run));
    }
}

/// Runs through a content stream and collects its text and ToUnicode
/// operations into `extract`. Whatever was collected before an error stays
/// in `extract`.
pub(crate) fn process_content<R: Read>(
    reader: R,
    extract: &mut ContentExtract,
) -> Result<(), ParseError> {
    let mut content = ContentReader::new(reader);
    while let Some(op) = content.next_operation()? {
        let mut operands = op.operands;
        match op.operator.as_slice() {
            b"Tf" => {
                if let Some(PdfValue::Name(name)) = operands.into_iter().next() {
                    extract.texts.push(TextCommand::Font(name));
                }
            }
            b"Tj" | b"'" | b"TJ" => save_text(extract, operands.into_iter().next()),
            b"\"" => save_text(extract, operands.pop()),
            b"endbfchar" => extract.bf_chars.append(&mut operands),
            b"endbfrange" => extract.bf_ranges.append(&mut operands),
            b"" => match operands.into_iter().next() {
                Some(PdfValue::Name(name)) => extract.texts.push(TextCommand::Font(name)),
                other => save_text(extract, other),
            },
            other => trace!(operator = %String::from_utf8_lossy(other), "ignored"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(input: &[u8]) -> ContentExtract {
        let mut extract = ContentExtract::default();
        process_content(input, &mut extract).unwrap();
        extract
    }

    fn codes(s: &[u8]) -> RunPart {
        RunPart::Codes(s.to_vec())
    }

    #[test]
    fn text_operators() {
        let e = extract(b"BT /F1 12 Tf (Hi) Tj T* (next) ' 1 2 (quoted) \" ET");
        assert_eq!(
            e.texts,
            vec![
                TextCommand::Font(b"F1".to_vec()),
                TextCommand::Text(vec![codes(b"Hi")]),
                TextCommand::Text(vec![codes(b"next")]),
                TextCommand::Text(vec![codes(b"quoted")]),
            ]
        );
    }

    #[test]
    fn tj_array_word_gaps() {
        let e = extract(b"[(Hello) -200 (World)] TJ [(Hello) -50 (World)] TJ [(a) 151.5 (b) -150 (c) -150.25 (d)] TJ");
        assert_eq!(
            e.texts,
            vec![
                TextCommand::Text(vec![codes(b"Hello"), RunPart::Space, codes(b"World")]),
                TextCommand::Text(vec![codes(b"Hello"), codes(b"World")]),
                TextCommand::Text(vec![
                    codes(b"a"),
                    RunPart::Space,
                    codes(b"b"),
                    codes(b"c"),
                    RunPart::Space,
                    codes(b"d"),
                ]),
            ]
        );
    }

    #[test]
    fn trailing_operand_is_kept() {
        let mut e = ContentExtract::default();
        assert!(process_content(&b"BT /F2 9 Tf (cut off"[..], &mut e).is_err());
        assert_eq!(e.texts, vec![TextCommand::Font(b"F2".to_vec())]);

        let e = extract(b"BT /F2 9 Tf (cut) (off)");
        assert_eq!(
            e.texts,
            vec![
                TextCommand::Font(b"F2".to_vec()),
                TextCommand::Text(vec![codes(b"cut")]),
            ]
        );
    }

    #[test]
    fn to_unicode_sections() {
        let e = extract(
            b"/CIDInit /ProcSet findresource begin 12 dict begin begincmap\n\
              1 begincodespacerange <00> <FF> endcodespacerange\n\
              2 beginbfchar <01> <0041> <02> <0042> endbfchar\n\
              1 beginbfrange <10> <1f> <0061> endbfrange\n\
              endcmap CMapName currentdict /CMap defineresource pop end end",
        );
        assert!(e.texts.is_empty());
        assert_eq!(e.bf_chars.len(), 4);
        assert_eq!(e.bf_ranges.len(), 3);
        assert!(!e.is_empty());
    }
}
