use encoding_rs::UTF_16BE;

use crate::data::PDF_DOC_ENCODING;

/// Decodes a PDF text string: UTF-16BE when it starts with a byte order mark,
/// PDFDocEncoding otherwise. Undefined PDFDocEncoding bytes are dropped.
pub(crate) fn pdf_to_utf8(s: &[u8]) -> String {
    if s.len() >= 2 && s[0] == 0xfe && s[1] == 0xff {
        let (text, _) = UTF_16BE.decode_without_bom_handling(&s[2..]);
        text.into_owned()
    } else {
        let r: Vec<u8> = s
            .iter()
            .map(|&x| PDF_DOC_ENCODING[x as usize])
            .filter(|&k| k != 0)
            .flat_map(u16::to_be_bytes)
            .collect();
        let (text, _) = UTF_16BE.decode_without_bom_handling(&r);
        text.into_owned()
    }
}
