mod encodings;
mod glyphnames;

pub(crate) use encodings::{
    MAC_ROMAN_ENCODING, PDF_DOC_ENCODING, STANDARD_ENCODING, WIN_ANSI_ENCODING,
};
pub(crate) use glyphnames::GLYPH_NAMES;
