use std::fmt::Formatter;

#[derive(Debug)]
pub enum ParseError {
    /// The underlying stream failed.
    IoError(std::io::Error),
    /// The bytes at `offset` do not form the expected PDF construct.
    Syntax { offset: u64, message: String },
    /// Arrays or dictionaries were nested beyond the supported depth.
    NestingTooDeep { offset: u64 },
    /// The input ended in the middle of the named construct.
    UnexpectedEof(&'static str),
}

impl ParseError {
    pub(crate) fn syntax(offset: u64, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            offset,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            ParseError::IoError(e) => write!(f, "IO error: {}", e),
            ParseError::Syntax { offset, message } => {
                write!(f, "Syntax error at offset {}: {}", offset, message)
            }
            ParseError::NestingTooDeep { offset } => {
                write!(f, "Objects nested too deeply at offset {}", offset)
            }
            ParseError::UnexpectedEof(context) => {
                write!(f, "Premature end of stream in {}", context)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::IoError(e)
    }
}
