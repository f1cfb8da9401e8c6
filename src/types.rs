use std::fmt;

use crate::metadata::Metadata;

/// Output of PDF text extraction.
///
/// Holds the committed text runs in the order they were handed out (page
/// discovery order, not necessarily reading order), the document metadata,
/// and the message of the error that cut the scan short, if there was one.
#[derive(Debug, Clone, Default)]
pub struct TextOutput {
    texts: Vec<String>,
    metadata: Metadata,
    error: Option<String>,
}

impl TextOutput {
    pub(crate) fn new(texts: Vec<String>, metadata: Metadata, error: Option<String>) -> Self {
        TextOutput {
            texts,
            metadata,
            error,
        }
    }

    /// Get the extracted text runs.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Consume self and return the extracted text runs.
    pub fn into_texts(self) -> Vec<String> {
        self.texts
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The error that stopped the scan early. Text found before it is still
    /// in [`TextOutput::texts`].
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for TextOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for text in &self.texts {
            writeln!(f, "{}", text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_puts_each_run_on_a_line() {
        let output = TextOutput::new(
            vec!["first".to_owned(), "second".to_owned()],
            Metadata::default(),
            None,
        );
        assert_eq!(output.to_string(), "first\nsecond\n");
        assert!(output.is_complete());
        assert_eq!(output.into_texts().len(), 2);
    }
}
