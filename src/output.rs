use crate::object::Reference;

/// Receives each completed run of extracted text.
pub trait TextHandler {
    fn handle_text(&mut self, text: &str);
}

impl<F: FnMut(&str)> TextHandler for F {
    fn handle_text(&mut self, text: &str) {
        self(text)
    }
}

/// Receives the decoded bytes of every stream attached to an object.
/// Streams with filters other than `FlateDecode` are passed on undecoded.
pub trait StreamHandler {
    fn handle_stream(&mut self, reference: Reference, data: &[u8]);
}

impl<F: FnMut(Reference, &[u8])> StreamHandler for F {
    fn handle_stream(&mut self, reference: Reference, data: &[u8]) {
        self(reference, data)
    }
}

/// Collects the text of one page. A fragment following one that ends in a
/// hyphen is joined to it with the hyphen removed; otherwise the previous
/// text is handed on first.
#[derive(Debug, Default)]
pub(crate) struct TextBuffer {
    text: String,
}

impl TextBuffer {
    pub(crate) fn push(&mut self, fragment: &str, sink: &mut dyn TextHandler) {
        if fragment.is_empty() {
            return;
        }
        if self.text.ends_with('-') {
            self.text.pop();
        } else {
            self.flush(sink);
        }
        self.text.push_str(fragment);
    }

    pub(crate) fn flush(&mut self, sink: &mut dyn TextHandler) {
        if !self.text.is_empty() {
            sink.handle_text(&self.text);
            self.text.clear();
        }
    }
}
