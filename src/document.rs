//! What the parser remembers between objects: retained dictionaries, queued
//! pages, text waiting for its fonts, and the Unicode maps built so far.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use crate::fonts::{self, FontContext, ToUnicodeCommands};
use crate::object::{Dictionary, PdfValue, Reference};
use crate::output::{TextBuffer, TextHandler};
use crate::processor::{ContentExtract, TextCommand};
use crate::unicode::UnicodeMap;

/// Dictionaries without a `Type` that carry any of these keys are stream,
/// name-tree, number-tree or image dictionaries and are not kept.
const DISCARD_KEYS: [&[u8]; 5] = [b"Length", b"Limits", b"P", b"D", b"Height"];

/// Bound on `Parent` links followed when looking for inherited resources.
const MAX_INHERITANCE_DEPTH: usize = 64;

/// A page that cannot be finished until more of the file has been read.
struct Blocked;

enum ActiveMap {
    Fallback,
    Font(Reference),
    Inline(UnicodeMap),
}

struct PendingPage {
    reference: Reference,
    dictionary: Dictionary,
    /// Index into the page's content streams of the next one to replay.
    next_content: usize,
    buffer: TextBuffer,
    active: ActiveMap,
}

pub(crate) struct Document {
    retained: HashMap<Reference, Dictionary>,
    pages: VecDeque<PendingPage>,
    pending_text: HashMap<Reference, VecDeque<TextCommand>>,
    to_unicode: HashMap<Reference, ToUnicodeCommands>,
    maps: HashMap<Reference, UnicodeMap>,
    parsed: HashSet<Reference>,
    fallback: UnicodeMap,
}

fn content_references(page: &Dictionary) -> Vec<Reference> {
    match page.get(b"Contents") {
        Some(PdfValue::Reference(reference)) => vec![*reference],
        Some(PdfValue::Array(items)) => items.iter().filter_map(PdfValue::as_reference).collect(),
        _ => Vec::new(),
    }
}

impl Document {
    pub(crate) fn new() -> Self {
        Document {
            retained: HashMap::new(),
            pages: VecDeque::new(),
            pending_text: HashMap::new(),
            to_unicode: HashMap::new(),
            maps: HashMap::new(),
            parsed: HashSet::new(),
            fallback: UnicodeMap::fallback(),
        }
    }

    /// Queues pages and keeps dictionaries that fonts, resources or metadata
    /// may need later. Everything else is dropped.
    pub(crate) fn add_dictionary(&mut self, reference: Reference, dictionary: Dictionary) {
        match dictionary.get_name(b"Type") {
            Some(b"Page") => {
                debug!(%reference, "page queued");
                self.pages.push_back(PendingPage {
                    reference,
                    dictionary,
                    next_content: 0,
                    buffer: TextBuffer::default(),
                    active: ActiveMap::Fallback,
                });
            }
            // page tree nodes carry inherited resources
            Some(b"Font" | b"Encoding" | b"Pages") => {
                self.retained.insert(reference, dictionary);
            }
            Some(ty) => {
                trace!(%reference, r#type = %String::from_utf8_lossy(ty), "dropped");
            }
            None if DISCARD_KEYS.iter().any(|key| dictionary.has_key(key)) => {
                trace!(%reference, "dropped");
            }
            None => {
                self.retained.insert(reference, dictionary);
            }
        }
    }

    /// Records that a stream has been read, whether or not it held anything.
    pub(crate) fn mark_parsed(&mut self, reference: Reference) {
        self.parsed.insert(reference);
    }

    pub(crate) fn add_content(&mut self, reference: Reference, extract: ContentExtract) {
        self.mark_parsed(reference);
        let ContentExtract {
            texts,
            mut bf_chars,
            mut bf_ranges,
        } = extract;
        if !texts.is_empty() {
            self.pending_text.entry(reference).or_default().extend(texts);
        }
        if !bf_chars.is_empty() || !bf_ranges.is_empty() {
            let commands = self.to_unicode.entry(reference).or_default();
            commands.chars.append(&mut bf_chars);
            commands.ranges.append(&mut bf_ranges);
        }
    }

    /// Approximate bytes held by retained dictionaries, queued pages and
    /// pending text.
    pub(crate) fn memory_estimate(&self) -> usize {
        let retained: usize = self.retained.values().map(Dictionary::total_size).sum();
        let pages: usize = self.pages.iter().map(|p| p.dictionary.total_size()).sum();
        let text: usize = self
            .pending_text
            .values()
            .flat_map(|commands| commands.iter())
            .map(TextCommand::total_size)
            .sum();
        retained + pages + text
    }

    pub(crate) fn resolve<'a>(&'a self, value: &'a PdfValue) -> Option<&'a Dictionary> {
        match value {
            PdfValue::Dictionary(dictionary) => Some(dictionary),
            PdfValue::Reference(reference) => self.retained.get(reference),
            _ => None,
        }
    }

    fn resolve_or_block<'a>(
        &'a self,
        value: &'a PdfValue,
        force: bool,
    ) -> Result<Option<&'a Dictionary>, Blocked> {
        match (self.resolve(value), value) {
            (Some(dictionary), _) => Ok(Some(dictionary)),
            (None, PdfValue::Reference(reference)) if !force => {
                debug!(%reference, "waiting for dictionary");
                Err(Blocked)
            }
            (None, _) => Ok(None),
        }
    }

    /// The page's font resources, following `Parent` links for inherited
    /// `Resources`.
    fn page_fonts(&self, page: &Dictionary, force: bool) -> Result<Dictionary, Blocked> {
        let mut node = page;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Some(resources) = node.get(b"Resources") {
                let Some(resources) = self.resolve_or_block(resources, force)? else {
                    return Ok(Dictionary::new());
                };
                let fonts = match resources.get(b"Font") {
                    Some(fonts) => self.resolve_or_block(fonts, force)?,
                    None => None,
                };
                return Ok(fonts.cloned().unwrap_or_default());
            }
            let Some(parent) = node.get(b"Parent") else {
                break;
            };
            match self.resolve_or_block(parent, force)? {
                Some(parent) => node = parent,
                None => break,
            }
        }
        Ok(Dictionary::new())
    }

    fn font_context(&self) -> FontContext<'_> {
        FontContext {
            retained: &self.retained,
            to_unicode: &self.to_unicode,
            parsed: &self.parsed,
        }
    }

    /// Resolves a `Tf` resource name to the map to decode with. `None` means
    /// the font cannot be built yet.
    fn select_font(
        &mut self,
        font_resources: &Dictionary,
        name: &[u8],
        force: bool,
    ) -> Option<ActiveMap> {
        match font_resources.get(name) {
            Some(PdfValue::Reference(reference)) => {
                if self.maps.contains_key(reference) {
                    return Some(ActiveMap::Font(*reference));
                }
                let built = self
                    .retained
                    .get(reference)
                    .and_then(|font| fonts::unicode_map(font, &self.font_context()));
                match built {
                    Some(map) => {
                        debug!(%reference, "unicode map built");
                        self.maps.insert(*reference, map);
                        Some(ActiveMap::Font(*reference))
                    }
                    None if force => {
                        debug!(%reference, "font unresolved, using fallback map");
                        Some(ActiveMap::Fallback)
                    }
                    None => None,
                }
            }
            Some(PdfValue::Dictionary(font)) => {
                match fonts::unicode_map(font, &self.font_context()) {
                    Some(map) => Some(ActiveMap::Inline(map)),
                    None if force => Some(ActiveMap::Fallback),
                    None => None,
                }
            }
            _ => {
                debug!(font = %String::from_utf8_lossy(name), "font not in page resources");
                Some(ActiveMap::Fallback)
            }
        }
    }

    fn active_map<'a>(&'a self, active: &'a ActiveMap) -> &'a UnicodeMap {
        match active {
            ActiveMap::Fallback => &self.fallback,
            ActiveMap::Font(reference) => self.maps.get(reference).unwrap_or(&self.fallback),
            ActiveMap::Inline(map) => map,
        }
    }

    /// Replays the saved text of one content stream. Returns `false`, with
    /// the unreplayed commands put back, when a font is not available yet.
    fn replay(
        &mut self,
        content: Reference,
        font_resources: &Dictionary,
        page: &mut PendingPage,
        force: bool,
        sink: &mut dyn TextHandler,
    ) -> bool {
        let Some(mut commands) = self.pending_text.remove(&content) else {
            return true;
        };
        while let Some(command) = commands.pop_front() {
            match command {
                TextCommand::Font(name) => match self.select_font(font_resources, &name, force) {
                    Some(active) => page.active = active,
                    None => {
                        commands.push_front(TextCommand::Font(name));
                        self.pending_text.insert(content, commands);
                        return false;
                    }
                },
                TextCommand::Text(run) => {
                    let mut text = String::new();
                    self.active_map(&page.active).decode_run(&run, &mut text);
                    page.buffer.push(&text, sink);
                }
            }
        }
        true
    }

    /// Works through as much of a page as can be decoded. Returns `true` once
    /// every content stream of the page has been replayed or skipped.
    fn process_page(&mut self, page: &mut PendingPage, force: bool, sink: &mut dyn TextHandler) -> bool {
        let Ok(fonts) = self.page_fonts(&page.dictionary, force) else {
            return false;
        };
        let contents = content_references(&page.dictionary);
        while let Some(&content) = contents.get(page.next_content) {
            if !self.parsed.contains(&content) {
                if !force {
                    trace!(%content, "waiting for content stream");
                    return false;
                }
                debug!(%content, "content stream not seen, skipping");
            } else if !self.replay(content, &fonts, page, force, sink) {
                return false;
            }
            page.next_content += 1;
        }
        true
    }

    /// Hands the text of finished pages to `sink`, in the order the pages were
    /// found. Without `force` the pass stops at the first page still waiting
    /// for data; with it, missing pieces are skipped or decoded with the
    /// fallback map.
    pub(crate) fn commit(&mut self, force: bool, sink: &mut dyn TextHandler) {
        while let Some(mut page) = self.pages.pop_front() {
            if self.process_page(&mut page, force, sink) {
                page.buffer.flush(sink);
                debug!(reference = %page.reference, "page committed");
            } else {
                self.pages.push_front(page);
                break;
            }
        }
    }
}
