//! Incremental anchor `href` extraction.
//!
//! Built on html5ever's tokenizer rather than a DOM parse, so a page can be
//! scanned chunk by chunk while its body is still streaming in. Tokenizer
//! state and any half-received UTF-8 sequence are carried between chunks.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use tracing::trace;

const ANCHOR: &str = "a";
const LINK_REF: &str = "href";

#[derive(Default)]
struct HrefSink {
    hrefs: Vec<String>,
}

impl HrefSink {
    fn anchor_href(&mut self, tag: Tag) {
        if tag.kind != TagKind::StartTag || &*tag.name != ANCHOR {
            return;
        }
        if let Some(attr) = tag.attrs.iter().find(|a| &*a.name.local == LINK_REF) {
            self.hrefs.push(attr.value.to_string());
        }
    }
}

impl TokenSink for HrefSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => self.anchor_href(tag),
            Token::ParseError(err) => trace!("Ignoring HTML parse error on line {}: {}", line_number, err),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// Streams HTML bytes in and raw anchor `href` values out, in document order.
///
/// Values are reported exactly as written in the markup (entities decoded),
/// with no trimming, filtering or deduplication.
pub struct LinkExtractor {
    tokenizer: Tokenizer<HrefSink>,
    input: BufferQueue,
    pending: Vec<u8>,
    finished: bool,
}

impl LinkExtractor {
    pub fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(HrefSink::default(), TokenizerOpts::default()),
            input: BufferQueue::default(),
            pending: Vec::new(),
            finished: false,
        }
    }

    /// Feed the next chunk of the document and return any hrefs it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.finished {
            return Vec::new();
        }
        self.pending.extend_from_slice(chunk);
        let text = self.decode_pending();
        self.run(&text);
        std::mem::take(&mut self.tokenizer.sink.hrefs)
    }

    /// Signal end of input. A tag still open at this point is dropped.
    pub fn finish(&mut self) -> Vec<String> {
        if self.finished {
            return Vec::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        self.run(&tail);
        self.tokenizer.end();
        self.finished = true;
        std::mem::take(&mut self.tokenizer.sink.hrefs)
    }

    fn run(&mut self, text: &str) {
        if !text.is_empty() {
            self.input.push_back(StrTendril::from_slice(text));
        }
        // The sink never asks for a script pause, so the result is always Done.
        let _ = self.tokenizer.feed(&mut self.input);
    }

    /// Decode as much of the buffered input as forms complete UTF-8,
    /// replacing invalid sequences and keeping an incomplete tail for later.
    fn decode_pending(&mut self) -> String {
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    return text;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        None => {
                            self.pending.drain(..valid_up_to);
                            return text;
                        }
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + invalid);
                        }
                    }
                }
            }
        }
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}
