//! Incremental HTML scanner.
//!
//! # Responsibilities
//! - Split arbitrary chunks of markup into text, tags and opaque spans
//!   (comments, doctypes, processing instructions)
//! - Forward everything that is known to be outside a matched element
//! - Capture matched elements until their end tag and substitute them
//!
//! # Design Decisions
//! - Works on bytes; only ASCII delimiters are inspected, so multi-byte
//!   UTF-8 sequences pass through untouched even when split across chunks
//! - Only an incomplete tag/comment (or a captured element) is held back
//! - `script`, `style`, `textarea` and `title` bodies are raw text: `<`
//!   inside them never starts a tag
//! - Nested elements with the captured tag name are depth-counted so the
//!   outermost match is replaced as a whole

use std::sync::Arc;

use crate::observability::metrics;
use crate::rewrite::rule::RewriteRule;
use crate::rewrite::selector::Element;

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const COMMENT_OPEN: &[u8] = b"<!--";
const COMMENT_CLOSE: &[u8] = b"-->";

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[derive(Debug, PartialEq, Eq)]
struct StartTag {
    len: usize,
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    /// Bytes that turned out not to start markup.
    Text(usize),
    /// Comment, doctype or processing instruction.
    Opaque(usize),
    StartTag(StartTag),
    EndTag { len: usize, name: String },
    /// More input is needed to decide.
    Incomplete,
}

enum RawStep {
    Emit(usize),
    Exit,
    Wait,
}

struct Capture {
    rule: usize,
    element: Element,
    depth: usize,
    buf: Vec<u8>,
}

/// Push-style rewriting state machine for one pass over a document.
pub struct HtmlRewriter {
    rules: Arc<[RewriteRule]>,
    pending: Vec<u8>,
    capture: Option<Capture>,
    raw_text: Option<&'static str>,
    replaced: usize,
}

impl HtmlRewriter {
    pub fn new(rules: Arc<[RewriteRule]>) -> Self {
        Self {
            rules,
            pending: Vec::new(),
            capture: None,
            raw_text: None,
            replaced: 0,
        }
    }

    /// Feed a chunk; whatever can be decided is appended to `out`.
    pub fn write(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        self.pending.extend_from_slice(chunk);
        let mut input = std::mem::take(&mut self.pending);
        let consumed = self.scan(&input, out);
        input.drain(..consumed);
        self.pending = input;
    }

    /// Flush everything still held back. An unclosed match is emitted
    /// verbatim.
    pub fn end(&mut self, out: &mut Vec<u8>) {
        if let Some(capture) = self.capture.take() {
            tracing::debug!(
                tag = %capture.element.tag(),
                "Matched element never closed, forwarding verbatim"
            );
            out.extend_from_slice(&capture.buf);
        }
        out.append(&mut self.pending);
        self.raw_text = None;
    }

    /// Rewrite a complete document in one call.
    pub fn rewrite(&mut self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len());
        self.write(input, &mut out);
        self.end(&mut out);
        out
    }

    /// Bytes currently held back (pending plus captured).
    pub fn buffered(&self) -> usize {
        self.pending.len() + self.capture.as_ref().map_or(0, |c| c.buf.len())
    }

    /// Elements replaced so far.
    pub fn replaced(&self) -> usize {
        self.replaced
    }

    fn scan(&mut self, input: &[u8], out: &mut Vec<u8>) -> usize {
        let mut pos = 0;

        while pos < input.len() {
            let rest = &input[pos..];

            if let Some(tag) = self.raw_text {
                match raw_text_step(rest, tag) {
                    RawStep::Emit(n) => {
                        self.emit(&rest[..n], out);
                        pos += n;
                    }
                    RawStep::Exit => self.raw_text = None,
                    RawStep::Wait => break,
                }
                continue;
            }

            if rest[0] != b'<' {
                let n = find_byte(rest, b'<').unwrap_or(rest.len());
                self.emit(&rest[..n], out);
                pos += n;
                continue;
            }

            match next_token(rest) {
                Token::Incomplete => break,
                Token::Text(n) | Token::Opaque(n) => {
                    self.emit(&rest[..n], out);
                    pos += n;
                }
                Token::StartTag(tag) => {
                    let len = tag.len;
                    self.start_tag(tag, &rest[..len], out);
                    pos += len;
                }
                Token::EndTag { len, name } => {
                    self.end_tag(&name, &rest[..len], out);
                    pos += len;
                }
            }
        }

        pos
    }

    fn emit(&mut self, bytes: &[u8], out: &mut Vec<u8>) {
        match &mut self.capture {
            Some(capture) => capture.buf.extend_from_slice(bytes),
            None => out.extend_from_slice(bytes),
        }
    }

    fn start_tag(&mut self, tag: StartTag, raw: &[u8], out: &mut Vec<u8>) {
        let enters_raw_text = if tag.self_closing {
            None
        } else {
            RAW_TEXT_ELEMENTS.iter().copied().find(|name| *name == tag.name)
        };

        if let Some(capture) = &mut self.capture {
            capture.buf.extend_from_slice(raw);
            if tag.name == capture.element.tag && !tag.self_closing && !is_void(&tag.name) {
                capture.depth += 1;
            }
        } else if let Some(rule) = self.match_rule(&tag) {
            let closes_itself = tag.self_closing || is_void(&tag.name);
            let element = Element::new(tag.name, tag.attributes, raw);
            if closes_itself {
                self.replace(rule, &element, out);
            } else {
                self.capture = Some(Capture {
                    rule,
                    element,
                    depth: 1,
                    buf: raw.to_vec(),
                });
            }
        } else {
            out.extend_from_slice(raw);
        }

        self.raw_text = enters_raw_text;
    }

    fn end_tag(&mut self, name: &str, raw: &[u8], out: &mut Vec<u8>) {
        let closed = match &mut self.capture {
            None => {
                out.extend_from_slice(raw);
                return;
            }
            Some(capture) => {
                capture.buf.extend_from_slice(raw);
                if name == capture.element.tag {
                    capture.depth -= 1;
                }
                capture.depth == 0
            }
        };

        if closed {
            if let Some(capture) = self.capture.take() {
                let mut element = capture.element;
                element.html = String::from_utf8_lossy(&capture.buf).into_owned();
                self.replace(capture.rule, &element, out);
            }
        }
    }

    fn match_rule(&self, tag: &StartTag) -> Option<usize> {
        self.rules
            .iter()
            .position(|rule| rule.selector.matches(&tag.name, &tag.attributes))
    }

    fn replace(&mut self, rule: usize, element: &Element, out: &mut Vec<u8>) {
        let rule = &self.rules[rule];
        tracing::trace!(selector = %rule.selector, "Replacing element");
        out.extend_from_slice(rule.replacement.render(element).as_bytes());
        self.replaced += 1;
        metrics::record_rewrite();
    }
}

fn raw_text_step(rest: &[u8], tag: &str) -> RawStep {
    match find_subslice(rest, b"</") {
        Some(0) => {
            let name_end = 2 + tag.len();
            if rest.len() <= name_end {
                RawStep::Wait
            } else if rest[2..name_end].eq_ignore_ascii_case(tag.as_bytes())
                && is_name_end(rest[name_end])
            {
                RawStep::Exit
            } else {
                RawStep::Emit(2)
            }
        }
        Some(i) => RawStep::Emit(i),
        None => {
            // A trailing '<' may begin the closing tag.
            let keep = usize::from(rest.last() == Some(&b'<'));
            match rest.len() - keep {
                0 => RawStep::Wait,
                n => RawStep::Emit(n),
            }
        }
    }
}

fn next_token(input: &[u8]) -> Token {
    let Some(&next) = input.get(1) else {
        return Token::Incomplete;
    };
    match next {
        b'!' => scan_declaration(input),
        b'?' => find_byte(input, b'>').map_or(Token::Incomplete, |i| Token::Opaque(i + 1)),
        b'/' => scan_end_tag(input),
        c if c.is_ascii_alphabetic() => scan_start_tag(input),
        _ => Token::Text(1),
    }
}

fn scan_declaration(input: &[u8]) -> Token {
    if input.len() < COMMENT_OPEN.len() && COMMENT_OPEN.starts_with(input) {
        return Token::Incomplete;
    }
    if input.starts_with(COMMENT_OPEN) {
        let body = &input[COMMENT_OPEN.len()..];
        return find_subslice(body, COMMENT_CLOSE).map_or(Token::Incomplete, |i| {
            Token::Opaque(COMMENT_OPEN.len() + i + COMMENT_CLOSE.len())
        });
    }
    find_byte(input, b'>').map_or(Token::Incomplete, |i| Token::Opaque(i + 1))
}

fn scan_end_tag(input: &[u8]) -> Token {
    let Some(&first) = input.get(2) else {
        return Token::Incomplete;
    };
    if !first.is_ascii_alphabetic() {
        return Token::Text(1);
    }
    let Some(close) = find_byte(input, b'>') else {
        return Token::Incomplete;
    };
    let name_end = input[2..close]
        .iter()
        .position(|b| is_name_end(*b))
        .map_or(close, |i| i + 2);

    Token::EndTag {
        len: close + 1,
        name: lowercase(&input[2..name_end]),
    }
}

fn scan_start_tag(input: &[u8]) -> Token {
    let mut pos = 1;
    while pos < input.len() && !is_name_end(input[pos]) {
        pos += 1;
    }
    if pos == input.len() {
        return Token::Incomplete;
    }

    let name = lowercase(&input[1..pos]);
    let mut attributes = Vec::new();

    loop {
        pos = skip_whitespace(input, pos);
        let Some(&byte) = input.get(pos) else {
            return Token::Incomplete;
        };

        match byte {
            b'>' => {
                return Token::StartTag(StartTag {
                    len: pos + 1,
                    name,
                    attributes,
                    self_closing: false,
                })
            }
            b'/' => {
                let Some(&after) = input.get(pos + 1) else {
                    return Token::Incomplete;
                };
                if after == b'>' {
                    return Token::StartTag(StartTag {
                        len: pos + 2,
                        name,
                        attributes,
                        self_closing: true,
                    });
                }
                pos += 1;
            }
            _ => {
                let start = pos;
                while pos < input.len() && !is_attr_name_end(input[pos]) {
                    pos += 1;
                }
                let attr_name = lowercase(&input[start..pos]);

                let after_name = skip_whitespace(input, pos);
                let Some(&delimiter) = input.get(after_name) else {
                    return Token::Incomplete;
                };

                let mut value = String::new();
                if delimiter == b'=' {
                    pos = skip_whitespace(input, after_name + 1);
                    let Some(&quote) = input.get(pos) else {
                        return Token::Incomplete;
                    };
                    if quote == b'"' || quote == b'\'' {
                        let Some(end) = find_byte(&input[pos + 1..], quote) else {
                            return Token::Incomplete;
                        };
                        value = String::from_utf8_lossy(&input[pos + 1..pos + 1 + end]).into_owned();
                        pos += end + 2;
                    } else {
                        let start = pos;
                        while pos < input.len()
                            && !input[pos].is_ascii_whitespace()
                            && input[pos] != b'>'
                        {
                            pos += 1;
                        }
                        if pos == input.len() {
                            return Token::Incomplete;
                        }
                        value = String::from_utf8_lossy(&input[start..pos]).into_owned();
                    }
                } else {
                    pos = after_name;
                }

                attributes.push((attr_name, value));
            }
        }
    }
}

fn is_name_end(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == b'/' || byte == b'>'
}

fn is_attr_name_end(byte: u8) -> bool {
    is_name_end(byte) || byte == b'='
}

fn skip_whitespace(input: &[u8], mut pos: usize) -> usize {
    while pos < input.len() && input[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn lowercase(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_ascii_lowercase()
}

fn find_byte(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|b| *b == needle)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
