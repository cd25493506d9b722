//! Text normalization for page content.
//!
//! Two transforms live here:
//!
//! - [`to_plain_text`] strips markup from raw page content. It runs when a
//!   page is decoded, so [`BookPage::content`](crate::model::BookPage) is
//!   always plain text.
//! - [`normalize_line_breaks`] (after [`escape_html`]) prepares plain text
//!   for injection into XHTML when a document is composed.
//!
//! Both are idempotent.

mod dom;

use std::borrow::Cow;

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use memchr::{memchr2, memchr3};
use serde::Deserialize;

use dom::{Handle, NodeKind, TextSink};

/// Elements whose text is never part of the readable content.
const SKIPPED: &[&str] = &["script", "style", "template", "noscript"];

/// Options for [`to_plain_text`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlainTextOptions {
    /// Keep block structure as line breaks. When false, all whitespace
    /// (including line breaks) collapses into single spaces.
    pub preserve_blocks: bool,
    /// Maximum number of consecutive blank lines kept between blocks.
    pub max_blank_lines: usize,
}

impl Default for PlainTextOptions {
    fn default() -> Self {
        Self {
            preserve_blocks: true,
            max_blank_lines: 1,
        }
    }
}

impl PlainTextOptions {
    /// Single-line output.
    pub fn flat() -> Self {
        Self {
            preserve_blocks: false,
            max_blank_lines: 0,
        }
    }
}

/// How an element affects line structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Inline,
    /// `<br>`: one hard line break.
    Break,
    /// Starts and ends on its own line.
    Line,
    /// Separated from neighbours by a blank line.
    Paragraph,
}

fn block_kind(tag: &str) -> Block {
    match tag {
        "br" => Block::Break,
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "pre" | "hr"
        | "table" | "ul" | "ol" | "dl" | "figure" => Block::Paragraph,
        "div" | "li" | "tr" | "dt" | "dd" | "section" | "article" | "header" | "footer"
        | "aside" | "nav" | "title" | "caption" | "figcaption" | "address" => Block::Line,
        _ => Block::Inline,
    }
}

/// Strip markup from `raw` and return its text content.
///
/// Entities are decoded and line structure follows `opts`. The extraction is
/// repeated until the output no longer changes, so text that decodes into
/// something markup-like (`&lt;b&gt;`) still yields a stable result and
/// `to_plain_text(to_plain_text(s)) == to_plain_text(s)` holds for any input.
///
/// Every pass that changes the text must also shorten it. A pass that does
/// not is the last one: `&` and `<` in its output are replaced by their
/// fullwidth forms, which no later pass can decode.
pub fn to_plain_text(raw: &str, opts: &PlainTextOptions) -> String {
    let mut current = extract_text(raw, opts);
    loop {
        let next = extract_text(&current, opts);
        if next == current {
            return current;
        }
        if next.len() >= current.len() {
            log::debug!("Plain text extraction stopped shrinking; neutralizing markup");
            return neutralize_markup(&next, opts);
        }
        current = next;
    }
}

/// Text that [`extract_text`] returns unchanged.
fn neutralize_markup(text: &str, opts: &PlainTextOptions) -> String {
    let text = text.replace('&', "\u{FF06}").replace('<', "\u{FF1C}");
    tidy(&text, opts)
}

/// One extraction pass.
fn extract_text(raw: &str, opts: &PlainTextOptions) -> String {
    // Nothing to parse: only line structure needs tidying
    if memchr2(b'<', b'&', raw.as_bytes()).is_none() {
        return tidy(raw, opts);
    }

    let document = parse_document(TextSink::default(), ParseOpts::default())
        .from_utf8()
        .one(raw.as_bytes());

    let mut collector = TextCollector::new(opts.preserve_blocks);
    collector.walk(document);
    tidy(&collector.buf, opts)
}

enum Step {
    Enter(Handle),
    Leave(Block),
}

struct TextCollector {
    buf: String,
    preserve_blocks: bool,
}

impl TextCollector {
    fn new(preserve_blocks: bool) -> Self {
        Self {
            buf: String::new(),
            preserve_blocks,
        }
    }

    /// Depth-first walk with an explicit stack; page markup can nest deeply.
    fn walk(&mut self, root: Handle) {
        let mut stack = vec![Step::Enter(root)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(node) => match &node.kind {
                    NodeKind::Text(text) => self.buf.push_str(&text.borrow()),
                    NodeKind::Element => {
                        let tag = node.local_name();
                        if SKIPPED.contains(&tag) {
                            continue;
                        }
                        let block = block_kind(tag);
                        self.boundary(block);
                        stack.push(Step::Leave(block));
                        for child in node.children.borrow().iter().rev() {
                            stack.push(Step::Enter(child.clone()));
                        }
                    }
                    NodeKind::Document => {
                        for child in node.children.borrow().iter().rev() {
                            stack.push(Step::Enter(child.clone()));
                        }
                    }
                    NodeKind::Other => {}
                },
                Step::Leave(block) => {
                    if block != Block::Break {
                        self.boundary(block);
                    }
                }
            }
        }
    }

    fn boundary(&mut self, block: Block) {
        if !self.preserve_blocks {
            if block != Block::Inline {
                self.buf.push(' ');
            }
            return;
        }
        match block {
            Block::Inline => {}
            Block::Break => self.buf.push('\n'),
            Block::Line => self.ensure_newlines(1),
            Block::Paragraph => self.ensure_newlines(2),
        }
    }

    fn ensure_newlines(&mut self, count: usize) {
        if self.buf.is_empty() {
            return;
        }
        let trailing = self.buf.bytes().rev().take_while(|&b| b == b'\n').count();
        for _ in trailing..count {
            self.buf.push('\n');
        }
    }
}

/// Collapse horizontal whitespace, trim lines and cap blank-line runs.
fn tidy(text: &str, opts: &PlainTextOptions) -> String {
    if !opts.preserve_blocks {
        return text.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    let text = if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    };

    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    // A lone "\r" ends a line too
    for line in text.split(['\n', '\r']) {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            blank_run += 1;
            continue;
        };
        if !out.is_empty() {
            out.push('\n');
            for _ in 0..blank_run.min(opts.max_blank_lines) {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(first);
        for word in words {
            out.push(' ');
            out.push_str(word);
        }
    }
    out
}

/// Escape the characters that are significant in XHTML text and attributes.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if memchr3(b'&', b'<', b'>', s.as_bytes()).is_none() && !s.contains('"') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Replace embedded line breaks with `<br/>` and drop carriage returns.
pub fn normalize_line_breaks(s: &str) -> Cow<'_, str> {
    if memchr2(b'\n', b'\r', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace('\n', "<br/>").replace('\r', ""))
}

/// Plain text as XHTML text content: escaped, line breaks as `<br/>`.
pub fn to_xhtml_text(s: &str) -> String {
    normalize_line_breaks(&escape_html(s)).into_owned()
}
