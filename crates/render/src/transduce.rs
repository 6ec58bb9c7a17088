//! Streaming HTML-to-markup transduction.
//!
//! Walks an HTML document once with a forward-only tokenizer — no DOM is
//! built — and feeds a visitor that flattens the document into escaped text
//! pieces. Hyperlinks and media references are emitted out of band: the
//! visitor pushes a [`LinkRef`] onto the queue and leaves an indexed
//! [`Piece::Link`] in the stream where the chunker will reinsert the
//! rendered markup.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    escape::escape_markdown,
    stream::{LinkQueue, LinkRef, Piece, Rendered},
};

/// Description used for anchors whose inner text is empty.
const LINK_FALLBACK: &str = "link->";

/// Tags whose text runs stay on the current logical line.
const INLINE_TAGS: &[&str] = &[
    "a", "b", "del", "em", "i", "ins", "span", "strong", "sub", "sup",
];

/// Tags that become link references when they carry a `src`.
const MEDIA_TAGS: &[&str] = &["audio", "iframe", "img", "video"];

/// Raw-text elements whose entire content is discarded.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "title"];

/// Container elements whose whole subtree is discarded.
const SKIP_SUBTREE_TAGS: &[&str] = &["head", "noscript"];

/// Void head-only elements dropped outright.
const DROP_TAGS: &[&str] = &["base", "link", "meta"];

/// HTML void elements — they never produce a close token.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Transduce one HTML document into a piece stream plus link queue.
///
/// All transduction state is owned by this call; nothing is shared across
/// invocations, so concurrent bodies can never interleave queue entries.
#[must_use]
pub fn transduce_html(html: &str) -> Rendered {
    let mut visitor = Transducer::default();
    let mut tokenizer = Tokenizer::new(html);
    while let Some(token) = tokenizer.next_token() {
        match token {
            Token::Open(tag) => {
                if RAW_TEXT_TAGS.contains(&tag.name.as_str()) && !tag.self_closing {
                    tokenizer.skip_raw_text(&tag.name);
                    continue;
                }
                visitor.open(&tag);
            },
            Token::Close(name) => visitor.close(&name),
            Token::Text(text) => visitor.text(text),
        }
    }
    visitor.finish()
}

/// Render a plain-text body: escaped as-is, no transduction, no links.
#[must_use]
pub fn render_plain(text: &str) -> Rendered {
    let escaped = escape_markdown(text);
    let pieces = if escaped.is_empty() {
        Vec::new()
    } else {
        vec![Piece::Text(escaped)]
    };
    Rendered {
        pieces,
        links: LinkQueue::new(),
    }
}

// ── Visitor ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct Transducer {
    pieces: Vec<Piece>,
    links: LinkQueue,
    buf: String,
    /// Open non-void elements, innermost last.
    stack: Vec<String>,
    /// Set while inside a discarded subtree: root tag plus nesting depth.
    skip: Option<(String, usize)>,
    in_anchor: bool,
    anchor_href: Option<String>,
    anchor_text: String,
}

impl Transducer {
    fn open(&mut self, tag: &Tag) {
        let name = tag.name.as_str();
        if let Some((root, depth)) = &mut self.skip {
            if name == root.as_str() && !is_void(name) && !tag.self_closing {
                *depth += 1;
            }
            return;
        }

        if SKIP_SUBTREE_TAGS.contains(&name) {
            if !tag.self_closing {
                self.skip = Some((name.to_owned(), 0));
            }
            return;
        }
        if DROP_TAGS.contains(&name) {
            return;
        }

        match name {
            "br" => self.current_buf().push('\n'),
            "a" if !self.in_anchor => {
                self.in_anchor = true;
                self.anchor_href = tag.attr("href").filter(|v| !v.is_empty());
                self.anchor_text.clear();
                self.stack.push(tag.name.clone());
            },
            _ if MEDIA_TAGS.contains(&name) => {
                // An enclosing anchor already owns the link semantics, so
                // nested media emits no separate reference.
                if !self.in_anchor
                    && let Some(src) = tag.attr("src").filter(|v| !v.is_empty())
                {
                    self.emit_link(LinkRef::new(name, src));
                }
                if !is_void(name) && !tag.self_closing {
                    self.stack.push(tag.name.clone());
                }
            },
            // Everything else is unwrapped: tag removed, content kept.
            _ => {
                if !is_void(name) && !tag.self_closing {
                    self.stack.push(tag.name.clone());
                }
            },
        }
    }

    fn close(&mut self, name: &str) {
        if let Some((root, depth)) = &mut self.skip {
            if root.as_str() == name {
                if *depth == 0 {
                    self.skip = None;
                } else {
                    *depth -= 1;
                }
            }
            return;
        }

        if let Some(found) = self.stack.iter().rposition(|open| open == name) {
            self.stack.truncate(found);
        } else {
            // Stray close tag with no matching open.
            return;
        }

        if name == "a" && self.in_anchor {
            self.finish_anchor();
            return;
        }
        if self.in_anchor {
            return;
        }

        if name == "td" {
            self.buf.push(' ');
            return;
        }
        if INLINE_TAGS.contains(&name) || MEDIA_TAGS.contains(&name) {
            return;
        }

        // Block-level separation.
        if self.buf.is_empty() {
            if matches!(self.pieces.last(), Some(Piece::Link(_))) {
                self.buf.push('\n');
            }
        } else if !self.buf.ends_with('\n') {
            self.buf.push('\n');
        }
    }

    fn text(&mut self, run: &str) {
        if self.skip.is_some() {
            return;
        }
        // Decode entities first, escape second — the escaper must never see
        // raw `&amp;`-style sequences.
        let escaped = escape_markdown(&decode_entities(run));
        if self.in_anchor {
            append_normalized(&mut self.anchor_text, &escaped);
        } else {
            append_normalized(&mut self.buf, &escaped);
        }
    }

    fn finish_anchor(&mut self) {
        self.in_anchor = false;
        let href = self.anchor_href.take();
        let text = std::mem::take(&mut self.anchor_text);
        match href {
            Some(target) => {
                let trimmed = text.trim();
                let description = if trimmed.is_empty() {
                    escape_markdown(LINK_FALLBACK)
                } else {
                    trimmed.to_owned()
                };
                self.emit_link(LinkRef::new(description, target));
            },
            // No target: the anchor's text is ordinary content.
            None => append_normalized(&mut self.buf, &text),
        }
    }

    fn emit_link(&mut self, link: LinkRef) {
        self.flush_text();
        let index = self.links.push(link);
        self.pieces.push(Piece::Link(index));
    }

    fn flush_text(&mut self) {
        if !self.buf.is_empty() {
            self.pieces.push(Piece::Text(std::mem::take(&mut self.buf)));
        }
    }

    fn current_buf(&mut self) -> &mut String {
        if self.in_anchor {
            &mut self.anchor_text
        } else {
            &mut self.buf
        }
    }

    fn finish(mut self) -> Rendered {
        if self.in_anchor {
            self.finish_anchor();
        }
        if !self.buf.is_empty() && !self.buf.ends_with('\n') {
            self.buf.push('\n');
        }
        self.flush_text();

        let mut pieces: Vec<Piece> = Vec::with_capacity(self.pieces.len());
        let mut first_text = true;
        for piece in self.pieces {
            match piece {
                Piece::Text(text) => {
                    let mut cleaned = cleanup(&text);
                    if first_text {
                        cleaned = cleaned.trim_start().to_owned();
                    }
                    if !cleaned.is_empty() {
                        pieces.push(Piece::Text(cleaned));
                    }
                },
                link => pieces.push(link),
            }
            first_text = false;
        }

        Rendered {
            pieces,
            links: self.links,
        }
    }
}

fn is_void(name: &str) -> bool {
    VOID_TAGS.contains(&name)
}

/// Append `text` collapsing whitespace runs to single spaces, dropping
/// leading whitespace when the buffer already ends on whitespace.
fn append_normalized(dst: &mut String, text: &str) {
    for ch in text.chars() {
        if ch == '\n' {
            // Explicit newlines (from `<br>`) survive normalization.
            if !dst.ends_with('\n') {
                dst.push('\n');
            }
        } else if ch.is_whitespace() {
            if !dst.is_empty() && !dst.ends_with(char::is_whitespace) {
                dst.push(' ');
            }
        } else {
            dst.push(ch);
        }
    }
}

// ── Document-level cleanup ───────────────────────────────────────────────

#[allow(clippy::unwrap_used)]
static INVISIBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{00AD}\u{200B}\u{200C}\u{200D}\u{2060}\u{FEFF}]").unwrap());

#[allow(clippy::unwrap_used)]
static NEWLINE_PADDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[ \t]*\n[ \t]*").unwrap());

#[allow(clippy::unwrap_used)]
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new("\n{2,}").unwrap());

/// Strip invisible Unicode, trim spaces around newlines, and collapse
/// blank-line runs to a single newline.
fn cleanup(text: &str) -> String {
    let text = INVISIBLE.replace_all(text, "");
    let text = NEWLINE_PADDING.replace_all(&text, "\n");
    BLANK_RUNS.replace_all(&text, "\n").into_owned()
}

// ── Entity decoding ──────────────────────────────────────────────────────

/// Decode the HTML entities that show up in real mail bodies. Unknown
/// sequences are kept verbatim.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';').filter(|&at| at <= 32) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        match decode_entity(entity) {
            Some(decoded) => {
                out.push_str(&decoded);
                rest = &rest[semi + 1..];
            },
            None => {
                out.push('&');
                rest = &rest[1..];
            },
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<String> {
    let named = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "copy" => "\u{A9}",
        "reg" => "\u{AE}",
        "hellip" => "\u{2026}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        _ => "",
    };
    if !named.is_empty() {
        return Some(named.to_owned());
    }
    let digits = entity.strip_prefix('#')?;
    let code = if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<u32>().ok()?
    };
    char::from_u32(code).map(String::from)
}

// ── Tokenizer ────────────────────────────────────────────────────────────

struct Tag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
}

impl Tag {
    fn attr(&self, name: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

enum Token<'a> {
    Open(Tag),
    Close(String),
    Text(&'a str),
}

/// Forward-only scanner over raw HTML. Comments, DOCTYPE and processing
/// instructions are consumed silently; everything else becomes an open,
/// close, or text token.
struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return None;
            }
            if let Some(after) = rest.strip_prefix('<') {
                let next = after.chars().next();
                match next {
                    Some('!') => {
                        // Comment or markup declaration (DOCTYPE).
                        if after.starts_with("!--") {
                            match rest.find("-->") {
                                Some(end) => self.pos += end + 3,
                                None => self.pos = self.input.len(),
                            }
                        } else {
                            self.advance_past_gt();
                        }
                        continue;
                    },
                    Some('?') => {
                        self.advance_past_gt();
                        continue;
                    },
                    Some('/') => {
                        self.pos += 2;
                        let name = self.read_name();
                        self.advance_past_gt();
                        if name.is_empty() {
                            continue;
                        }
                        return Some(Token::Close(name));
                    },
                    Some(c) if c.is_ascii_alphabetic() => {
                        self.pos += 1;
                        return Some(Token::Open(self.parse_open_tag()));
                    },
                    // Stray `<` is ordinary text.
                    _ => {},
                }
            }
            return Some(self.read_text());
        }
    }

    /// Consume the raw content of `<script>`/`<style>`/`<title>` up to and
    /// including the matching close tag.
    fn skip_raw_text(&mut self, name: &str) {
        let needle = format!("</{name}");
        let haystack = self.rest().to_ascii_lowercase();
        match haystack.find(&needle) {
            Some(at) => {
                self.pos += at;
                self.advance_past_gt();
            },
            None => self.pos = self.input.len(),
        }
    }

    fn read_text(&mut self) -> Token<'a> {
        let rest = self.rest();
        let search_from = usize::from(rest.starts_with('<'));
        let end = find_tag_start(&rest[search_from..])
            .map(|i| i + search_from)
            .unwrap_or(rest.len());
        self.pos += end;
        Token::Text(&rest[..end])
    }

    fn parse_open_tag(&mut self) -> Tag {
        let name = self.read_name();
        let mut attrs = Vec::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let attr_name = self.read_attr_name();
            if attr_name.is_empty() {
                // Unparseable byte; skip it rather than loop forever.
                self.advance_char();
                continue;
            }
            self.skip_whitespace();
            let mut value = String::new();
            if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                value = self.read_attr_value();
            }
            attrs.push((attr_name, value));
        }
        Tag {
            name,
            attrs,
            self_closing,
        }
    }

    fn read_attr_value(&mut self) -> String {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let rest = self.rest();
                let end = rest.find(quote).unwrap_or(rest.len());
                let value = decode_entities(&rest[..end]);
                self.pos += (end + 1).min(rest.len());
                value
            },
            _ => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                let value = decode_entities(&rest[..end]);
                self.pos += end;
                value
            },
        }
    }

    fn read_name(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_ascii_lowercase()
    }

    fn read_attr_name(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/'))
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_ascii_lowercase()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(rest.len());
        self.pos += end;
    }

    fn advance_past_gt(&mut self) {
        let rest = self.rest();
        match rest.find('>') {
            Some(at) => self.pos += at + 1,
            None => self.pos = self.input.len(),
        }
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.rest().chars().next() {
            self.pos += c.len_utf8();
        }
    }
}

/// Byte offset of the next `<` that actually starts markup.
fn find_tag_start(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut at = 0;
    while let Some(found) = s[at..].find('<') {
        let idx = at + found;
        match bytes.get(idx + 1) {
            Some(b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?') => {
                return Some(idx);
            },
            _ => at = idx + 1,
        }
    }
    None
}
