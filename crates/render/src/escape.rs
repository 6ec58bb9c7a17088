//! MarkdownV2 escaping.
//!
//! Telegram's MarkdownV2 dialect reserves a fixed set of punctuation that
//! must be backslash-prefixed in message text. Escaping runs on
//! entity-decoded Unicode only — decoding always happens before escaping.

/// Characters reserved by Telegram MarkdownV2.
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Backslash-escape every reserved MarkdownV2 character in `text`.
///
/// Idempotent: a reserved character already preceded by a backslash is left
/// alone, so re-escaping previously escaped text never double-escapes.
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut prev = '\0';
    for ch in text.chars() {
        if RESERVED.contains(&ch) && prev != '\\' {
            out.push('\\');
        }
        out.push(ch);
        prev = ch;
    }
    out
}
