//! Length-bounded chunking with link reinsertion.
//!
//! Consumes the piece stream in order, draining the link queue in lockstep:
//! text accumulates into a builder that is sliced at the size limit, and
//! each link reference is rendered to inline MarkdownV2 markup and appended
//! atomically — flushed to a fresh segment first when it would not fit.

use crate::{
    error::{Error, Result},
    stream::{LinkRef, Piece, Rendered},
};

/// Hard per-segment ceiling. Telegram caps message text at 4096 characters;
/// 3500 leaves headroom for escaping expansion.
pub const MAX_SEGMENT_LEN: usize = 3500;

/// Split a rendered body into segments of at most `max_len` bytes.
///
/// The queue must correspond to the stream's link references exactly: a
/// reference with no descriptor, out-of-order pops, or leftover descriptors
/// after the run all fail loudly rather than emitting garbled markup.
pub fn chunk(rendered: Rendered, max_len: usize) -> Result<Vec<String>> {
    let Rendered { pieces, mut links } = rendered;
    let mut segments: Vec<String> = Vec::new();
    let mut builder = String::new();

    for piece in pieces {
        match piece {
            Piece::Text(text) => {
                builder.push_str(&text);
                drain_overflow(&mut builder, &mut segments, max_len);
            },
            Piece::Link(reference) => {
                let (position, link) = links
                    .pop()
                    .ok_or(Error::LinkQueueEmpty { reference })?;
                if position != reference {
                    return Err(Error::LinkQueueOrder {
                        reference,
                        position,
                    });
                }
                let markup = render_link(&link);
                // Never split link markup across segments: flush first.
                if !builder.is_empty() && builder.len() + markup.len() > max_len {
                    segments.push(std::mem::take(&mut builder));
                }
                builder.push_str(&markup);
                // A single rendered link larger than max_len cannot be kept
                // atomic; the size bound wins and it is sliced like text.
                drain_overflow(&mut builder, &mut segments, max_len);
            },
        }
    }

    if !builder.is_empty() {
        segments.push(builder);
    }
    if !links.is_empty() {
        return Err(Error::LinkQueueLeftover {
            remaining: links.len(),
        });
    }

    segments.retain(|s| !s.trim().is_empty());
    Ok(segments)
}

/// Cut `max_len`-sized prefixes off the builder until the remainder fits.
fn drain_overflow(builder: &mut String, segments: &mut Vec<String>, max_len: usize) {
    while builder.len() > max_len {
        let cut = floor_char_boundary(builder, max_len);
        if cut == 0 {
            break;
        }
        let rest = builder.split_off(cut);
        segments.push(std::mem::replace(builder, rest));
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Inline MarkdownV2 link markup, wrapped in spacing so it never fuses with
/// surrounding text.
fn render_link(link: &LinkRef) -> String {
    format!(
        " [{}]({}) ",
        link.description,
        escape_link_target(&link.target)
    )
}

/// MarkdownV2 requires `(`, `)` and `\` to be escaped inside a link target.
fn escape_link_target(target: &str) -> String {
    let mut out = String::with_capacity(target.len());
    for ch in target.chars() {
        if matches!(ch, '(' | ')' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
