//! Email-body rendering for mailgram.
//!
//! Converts an HTML (or plain text) email body into Telegram-ready
//! MarkdownV2 segments: a single-pass streaming transducer flattens the
//! document into a stream of text pieces and out-of-band link references,
//! and the chunker splits that stream into size-bounded messages while
//! reinserting each link's markup atomically.

pub mod chunk;
pub mod error;
pub mod escape;
pub mod stream;
pub mod transduce;

pub use {
    chunk::{MAX_SEGMENT_LEN, chunk},
    error::{Error, Result},
    escape::escape_markdown,
    stream::{LinkQueue, LinkRef, Piece, Rendered},
    transduce::{render_plain, transduce_html},
};
