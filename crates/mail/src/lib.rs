//! Inbound email parsing for mailgram.
//!
//! Turns raw RFC 5322 bytes into the shared [`InboundMail`] model via
//! `mail-parser`, renders the escaped header preamble shown above every
//! forwarded body, and provides the raw-header fallback used when a
//! message cannot be parsed at all.

pub mod error;
pub mod parse;
pub mod preamble;

pub use {
    error::{Error, Result},
    parse::{RawHeaders, parse_mail, scan_raw_headers},
    preamble::render_preamble,
};
