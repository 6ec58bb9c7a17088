//! Telegram delivery adapter for mailgram.
//!
//! Talks to the Bot API over plain HTTPS: `sendMessage` for MarkdownV2 text
//! segments (reply-chained) and `sendDocument` multipart uploads for
//! attachments. No automatic retries — failures surface to the caller with
//! the API's own description.

pub mod api;
pub mod config;
pub mod error;

pub use {
    api::{MessageId, TelegramApi},
    config::TelegramConfig,
    error::{Error, Result},
};
