//! The mailgram pipeline: parse one inbound email, render its body into
//! bounded MarkdownV2 segments, and deliver them as a reply chain followed
//! by the attachments.
//!
//! Each call processes exactly one email with its own transduction state;
//! nothing is shared across invocations. Delivery calls are sequential so
//! the reply chain stays ordered.

pub mod error;
pub mod forward;

pub use {
    error::{Error, Result},
    forward::{ForwardReport, forward_mail},
};
