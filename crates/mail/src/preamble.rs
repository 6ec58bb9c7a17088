//! The escaped header block shown above every forwarded body.

use mailgram_common::types::InboundMail;
use mailgram_render::escape_markdown;

/// Render the `From`/`Subject`/`Date` preamble as MarkdownV2.
///
/// Field labels are bold; values are escaped so arbitrary header content
/// can never break the message markup. Absent headers are omitted.
#[must_use]
pub fn render_preamble(mail: &InboundMail) -> String {
    let mut out = String::new();
    out.push_str(&format!("*From:* {}\n", escape_markdown(&mail.from.display())));
    if let Some(subject) = &mail.subject {
        out.push_str(&format!("*Subject:* {}\n", escape_markdown(subject)));
    }
    if let Some(date) = &mail.date {
        out.push_str(&format!("*Date:* {}\n", escape_markdown(date)));
    }
    out.push('\n');
    out
}
