//! MIME parsing via `mail-parser`, plus the raw-header fallback scan.

use mail_parser::{MessageParser, MimeHeaders};

use mailgram_common::types::{Attachment, InboundMail, MailAddress};

use crate::error::{Error, Result};

/// Parse raw RFC 5322 bytes into an [`InboundMail`].
///
/// Handles multipart/alternative (both bodies kept when present),
/// multipart/mixed, and nested MIME structures.
pub fn parse_mail(raw: &[u8]) -> Result<InboundMail> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or(Error::Parse { size: raw.len() })?;

    let from = message
        .from()
        .and_then(|addr| addr.first())
        .map(|mailbox| MailAddress {
            name: mailbox.name().map(str::to_owned),
            address: mailbox.address().unwrap_or("unknown@unknown").to_owned(),
        })
        .unwrap_or_default();

    let to = message
        .to()
        .map(|addr| {
            addr.iter()
                .filter_map(|mailbox| {
                    mailbox.address().map(|address| MailAddress {
                        name: mailbox.name().map(str::to_owned),
                        address: address.to_owned(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let subject = message.subject().map(str::to_owned);
    let date = message.date().map(|dt| dt.to_rfc3339());

    let html = message.body_html(0).map(|body| body.into_owned());
    let text = message.body_text(0).map(|body| body.into_owned());

    let attachments = message
        .attachments()
        .map(|part| {
            let filename = part
                .attachment_name()
                .unwrap_or("attachment.bin")
                .to_owned();
            let mime_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(subtype) => format!("{}/{subtype}", ct.ctype()),
                    None => ct.ctype().to_owned(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_owned());
            Attachment {
                filename,
                mime_type,
                content: part.contents().to_vec(),
            }
        })
        .collect();

    Ok(InboundMail {
        from,
        to,
        subject,
        date,
        html,
        text,
        attachments,
    })
}

/// Header fields recoverable from an unparseable message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawHeaders {
    pub from: Option<String>,
    pub subject: Option<String>,
}

/// Best-effort line scan of the raw header block for `From` and `Subject`.
///
/// Used to build the parse-failure notification; cannot itself fail.
#[must_use]
pub fn scan_raw_headers(raw: &[u8]) -> RawHeaders {
    let text = String::from_utf8_lossy(raw);
    let mut headers = RawHeaders::default();
    for line in text.lines() {
        if line.is_empty() {
            // End of the header block.
            break;
        }
        if let Some(value) = strip_header(line, "from:") {
            headers.from.get_or_insert_with(|| value.to_owned());
        } else if let Some(value) = strip_header(line, "subject:") {
            headers.subject.get_or_insert_with(|| value.to_owned());
        }
    }
    headers
}

fn strip_header<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (head, rest) = line.split_at_checked(name.len())?;
    head.eq_ignore_ascii_case(name).then(|| rest.trim())
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_EMAIL: &str = "\
From: Alice <alice@example.com>\r\n\
To: Bob <bob@example.com>\r\n\
Subject: Hello Bob\r\n\
Message-ID: <msg-001@example.com>\r\n\
Date: Sat, 20 Nov 2021 14:22:01 -0800\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hi Bob, this is a test email.\r\n";

    #[test]
    fn parse_simple_text_email() {
        let mail = parse_mail(SIMPLE_EMAIL.as_bytes()).unwrap();
        assert_eq!(mail.from.address, "alice@example.com");
        assert_eq!(mail.from.name.as_deref(), Some("Alice"));
        assert_eq!(mail.to.len(), 1);
        assert_eq!(mail.to[0].address, "bob@example.com");
        assert_eq!(mail.subject.as_deref(), Some("Hello Bob"));
        assert!(mail.date.is_some());
        assert!(mail.html.is_none());
        assert!(mail.text.unwrap().contains("test email"));
        assert!(mail.attachments.is_empty());
    }

    #[test]
    fn parse_multipart_alternative_keeps_both_bodies() {
        let email = "\
From: sender@example.com\r\n\
To: recipient@example.com\r\n\
Subject: Multipart test\r\n\
Content-Type: multipart/alternative; boundary=\"boundary42\"\r\n\
\r\n\
--boundary42\r\n\
Content-Type: text/plain\r\n\
\r\n\
Plain text body\r\n\
--boundary42\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>HTML body</p>\r\n\
--boundary42--\r\n";

        let mail = parse_mail(email.as_bytes()).unwrap();
        assert!(mail.text.unwrap().contains("Plain text body"));
        assert!(mail.html.unwrap().contains("HTML body"));
    }

    #[test]
    fn parse_attachment() {
        let email = "\
From: sender@example.com\r\n\
To: recipient@example.com\r\n\
Subject: With attachment\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\
\r\n\
See attached.\r\n\
--b1\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"report.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQK\r\n\
--b1--\r\n";

        let mail = parse_mail(email.as_bytes()).unwrap();
        assert_eq!(mail.attachments.len(), 1);
        let attachment = &mail.attachments[0];
        assert_eq!(attachment.filename, "report.pdf");
        assert_eq!(attachment.mime_type, "application/pdf");
        assert_eq!(attachment.content, b"%PDF-1.4\n");
    }

    #[test]
    fn parse_missing_sender_uses_default() {
        let email = "Subject: Orphan\r\n\r\nbody\r\n";
        let mail = parse_mail(email.as_bytes()).unwrap();
        assert!(mail.from.address.is_empty() || mail.from.address == "unknown@unknown");
        assert_eq!(mail.subject.as_deref(), Some("Orphan"));
    }

    #[test]
    fn scan_raw_headers_finds_from_and_subject() {
        let headers = scan_raw_headers(SIMPLE_EMAIL.as_bytes());
        assert_eq!(headers.from.as_deref(), Some("Alice <alice@example.com>"));
        assert_eq!(headers.subject.as_deref(), Some("Hello Bob"));
    }

    #[test]
    fn scan_raw_headers_is_case_insensitive() {
        let raw = b"FROM: x@y.z\r\nSUBJECT: shouty\r\n\r\nbody";
        let headers = scan_raw_headers(raw);
        assert_eq!(headers.from.as_deref(), Some("x@y.z"));
        assert_eq!(headers.subject.as_deref(), Some("shouty"));
    }

    #[test]
    fn scan_raw_headers_ignores_body_lines() {
        let raw = b"Subject: real\r\n\r\nFrom: fake@body\r\n";
        let headers = scan_raw_headers(raw);
        assert_eq!(headers.subject.as_deref(), Some("real"));
        assert!(headers.from.is_none());
    }

    #[test]
    fn scan_raw_headers_survives_garbage() {
        let headers = scan_raw_headers(&[0xFF, 0xFE, 0x00, b'\n']);
        assert!(headers.from.is_none());
        assert!(headers.subject.is_none());
    }
}
