//! Forwarding one raw email to the destination chat.

use tracing::{info, warn};

use {
    mailgram_common::types::InboundMail,
    mailgram_mail::{parse_mail, render_preamble, scan_raw_headers},
    mailgram_render::{
        MAX_SEGMENT_LEN, Piece, Rendered, chunk, escape_markdown, render_plain, transduce_html,
    },
    mailgram_telegram::{MessageId, TelegramApi},
};

use crate::error::Result;

/// What happened while forwarding one email.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ForwardReport {
    pub segments_sent: usize,
    pub first_message_id: Option<MessageId>,
    pub attachments_sent: usize,
    pub attachments_skipped: usize,
    /// True when the email was unparseable and only the fallback
    /// notification went out.
    pub fallback: bool,
}

/// Forward one raw RFC 5322 message.
///
/// Parse failure sends a single fallback notification built from the raw
/// header scan. A failed segment send halts the remaining segments but the
/// attachments still reply to the first delivered segment. A failed
/// attachment is logged and skipped; the rest still go out.
pub async fn forward_mail(api: &TelegramApi, raw: &[u8]) -> Result<ForwardReport> {
    let mail = match parse_mail(raw) {
        Ok(mail) => mail,
        Err(err) => {
            warn!(error = %err, size = raw.len(), "inbound mail unparseable, sending fallback");
            return send_fallback(api, raw, &err.to_string()).await;
        },
    };

    let segments = render_segments(&mail)?;
    info!(
        from = %mail.from.display(),
        subject = ?mail.subject,
        segment_count = segments.len(),
        attachment_count = mail.attachments.len(),
        "forwarding mail"
    );

    let mut report = ForwardReport::default();
    let mut last_id: Option<MessageId> = None;
    for segment in &segments {
        match api.send_segment(segment, last_id).await {
            Ok(id) => {
                report.first_message_id.get_or_insert(id);
                last_id = Some(id);
                report.segments_sent += 1;
            },
            Err(err) => {
                warn!(
                    error = %err,
                    sent = report.segments_sent,
                    total = segments.len(),
                    "segment delivery failed, halting remaining segments"
                );
                break;
            },
        }
    }

    for attachment in &mail.attachments {
        match api
            .send_document(
                &attachment.filename,
                &attachment.mime_type,
                attachment.content.clone(),
                report.first_message_id,
            )
            .await
        {
            Ok(()) => report.attachments_sent += 1,
            Err(err) => {
                warn!(
                    error = %err,
                    filename = %attachment.filename,
                    "attachment delivery failed, skipping"
                );
                report.attachments_skipped += 1;
            },
        }
    }

    Ok(report)
}

/// Render the full segment list for a parsed mail: escaped header preamble
/// followed by the transduced (or plain-escaped) body.
fn render_segments(mail: &InboundMail) -> Result<Vec<String>> {
    let body = match (&mail.html, &mail.text) {
        (Some(html), _) => transduce_html(html),
        (None, Some(text)) => render_plain(text),
        (None, None) => Rendered::default(),
    };

    let mut rendered = Rendered {
        pieces: Vec::with_capacity(body.pieces.len() + 1),
        links: body.links,
    };
    rendered
        .pieces
        .push(Piece::Text(render_preamble(mail)));
    rendered.pieces.extend(body.pieces);

    Ok(chunk(rendered, MAX_SEGMENT_LEN)?)
}

/// Build and send the minimal parse-failure notification. No attachments
/// are ever attempted on this path.
async fn send_fallback(api: &TelegramApi, raw: &[u8], error: &str) -> Result<ForwardReport> {
    let headers = scan_raw_headers(raw);
    let text = fallback_notification(
        headers.from.as_deref(),
        headers.subject.as_deref(),
        error,
    );
    let id = api.send_segment(&text, None).await?;
    Ok(ForwardReport {
        segments_sent: 1,
        first_message_id: Some(id),
        fallback: true,
        ..Default::default()
    })
}

fn fallback_notification(from: Option<&str>, subject: Option<&str>, error: &str) -> String {
    let mut text = String::from("*Received a mail that could not be parsed*\n");
    if let Some(from) = from {
        text.push_str(&format!("*From:* {}\n", escape_markdown(from)));
    }
    if let Some(subject) = subject {
        text.push_str(&format!("*Subject:* {}\n", escape_markdown(subject)));
    }
    text.push_str(&format!("\nError: {}", escape_markdown(error)));
    text
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {
        mailgram_telegram::TelegramConfig,
        mockito::Matcher,
        secrecy::Secret,
    };

    use super::*;

    fn api(base: String) -> TelegramApi {
        TelegramApi::new(TelegramConfig {
            token: Secret::new("123:TEST".into()),
            chat_id: "42".into(),
            api_base: base,
        })
    }

    fn ok_body(message_id: i64) -> String {
        format!(r#"{{"ok":true,"result":{{"message_id":{message_id}}}}}"#)
    }

    const SHORT_EMAIL: &str = "\
From: Alice <alice@example.com>\r\n\
To: Bob <bob@example.com>\r\n\
Subject: Hi\r\n\
Content-Type: text/plain\r\n\
\r\n\
short body\r\n";

    fn email_with_attachments(count: usize) -> String {
        let mut email = String::from(
            "From: a@example.com\r\n\
             To: b@example.com\r\n\
             Subject: Files\r\n\
             Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
             \r\n\
             --b1\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             see attached\r\n",
        );
        for i in 0..count {
            email.push_str(&format!(
                "--b1\r\n\
                 Content-Type: text/plain\r\n\
                 Content-Disposition: attachment; filename=\"file{i}.txt\"\r\n\
                 \r\n\
                 contents {i}\r\n"
            ));
        }
        email.push_str("--b1--\r\n");
        email
    }

    #[tokio::test]
    async fn short_body_is_one_segment() {
        let mut server = mockito::Server::new_async().await;
        let send = server
            .mock("POST", "/bot123:TEST/sendMessage")
            .with_status(200)
            .with_body(ok_body(1))
            .expect(1)
            .create_async()
            .await;

        let report = forward_mail(&api(server.url()), SHORT_EMAIL.as_bytes())
            .await
            .unwrap();
        assert_eq!(report.segments_sent, 1);
        assert_eq!(report.first_message_id, Some(1));
        assert!(!report.fallback);
        send.assert_async().await;
    }

    #[tokio::test]
    async fn long_body_chains_second_segment_to_first() {
        let mut server = mockito::Server::new_async().await;
        // Generic mock: first segment, no reply parameters.
        let first = server
            .mock("POST", "/bot123:TEST/sendMessage")
            .with_status(200)
            .with_body(ok_body(1))
            .expect(1)
            .create_async()
            .await;
        // Created last, so matched first: the reply-chained second segment.
        let second = server
            .mock("POST", "/bot123:TEST/sendMessage")
            .match_body(Matcher::PartialJsonString(
                r#"{"reply_parameters":{"message_id":1}}"#.to_owned(),
            ))
            .with_status(200)
            .with_body(ok_body(2))
            .expect(1)
            .create_async()
            .await;

        let email = format!(
            "From: a@example.com\r\nSubject: Long\r\nContent-Type: text/plain\r\n\r\n{}\r\n",
            "a".repeat(5000)
        );
        let report = forward_mail(&api(server.url()), email.as_bytes())
            .await
            .unwrap();
        assert_eq!(report.segments_sent, 2);
        assert_eq!(report.first_message_id, Some(1));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn attachments_reply_to_first_segment() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:TEST/sendMessage")
            .with_status(200)
            .with_body(ok_body(5))
            .expect(1)
            .create_async()
            .await;
        let documents = server
            .mock("POST", "/bot123:TEST/sendDocument")
            .match_body(Matcher::Regex("reply_to_message_id".to_owned()))
            .with_status(200)
            .with_body(ok_body(6))
            .expect(3)
            .create_async()
            .await;

        let report = forward_mail(&api(server.url()), email_with_attachments(3).as_bytes())
            .await
            .unwrap();
        assert_eq!(report.segments_sent, 1);
        assert_eq!(report.attachments_sent, 3);
        assert_eq!(report.attachments_skipped, 0);
        documents.assert_async().await;
    }

    #[tokio::test]
    async fn failed_attachment_is_skipped_not_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:TEST/sendMessage")
            .with_status(200)
            .with_body(ok_body(1))
            .create_async()
            .await;
        server
            .mock("POST", "/bot123:TEST/sendDocument")
            .with_status(413)
            .with_body(r#"{"ok":false,"description":"Request Entity Too Large"}"#)
            .expect(2)
            .create_async()
            .await;

        let report = forward_mail(&api(server.url()), email_with_attachments(2).as_bytes())
            .await
            .unwrap();
        assert_eq!(report.attachments_sent, 0);
        assert_eq!(report.attachments_skipped, 2);
    }

    #[tokio::test]
    async fn failed_segment_halts_chain_but_attachments_proceed() {
        let mut server = mockito::Server::new_async().await;
        // First segment succeeds.
        server
            .mock("POST", "/bot123:TEST/sendMessage")
            .with_status(200)
            .with_body(ok_body(1))
            .create_async()
            .await;
        // The reply-chained follow-up fails.
        server
            .mock("POST", "/bot123:TEST/sendMessage")
            .match_body(Matcher::PartialJsonString(
                r#"{"reply_parameters":{"message_id":1}}"#.to_owned(),
            ))
            .with_status(500)
            .with_body(r#"{"ok":false,"description":"Internal Server Error"}"#)
            .create_async()
            .await;
        let documents = server
            .mock("POST", "/bot123:TEST/sendDocument")
            .with_status(200)
            .with_body(ok_body(9))
            .expect(1)
            .create_async()
            .await;

        let mut email = email_with_attachments(1);
        email = email.replace("see attached", &"a".repeat(5000));
        let report = forward_mail(&api(server.url()), email.as_bytes())
            .await
            .unwrap();
        assert_eq!(report.segments_sent, 1);
        assert_eq!(report.first_message_id, Some(1));
        assert_eq!(report.attachments_sent, 1);
        documents.assert_async().await;
    }

    #[tokio::test]
    async fn fallback_sends_one_notification_and_no_attachments() {
        let mut server = mockito::Server::new_async().await;
        let send = server
            .mock("POST", "/bot123:TEST/sendMessage")
            .with_status(200)
            .with_body(ok_body(3))
            .expect(1)
            .create_async()
            .await;
        let documents = server
            .mock("POST", "/bot123:TEST/sendDocument")
            .expect(0)
            .create_async()
            .await;

        let raw = b"From: broken@example.com\r\nSubject: Bad\r\n\r\nbody";
        let report = send_fallback(&api(server.url()), raw, "boom").await.unwrap();
        assert!(report.fallback);
        assert_eq!(report.segments_sent, 1);
        assert_eq!(report.attachments_sent, 0);
        send.assert_async().await;
        documents.assert_async().await;
    }

    #[test]
    fn fallback_notification_escapes_header_values() {
        let text = fallback_notification(Some("Eve <eve@evil.example>"), Some("50% off!"), "bad mime");
        assert!(text.contains("*From:* Eve <eve@evil\\.example\\>"));
        assert!(text.contains("*Subject:* 50% off\\!"));
        assert!(text.contains("Error: bad mime"));
    }

    #[test]
    fn segments_include_preamble_and_stay_bounded() {
        let mail = InboundMail {
            subject: Some("Report".into()),
            html: Some("<p>Hello <a href=\"https://example.com\">there</a></p>".into()),
            ..Default::default()
        };
        let segments = render_segments(&mail).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].contains("*Subject:* Report"));
        assert!(segments[0].contains("[there](https://example.com)"));
        assert!(segments.iter().all(|s| s.len() <= MAX_SEGMENT_LEN));
    }

    #[test]
    fn mail_without_body_still_renders_preamble() {
        let mail = InboundMail {
            subject: Some("Empty".into()),
            ..Default::default()
        };
        let segments = render_segments(&mail).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].contains("*Subject:* Empty"));
    }
}
