//! Bot API client: `sendMessage` and `sendDocument`.

use {
    reqwest::multipart,
    secrecy::ExposeSecret,
    serde::{Deserialize, Serialize},
    tracing::{debug, info},
};

use crate::{
    config::TelegramConfig,
    error::{Context, Error, Result},
};

/// Telegram message identifier, returned by `sendMessage` and used for
/// reply chaining.
pub type MessageId = i64;

/// Thin client over the Bot API. One instance per destination chat.
pub struct TelegramApi {
    http: reqwest::Client,
    config: TelegramConfig,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_parameters: Option<ReplyParameters>,
}

#[derive(Serialize)]
struct ReplyParameters {
    message_id: MessageId,
    allow_sending_without_reply: bool,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: MessageId,
}

impl TelegramApi {
    #[must_use]
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.api_base,
            self.config.token.expose_secret()
        )
    }

    /// Send one MarkdownV2 text segment, optionally as a reply to an
    /// earlier message. Returns the delivered message's identifier.
    pub async fn send_segment(&self, text: &str, reply_to: Option<MessageId>) -> Result<MessageId> {
        let request = SendMessageRequest {
            chat_id: &self.config.chat_id,
            text,
            parse_mode: "MarkdownV2",
            reply_parameters: reply_to.map(|message_id| ReplyParameters {
                message_id,
                allow_sending_without_reply: true,
            }),
        };

        let response = self
            .http
            .post(self.endpoint("sendMessage"))
            .json(&request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body: ApiResponse<SentMessage> = response.json().await?;
        let sent = check(status, body)?;

        info!(
            chat_id = %self.config.chat_id,
            message_id = sent.message_id,
            reply_to = ?reply_to,
            text_len = text.len(),
            "telegram segment sent"
        );
        Ok(sent.message_id)
    }

    /// Upload one attachment to the `sendDocument` endpoint as a reply.
    pub async fn send_document(
        &self,
        filename: &str,
        mime_type: &str,
        content: Vec<u8>,
        reply_to: Option<MessageId>,
    ) -> Result<()> {
        let content_len = content.len();
        let part = multipart::Part::bytes(content)
            .file_name(filename.to_owned())
            .mime_str(mime_type)
            .with_context(|| format!("invalid attachment mime type {mime_type:?}"))?;
        let mut form = multipart::Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .part("document", part);
        if let Some(message_id) = reply_to {
            form = form.text("reply_to_message_id", message_id.to_string());
        }

        debug!(
            chat_id = %self.config.chat_id,
            filename,
            mime_type,
            bytes = content_len,
            "telegram document upload start"
        );

        let response = self
            .http
            .post(self.endpoint("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body: ApiResponse<serde_json::Value> = response.json().await?;
        check(status, body)?;

        info!(
            chat_id = %self.config.chat_id,
            filename,
            bytes = content_len,
            "telegram document sent"
        );
        Ok(())
    }
}

/// Turn a Bot API envelope into its result, surfacing the API's own
/// description on failure.
fn check<T>(status: u16, body: ApiResponse<T>) -> Result<T> {
    if body.ok
        && let Some(result) = body.result
    {
        return Ok(result);
    }
    Err(Error::Api {
        status,
        description: body
            .description
            .unwrap_or_else(|| "no description".to_owned()),
    })
}
