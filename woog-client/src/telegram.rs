//! Telegram Bot API endpoints

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{handle_response, join_url};

/// Public Telegram Bot API endpoint
pub const DEFAULT_TELEGRAM_URL: &str = "https://api.telegram.org";

/// HTTP client for a single Telegram bot
#[derive(Clone)]
pub struct TelegramClient {
    base_url: String,
    token: String,
    client: Client,
}

/// Body of `sendMessage`
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Envelope every Bot API response is wrapped in
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
}

/// Message accepted by Telegram
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

impl TelegramClient {
    /// Create a client for the bot identified by `token`
    ///
    /// `base_url` is normally [`DEFAULT_TELEGRAM_URL`].
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        join_url(&self.base_url, &format!("bot{}/{}", self.token, method))
    }

    /// Sends a Markdown formatted message to a chat
    ///
    /// # Arguments
    /// * `chat_id` - Numeric chat id or `@channel` name
    /// * `text` - Message body using Telegram's legacy Markdown
    pub async fn send_markdown(&self, chat_id: &str, text: &str) -> Result<SentMessage> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        debug!("Sending Telegram message to chat {}", chat_id);

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;

        let envelope: ApiResponse<SentMessage> = match handle_response(response).await {
            Ok(envelope) => envelope,
            Err(ClientError::ApiError { status, message }) => {
                // Error bodies are envelopes too, prefer their description
                let message = serde_json::from_str::<ApiResponse<SentMessage>>(&message)
                    .ok()
                    .and_then(|e| e.description)
                    .unwrap_or(message);
                return Err(ClientError::api_error(status, message));
            }
            Err(e) => return Err(e),
        };

        if !envelope.ok {
            return Err(ClientError::api_error(
                envelope.error_code.unwrap_or(200),
                envelope
                    .description
                    .unwrap_or_else(|| "Telegram rejected the message".to_string()),
            ));
        }

        envelope
            .result
            .ok_or_else(|| ClientError::ParseError("response has no result".to_string()))
    }
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}
