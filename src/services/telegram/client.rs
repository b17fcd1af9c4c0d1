//! Telegram Bot API notifier

use crate::error::NotifyError;
use crate::models::position::MessageHandle;
use crate::services::notifier::Notifier;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

const PARSE_MODE: &str = "MarkdownV2";

const NOT_MODIFIED: &str = "message is not modified";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Serialize)]
struct EditMessageTextRequest<'a> {
    chat_id: &'a str,
    message_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

pub struct TelegramNotifier {
    api_url: String,
    token: String,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(api_url, token, client))
    }

    pub fn with_client(api_url: impl Into<String>, token: impl Into<String>, client: Client) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<Option<T>, NotifyError>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        let parsed: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                NotifyError::Malformed(e.to_string())
            } else {
                NotifyError::Api {
                    description: format!("HTTP {}: {}", status.as_u16(), text),
                }
            }
        })?;

        if !parsed.ok {
            return Err(NotifyError::Api {
                description: parsed
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            });
        }
        Ok(parsed.result)
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: &str, text: &str) -> Result<MessageHandle, NotifyError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: PARSE_MODE,
        };
        let sent: SentMessage = self
            .call("sendMessage", &request)
            .await?
            .ok_or_else(|| NotifyError::Malformed("sendMessage returned no result".to_string()))?;
        debug!(chat_id = %chat_id, message_id = sent.message_id, "Telegram: message sent");
        Ok(MessageHandle(sent.message_id))
    }

    async fn edit(
        &self,
        chat_id: &str,
        handle: MessageHandle,
        text: &str,
    ) -> Result<(), NotifyError> {
        let request = EditMessageTextRequest {
            chat_id,
            message_id: handle.0,
            text,
            parse_mode: PARSE_MODE,
        };
        // editMessageText returns the edited message (or `true` for inline messages)
        match self
            .call::<_, serde_json::Value>("editMessageText", &request)
            .await
        {
            Ok(_) => {
                debug!(chat_id = %chat_id, message_id = handle.0, "Telegram: message edited");
                Ok(())
            }
            // An earlier attempt already applied this text
            Err(NotifyError::Api { description }) if description.contains(NOT_MODIFIED) => {
                debug!(chat_id = %chat_id, message_id = handle.0, "Telegram: message already up to date");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
