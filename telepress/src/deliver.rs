use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

/// Proof of a successful post to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: i64,
    /// False when the image post was rejected and the text-only fallback
    /// carried the message instead.
    pub photo_attached: bool,
}

/// Errors from the messaging channel. Per-article: the article stays
/// unrecorded and is retried on the next run.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("channel request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("channel request timed out")]
    Timeout,

    #[error("channel API error {code}: {description}")]
    Api { code: i64, description: String },
}

/// Publishes one formatted message to the channel.
#[async_trait]
pub trait Deliver: Send + Sync {
    /// Posts `text`, attaching the image when one is given and the channel
    /// accepts it.
    async fn deliver(
        &self,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API channel with image-then-text degradation.
pub struct TelegramChannel {
    base_url: String,
    token: String,
    chat_id: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_base_url(TELEGRAM_API_BASE, token, chat_id)
    }

    /// Base URL override, mainly for tests.
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            chat_id: chat_id.into(),
            timeout: Duration::from_secs(15),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url.trim_end_matches('/'),
            self.token,
            method
        )
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> Result<i64, DeliveryError> {
        let response = tokio::time::timeout(
            self.timeout,
            self.client.post(self.method_url(method)).json(&payload).send(),
        )
        .await
        .map_err(|_| DeliveryError::Timeout)??;

        // The Bot API reports failures in the body; the HTTP status alone
        // does not distinguish a rejected photo from a dead endpoint.
        let envelope: BotEnvelope = response.json().await?;
        if envelope.ok {
            Ok(envelope.result.map(|r| r.message_id).unwrap_or_default())
        } else {
            Err(DeliveryError::Api {
                code: envelope.error_code.unwrap_or_default(),
                description: envelope.description.unwrap_or_default(),
            })
        }
    }

    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<i64, DeliveryError> {
        self.call(
            "sendPhoto",
            json!({
                "chat_id": self.chat_id,
                "photo": photo_url,
                "caption": caption,
                "parse_mode": "Markdown",
            }),
        )
        .await
    }

    async fn send_message(&self, text: &str) -> Result<i64, DeliveryError> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }),
        )
        .await
    }
}

#[async_trait]
impl Deliver for TelegramChannel {
    async fn deliver(
        &self,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        if let Some(photo_url) = image_url {
            match self.send_photo(photo_url, text).await {
                Ok(message_id) => {
                    return Ok(DeliveryReceipt {
                        message_id,
                        photo_attached: true,
                    })
                }
                Err(e) => {
                    warn!(
                        "Failed to send photo {}: {}. Sending text-only message.",
                        photo_url, e
                    );
                }
            }
        }

        let message_id = self.send_message(text).await?;
        Ok(DeliveryReceipt {
            message_id,
            photo_attached: false,
        })
    }
}

// Bot API response envelope

#[derive(Debug, Deserialize)]
struct BotEnvelope {
    ok: bool,
    #[serde(default)]
    result: Option<BotMessage>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotMessage {
    message_id: i64,
}
