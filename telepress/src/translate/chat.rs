use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{pair_from_parts, TranslationError, TranslationPair, Translator};

/// Delimiter the model is instructed to place between the two translations.
pub const PAIR_DELIMITER: &str = "|||";

/// Translation backend using an OpenAI-compatible chat completion endpoint.
///
/// The model is prompted to return the two translations joined by
/// [`PAIR_DELIMITER`]. Small models drift on format, so the output shape is
/// validated strictly: anything that does not split into exactly two
/// non-empty parts is rejected, never repaired.
pub struct ChatTranslator {
    api_url: String,
    api_key: String,
    model: String,
    source_lang: String,
    target_lang: String,
    default_timeout: Duration,
    default_max_tokens: usize,
    default_temperature: f32,
    client: reqwest::Client,
}

impl ChatTranslator {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            default_timeout: Duration::from_secs(30),
            default_max_tokens: 400,
            default_temperature: 0.2,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_defaults(mut self, timeout_secs: u64, max_tokens: usize, temperature: f32) -> Self {
        self.default_timeout = Duration::from_secs(timeout_secs);
        self.default_max_tokens = max_tokens;
        self.default_temperature = temperature;
        self
    }

    fn prompt(&self, title: &str, description: &str) -> String {
        format!(
            "Translate the two texts below from {src} to {tgt}.\n\
             Respond with ONLY the two translations, in the same order, \
             separated by the delimiter {delim}.\n\
             Do not add numbering, quotes or commentary.\n\n\
             TEXT 1:\n{title}\n\n\
             TEXT 2:\n{description}",
            src = self.source_lang,
            tgt = self.target_lang,
            delim = PAIR_DELIMITER,
        )
    }
}

#[async_trait::async_trait]
impl Translator for ChatTranslator {
    async fn translate(
        &self,
        title: &str,
        description: &str,
    ) -> Result<TranslationPair, TranslationError> {
        let req_body = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: self.prompt(title, description),
            }],
            max_tokens: Some(self.default_max_tokens),
            temperature: Some(self.default_temperature),
        };

        let response = tokio::time::timeout(
            self.default_timeout,
            self.client
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&req_body)
                .send(),
        )
        .await
        .map_err(|_| TranslationError::Timeout)??;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Api { status, body });
        }

        let resp_body: ChatResponse = response.json().await?;
        let choice = resp_body.choices.into_iter().next().ok_or_else(|| {
            TranslationError::Malformed("chat response has no choices".to_string())
        })?;

        let parts: Vec<String> = choice
            .message
            .content
            .split(PAIR_DELIMITER)
            .map(|part| part.trim().to_string())
            .collect();

        pair_from_parts(parts)
    }
}

// OpenAI API request/response structures

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}
