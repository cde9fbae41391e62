use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{pair_from_parts, TranslationError, TranslationPair, Translator};

/// Translation backend speaking the LibreTranslate-style HTTP API: both
/// texts are sent in one request so the pair is translated atomically.
pub struct HttpTranslator {
    api_url: String,
    api_key: Option<String>,
    source_lang: String,
    target_lang: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTranslator {
    pub fn new(
        api_url: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: None,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            timeout: Duration::from_secs(30),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }
}

#[async_trait::async_trait]
impl Translator for HttpTranslator {
    async fn translate(
        &self,
        title: &str,
        description: &str,
    ) -> Result<TranslationPair, TranslationError> {
        let req_body = TranslateRequest {
            q: [title, description],
            source: &self.source_lang,
            target: &self.target_lang,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .post(&self.api_url)
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

        let resp_body: TranslateResponse = response.json().await?;
        pair_from_parts(resp_body.translated_text)
    }
}

// Wire structures for the translation service

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: [&'a str; 2],
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Vec<String>,
}
