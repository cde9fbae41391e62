use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A news article as surfaced by the content API, normalized for the pipeline.
///
/// `title`, `description` and `content` are nullable on the wire; they are
/// folded to empty strings here so downstream code compares plain strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub image_url: Option<String>,
}

/// Errors from the news source. Any of these aborts the run: posting a
/// partial, possibly stale batch is worse than posting nothing.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid news endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("news request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("news endpoint returned status {0}")]
    Status(StatusCode),

    #[error("news API error {code}: {message}")]
    Api { code: String, message: String },
}

/// Source of candidate articles for one run.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Returns a finite batch of articles, at most the configured page size.
    async fn fetch_batch(&self) -> Result<Vec<Article>, FetchError>;
}

pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2/everything";

/// Client for a NewsAPI-style `everything` endpoint, querying a single
/// source in a single language.
pub struct NewsApiClient {
    endpoint: String,
    api_key: String,
    source: String,
    language: String,
    page_size: u32,
    timeout: Duration,
}

impl NewsApiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        source: impl Into<String>,
        language: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            source: source.into(),
            language: language.into(),
            page_size,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn fetch_batch(&self) -> Result<Vec<Article>, FetchError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent("Telepress/0.1.0")
            .build()?;

        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("sources", self.source.as_str()),
                ("language", self.language.as_str()),
                ("pageSize", &self.page_size.to_string()),
            ],
        )?;

        let max_retries = 3;
        let mut last_error = None;

        for attempt in 1..=max_retries {
            if attempt > 1 {
                let backoff = Duration::from_secs(2u64.pow(attempt - 2)); // 1s, 2s, 4s...
                tracing::info!(
                    "Retrying news fetch (attempt {}/{}) after {:?}...",
                    attempt,
                    max_retries,
                    backoff
                );
                tokio::time::sleep(backoff).await;
            }

            match client
                .get(url.clone())
                .header("X-Api-Key", &self.api_key)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let envelope: Envelope = response.json().await?;
                        if envelope.status != "ok" {
                            return Err(FetchError::Api {
                                code: envelope.code.unwrap_or_default(),
                                message: envelope.message.unwrap_or_default(),
                            });
                        }
                        return Ok(normalize(envelope.articles));
                    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(FetchError::Status(status));
                        continue; // Retry
                    } else {
                        // Client error (4xx) - likely permanent, don't retry.
                        // The API explains itself in the body when it can.
                        if let Ok(envelope) = response.json::<Envelope>().await {
                            if envelope.status == "error" {
                                return Err(FetchError::Api {
                                    code: envelope.code.unwrap_or_default(),
                                    message: envelope.message.unwrap_or_default(),
                                });
                            }
                        }
                        return Err(FetchError::Status(status));
                    }
                }
                Err(e) => {
                    // Network error - retry
                    last_error = Some(FetchError::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR)))
    }
}

// Wire structures for the content API response

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<WireArticle>,
}

#[derive(Debug, Deserialize)]
struct WireArticle {
    url: Option<String>,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    #[serde(rename = "urlToImage")]
    url_to_image: Option<String>,
}

fn normalize(articles: Vec<WireArticle>) -> Vec<Article> {
    articles
        .into_iter()
        .filter_map(|a| {
            let url = a.url.unwrap_or_default();
            if url.is_empty() {
                debug!("Skipping article without URL: {:?}", a.title);
                return None;
            }
            Some(Article {
                url,
                title: a.title.unwrap_or_default(),
                description: a.description.unwrap_or_default(),
                content: a.content.unwrap_or_default(),
                image_url: a.url_to_image.filter(|u| !u.is_empty()),
            })
        })
        .collect()
}
