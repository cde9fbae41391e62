use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::deliver::Deliver;
use crate::fetch::{Article, FetchError, NewsSource};
use crate::filter::{self, SkipReason};
use crate::store::{SeenStore, StoreError};
use crate::translate::{TranslationPair, Translator};

/// Fatal errors. Everything else is per-article and never aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("seen store failure: {0}")]
    Store(#[from] StoreError),
}

/// Terminal state of one article within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOutcome {
    Skipped(SkipReason),
    TranslationFailed,
    DeliveryFailed,
    Delivered,
}

/// Counters for one run, logged at the end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub already_sent: usize,
    pub stubs: usize,
    pub translation_failures: usize,
    pub delivery_failures: usize,
    pub delivered: usize,
}

/// Drives the per-article state machine:
/// fetched -> filtered -> translated -> delivered -> recorded.
///
/// The seen record is written only after a successful delivery, so a failed
/// article stays eligible for the next run and a delivered one is never
/// posted twice.
pub struct Pipeline {
    source: Arc<dyn NewsSource>,
    translator: Arc<dyn Translator>,
    channel: Arc<dyn Deliver>,
    store: SeenStore,
    pacing: Duration,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn NewsSource>,
        translator: Arc<dyn Translator>,
        channel: Arc<dyn Deliver>,
        store: SeenStore,
    ) -> Self {
        Self {
            source,
            translator,
            channel,
            store,
            pacing: Duration::from_secs(2),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Runs one batch to completion. A fetch failure aborts before anything
    /// is posted; a store write failure aborts mid-batch.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let articles = self.source.fetch_batch().await?;
        info!("fetched {} candidate articles", articles.len());
        self.process_batch(articles).await
    }

    /// Processes an already-fetched batch, article by article, in order.
    pub async fn process_batch(&self, articles: Vec<Article>) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary {
            fetched: articles.len(),
            ..Default::default()
        };

        for article in &articles {
            let outcome = self.process_article(article).await?;
            match outcome {
                ArticleOutcome::Skipped(SkipReason::AlreadySent) => summary.already_sent += 1,
                ArticleOutcome::Skipped(SkipReason::StubContent) => summary.stubs += 1,
                ArticleOutcome::TranslationFailed => summary.translation_failures += 1,
                ArticleOutcome::DeliveryFailed => summary.delivery_failures += 1,
                ArticleOutcome::Delivered => summary.delivered += 1,
            }

            // Skips touched no external service; everything else paces the
            // channel, whatever the outcome, to keep throughput predictable.
            if !matches!(outcome, ArticleOutcome::Skipped(_)) {
                tokio::time::sleep(self.pacing).await;
            }
        }

        info!(
            "run complete: {} delivered, {} already sent, {} stubs, {} translation failures, {} delivery failures",
            summary.delivered,
            summary.already_sent,
            summary.stubs,
            summary.translation_failures,
            summary.delivery_failures
        );
        Ok(summary)
    }

    async fn process_article(&self, article: &Article) -> Result<ArticleOutcome, RunError> {
        match filter::check(&self.store, article).await? {
            Some(SkipReason::AlreadySent) => {
                info!("Skipping already sent article: {}", article.title);
                return Ok(ArticleOutcome::Skipped(SkipReason::AlreadySent));
            }
            Some(SkipReason::StubContent) => {
                info!("Skipping stub article without body: {}", article.title);
                return Ok(ArticleOutcome::Skipped(SkipReason::StubContent));
            }
            None => {}
        }

        let pair = match self
            .translator
            .translate(&article.title, &article.description)
            .await
        {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Translation failed for '{}': {}", article.title, e);
                return Ok(ArticleOutcome::TranslationFailed);
            }
        };

        let text = format_message(article, &pair);
        let receipt = match self
            .channel
            .deliver(&text, article.image_url.as_deref())
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(
                    "Delivery failed for '{}' ({}): {}",
                    article.title, article.url, e
                );
                return Ok(ArticleOutcome::DeliveryFailed);
            }
        };

        // Recorded with the original title, only now that delivery succeeded.
        match self.store.record(&article.url, &article.title, Utc::now()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate) => {
                // Only reachable when another run slipped in between exists
                // and record; the record already proves delivery.
                error!(
                    "Seen record already present for {} -- overlapping run?",
                    article.url
                );
            }
            Err(e) => return Err(RunError::Store(e)),
        }

        info!(
            "Posted: {} (message {}, photo attached: {})",
            pair.title, receipt.message_id, receipt.photo_attached
        );
        Ok(ArticleOutcome::Delivered)
    }
}

/// Channel message: translated pair up front, canonical link, then the
/// original text for reference. Bold via the channel's `*` markup.
pub fn format_message(article: &Article, pair: &TranslationPair) -> String {
    format!(
        "\u{1F4E2} *{}*\n\n{}\n\n{}\n\n\n*{}*\n\n{}",
        pair.title, pair.description, article.url, article.title, article.description
    )
}
