use crate::fetch::Article;
use crate::store::{SeenStore, StoreError};

/// Why an article was skipped before translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A seen record exists; the article was delivered by an earlier run.
    AlreadySent,
    /// The source returned a truncated stub: content is identical to the
    /// description, so there is no body worth posting. This mirrors the
    /// content API's truncation quirk and is not a quality score.
    StubContent,
}

/// Applies the eligibility policy in order. Returns `None` when the article
/// should be processed. Read-only: nothing is recorded here.
pub async fn check(store: &SeenStore, article: &Article) -> Result<Option<SkipReason>, StoreError> {
    if store.exists(&article.url).await? {
        return Ok(Some(SkipReason::AlreadySent));
    }
    if article.content == article.description {
        return Ok(Some(SkipReason::StubContent));
    }
    Ok(None)
}
