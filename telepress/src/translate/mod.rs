use async_trait::async_trait;

pub mod chat;
pub mod http;

/// Both halves of one article, translated together. Produced as a unit so
/// downstream formatting never mixes translated and untranslated fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPair {
    pub title: String,
    pub description: String,
}

/// Errors from a translation backend. Per-article: the orchestrator skips
/// the article and moves on, it never aborts the batch for these.
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("translation request timed out")]
    Timeout,

    #[error("translation API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed translation output: {0}")]
    Malformed(String),
}

/// Core trait for translation backends (HTTP service or chat completion).
///
/// Given two input strings, return two corresponding output strings in the
/// target language, or fail. Backends must reject rather than guess when
/// they cannot produce exactly two usable texts.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate title and description as one unit.
    async fn translate(
        &self,
        title: &str,
        description: &str,
    ) -> Result<TranslationPair, TranslationError>;
}

/// Validates that a backend produced exactly two non-empty texts.
pub(crate) fn pair_from_parts(parts: Vec<String>) -> Result<TranslationPair, TranslationError> {
    match <[String; 2]>::try_from(parts) {
        Ok([title, description]) => {
            if title.trim().is_empty() || description.trim().is_empty() {
                return Err(TranslationError::Malformed(
                    "empty text in translation pair".to_string(),
                ));
            }
            Ok(TranslationPair { title, description })
        }
        Err(parts) => Err(TranslationError::Malformed(format!(
            "expected 2 translations, got {}",
            parts.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_texts_make_a_pair() {
        let pair = pair_from_parts(vec!["t".into(), "d".into()]).expect("pair");
        assert_eq!(pair.title, "t");
        assert_eq!(pair.description, "d");
    }

    #[test]
    fn wrong_count_is_malformed() {
        assert!(matches!(
            pair_from_parts(vec!["only one".into()]),
            Err(TranslationError::Malformed(_))
        ));
        assert!(matches!(
            pair_from_parts(vec!["a".into(), "b".into(), "c".into()]),
            Err(TranslationError::Malformed(_))
        ));
    }

    #[test]
    fn empty_member_is_malformed() {
        assert!(matches!(
            pair_from_parts(vec!["title".into(), "   ".into()]),
            Err(TranslationError::Malformed(_))
        ));
    }
}
