pub mod gemini;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Source and target language codes for one sync run, e.g. `en` -> `vi`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("the API key was rejected by the provider: {message}")]
    InvalidApiKey { message: String },

    #[error("model '{model_id}' is not available for this API key: {message}")]
    ModelForbiddenOrNotFound { model_id: String, message: String },

    #[error("rate limited by the provider: {message}")]
    RateLimited {
        message: String,
        /// Server-provided wait time, from a Retry-After header or the
        /// RetryInfo error detail in the response body.
        retry_hint: Option<Duration>,
    },

    #[error("network or HTTP error: {message}")]
    NetworkOrHttp { message: String },

    #[error("response contained no translation candidate")]
    EmptyResponse,
}

impl TranslationError {
    /// Rate limits and transient network/server failures are worth retrying;
    /// auth and model errors will not heal on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranslationError::RateLimited { .. } | TranslationError::NetworkOrHttp { .. }
        )
    }

    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            TranslationError::RateLimited { retry_hint, .. } => *retry_hint,
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TranslationError::InvalidApiKey { .. } => "INVALID_API_KEY",
            TranslationError::ModelForbiddenOrNotFound { .. } => "MODEL_FORBIDDEN",
            TranslationError::RateLimited { .. } => "RATE_LIMITED",
            TranslationError::NetworkOrHttp { .. } => "NETWORK_ERROR",
            TranslationError::EmptyResponse => "EMPTY_RESPONSE",
        }
    }
}

/// Boundary to the external translation service.
///
/// Implementations translate one string at a time and may suspend for pacing
/// between calls. They never retry internally; the caller owns the retry
/// loop so the policy stays in one place.
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn translate(
        &self,
        text: &str,
        pair: &LanguagePair,
    ) -> Result<String, TranslationError>;
}
