use std::time::Duration;
use thiserror::Error;

/// Errors raised by translation providers and the gateway.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// The backend could not be reached, answered with a non-200 status,
    /// or returned a body that is not JSON.
    #[error("{provider} request failed{}: {message}", status_suffix(.status))]
    ProviderRequestFailed {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// The backend answered 200 with JSON that lacks the expected field.
    #[error("Invalid response format from {provider}: {reason}")]
    ProviderResponseMalformed { provider: String, reason: String },

    #[error("Unsupported language pair: {source_language} -> {target_language}")]
    LanguagePairUnsupported {
        source_language: String,
        target_language: String,
    },

    #[error("Invalid language code: '{0}'")]
    InvalidLanguageCode(String),

    /// Every provider that supports the pair is circuit-open or over quota.
    #[error("No translation provider is currently available for {source_language} -> {target_language}")]
    NoProviderAvailable {
        source_language: String,
        target_language: String,
    },

    #[error("Translation did not complete within {0:?}")]
    DeadlineExceeded(Duration),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with HTTP {}", code),
        None => String::new(),
    }
}

impl TranslationError {
    pub(crate) fn request_failed(provider: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ProviderRequestFailed {
            provider: provider.to_string(),
            status,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(provider: &str, reason: impl Into<String>) -> Self {
        Self::ProviderResponseMalformed {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Map a reqwest transport error onto a provider failure.
    pub(crate) fn from_transport(provider: &str, error: &reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            format!("request timed out: {}", error)
        } else if error.is_connect() {
            format!("connection failed: {}", error)
        } else {
            error.to_string()
        };
        Self::request_failed(provider, error.status().map(|s| s.as_u16()), message)
    }

    /// HTTP status reported by the backend, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ProviderRequestFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether another attempt against the same provider could succeed.
    ///
    /// Transport failures, 429 and 5xx are transient. Other 4xx, malformed
    /// bodies and gateway-level errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderRequestFailed { status: None, .. } => true,
            Self::ProviderRequestFailed {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TranslationError>;
