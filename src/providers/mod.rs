//! Translation provider contract and the shared result types.
//!
//! Each provider wraps one external backend behind [`TranslationProvider`].
//! Providers are stateless: one outbound request per `translate` call, no
//! retries and no caching. Fallback and retry live in the gateway.

mod google;
mod http;
mod mymemory;

pub use google::{GoogleConfig, GoogleTranslateProvider};
pub use http::build_http_client;
pub use mymemory::{MyMemoryConfig, MyMemoryProvider};

use crate::error::Result;
use crate::i18n::LanguagePair;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;

/// Outcome of a successful translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    /// Human-readable provider name ("Google Translate", "MyMemory")
    pub provider: String,
    /// Score in [0, 1]. Its meaning differs per provider.
    pub confidence: f64,
    /// Decoded backend body, kept for diagnostics only.
    pub raw_response: serde_json::Value,
}

/// Static description of a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub website: &'static str,
    pub pricing: &'static str,
    /// Number of languages (Google) or whitelisted pairs (MyMemory)
    pub languages: usize,
    pub api_key_required: bool,
    pub shared_hosting_compatible: bool,
}

/// Uniform interface over a translation backend.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Provider display name, also used in results and errors.
    fn name(&self) -> &str;

    /// Translate `text` with a single request to the backend.
    ///
    /// Language codes must be well formed; pair support is not checked here,
    /// so an unsupported pair is sent to the backend as-is.
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<TranslationResult>;

    /// Capability check. No I/O.
    fn is_language_pair_supported(&self, source_language: &str, target_language: &str) -> bool;

    /// Every pair this provider declares it can handle.
    fn supported_language_pairs(&self) -> BTreeSet<LanguagePair>;

    /// Lightweight reachability probe. Never performs a translation and
    /// never returns an error.
    async fn is_healthy(&self) -> bool;

    fn provider_info(&self) -> ProviderInfo;
}

/// Confidence values reported by backends are clamped into [0, 1].
pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
