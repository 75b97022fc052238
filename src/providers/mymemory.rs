use super::http::{get_json, probe};
use super::{clamp_confidence, ProviderInfo, TranslationProvider, TranslationResult};
use crate::error::{Result, TranslationError};
use crate::i18n::{LanguageCode, LanguagePair, LanguageRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

const PROVIDER_NAME: &str = "MyMemory";
pub const DEFAULT_URL: &str = "https://api.mymemory.translated.net/get";
const USER_AGENT: &str = concat!("translation-gateway/", env!("CARGO_PKG_VERSION"));

/// Used when the backend omits `responseData.match`.
const DEFAULT_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct MyMemoryConfig {
    pub url: String,
    /// Contact address sent as `de`; MyMemory raises the free daily quota for it.
    pub email: Option<String>,
    /// Whitelisted `(source, target)` pairs. Reflects the free-tier policy,
    /// not linguistic capability.
    pub pairs: Vec<(String, String)>,
    pub health_timeout: Duration,
}

impl Default for MyMemoryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            email: None,
            pairs: LanguageRegistry::get().mymemory_pairs().to_vec(),
            health_timeout: Duration::from_secs(5),
        }
    }
}

/// Adapter for the MyMemory REST API.
pub struct MyMemoryProvider {
    client: reqwest::Client,
    config: MyMemoryConfig,
    pairs: BTreeSet<LanguagePair>,
}

impl MyMemoryProvider {
    pub fn new(client: reqwest::Client, config: MyMemoryConfig) -> Self {
        let pairs = config
            .pairs
            .iter()
            .filter(|(source, target)| source != target)
            .map(|(source, target)| LanguagePair::new(source, target))
            .collect();
        Self {
            client,
            config,
            pairs,
        }
    }
}

/// Pull `responseData.translatedText` out of a MyMemory body.
pub fn extract_translation(raw: &Value) -> Result<String> {
    raw.get("responseData")
        .and_then(|data| data.get("translatedText"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TranslationError::malformed(PROVIDER_NAME, "missing responseData.translatedText"))
}

/// `responseData.match` as a score in [0, 1]. The backend sends either a
/// number or a numeric string.
fn extract_confidence(raw: &Value) -> f64 {
    let score = match raw.get("responseData").and_then(|data| data.get("match")) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score.map(clamp_confidence).unwrap_or(DEFAULT_CONFIDENCE)
}

/// MyMemory reports quota exhaustion and invalid pairs inside an HTTP 200
/// body via `responseStatus`.
fn check_response_status(raw: &Value) -> Result<()> {
    let status = match raw.get("responseStatus") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match status {
        Some(code) if code != 200 => {
            let details = raw
                .get("responseDetails")
                .and_then(Value::as_str)
                .unwrap_or("no details");
            Err(TranslationError::request_failed(
                PROVIDER_NAME,
                u16::try_from(code).ok(),
                details,
            ))
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl TranslationProvider for MyMemoryProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<TranslationResult> {
        LanguageCode::parse(source_language)?;
        LanguageCode::parse(target_language)?;

        debug!(
            "{}: translating {} chars {} -> {}",
            PROVIDER_NAME,
            text.chars().count(),
            source_language,
            target_language
        );

        let langpair = format!("{}|{}", source_language, target_language);
        let mut query = vec![("q", text), ("langpair", langpair.as_str())];
        if let Some(email) = &self.config.email {
            query.push(("de", email.as_str()));
        }

        let raw = get_json(&self.client, PROVIDER_NAME, &self.config.url, &query, USER_AGENT).await?;
        check_response_status(&raw)?;
        let translated_text = extract_translation(&raw)?;
        let confidence = extract_confidence(&raw);

        Ok(TranslationResult {
            translated_text,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            provider: PROVIDER_NAME.to_string(),
            confidence,
            raw_response: raw,
        })
    }

    fn is_language_pair_supported(&self, source_language: &str, target_language: &str) -> bool {
        self.pairs
            .iter()
            .any(|pair| pair.matches(source_language, target_language))
    }

    fn supported_language_pairs(&self) -> BTreeSet<LanguagePair> {
        self.pairs.clone()
    }

    async fn is_healthy(&self) -> bool {
        probe(&self.client, PROVIDER_NAME, &self.config.url, self.config.health_timeout).await
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER_NAME,
            description: "Free translation service with 1000 requests per day",
            website: "https://mymemory.translated.net/",
            pricing: "Free (1000 requests/day)",
            languages: self.pairs.len(),
            api_key_required: false,
            shared_hosting_compatible: true,
        }
    }
}
