use super::http::{get_json, probe};
use super::{ProviderInfo, TranslationProvider, TranslationResult};
use crate::error::{Result, TranslationError};
use crate::i18n::{LanguageCode, LanguagePair, LanguageRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

const PROVIDER_NAME: &str = "Google Translate";
pub const DEFAULT_URL: &str = "https://translate.googleapis.com/translate_a/single";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// The backend reports no score, so this is an optimistic placeholder.
const CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub url: String,
    pub health_timeout: Duration,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            health_timeout: Duration::from_secs(5),
        }
    }
}

/// Adapter for the unauthenticated `client=gtx` Google Translate endpoint.
///
/// Supports every ordered pair of distinct languages in the registry.
pub struct GoogleTranslateProvider {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleTranslateProvider {
    pub fn new(client: reqwest::Client, config: GoogleConfig) -> Self {
        Self { client, config }
    }
}

/// Rebuild the translation from the nested-array response.
///
/// The backend splits long input into segments under `result[0]`; the first
/// element of each segment is the translated piece, in source order.
pub fn extract_translation(raw: &Value) -> Result<String> {
    let segments = raw
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::malformed(PROVIDER_NAME, "missing result[0] segment list"))?;

    let has_first = segments
        .first()
        .and_then(|segment| segment.get(0))
        .map(Value::is_string)
        .unwrap_or(false);
    if !has_first {
        return Err(TranslationError::malformed(
            PROVIDER_NAME,
            "missing translated text at result[0][0][0]",
        ));
    }

    Ok(segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect())
}

#[async_trait]
impl TranslationProvider for GoogleTranslateProvider {
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

        let query = [
            ("client", "gtx"),
            ("sl", source_language),
            ("tl", target_language),
            ("dt", "t"),
            ("q", text),
        ];
        let raw = get_json(&self.client, PROVIDER_NAME, &self.config.url, &query, USER_AGENT).await?;
        let translated_text = extract_translation(&raw)?;

        Ok(TranslationResult {
            translated_text,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            provider: PROVIDER_NAME.to_string(),
            confidence: CONFIDENCE,
            raw_response: raw,
        })
    }

    fn is_language_pair_supported(&self, source_language: &str, target_language: &str) -> bool {
        let registry = LanguageRegistry::get();
        source_language != target_language
            && registry.contains(source_language)
            && registry.contains(target_language)
    }

    fn supported_language_pairs(&self) -> BTreeSet<LanguagePair> {
        let languages = LanguageRegistry::get().list_all();
        languages
            .iter()
            .flat_map(|source| {
                languages
                    .iter()
                    .filter(move |target| target.code != source.code)
                    .map(move |target| LanguagePair {
                        source: source.code.clone(),
                        target: target.code.clone(),
                        source_name: source.name.clone(),
                        target_name: target.name.clone(),
                    })
            })
            .collect()
    }

    async fn is_healthy(&self) -> bool {
        probe(&self.client, PROVIDER_NAME, &self.config.url, self.config.health_timeout).await
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER_NAME,
            description: "Free translation service using Google Translate API",
            website: "https://translate.google.com/",
            pricing: "Free (unofficial API)",
            languages: LanguageRegistry::get().list_all().len(),
            api_key_required: false,
            shared_hosting_compatible: true,
        }
    }
}
