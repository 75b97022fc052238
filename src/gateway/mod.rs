//! Translation gateway: composes providers behind one `translate` call.
//!
//! Providers are tried in priority order (or raced) after a capability
//! pre-check. Each provider sits behind its own circuit breaker and optional
//! request quota; transient failures are retried with backoff before the
//! gateway falls back to the next provider.

mod cache;
mod circuit_breaker;
mod quota;

pub use cache::TranslationCache;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, Permit};
pub use quota::{QuotaConfig, RequestQuota};

use crate::config::{Config, ProviderKind};
use crate::error::{Result, TranslationError};
use crate::i18n::{LanguageCode, LanguagePair};
use crate::metrics::{GatewayMetrics, MetricsReport};
use crate::providers::{
    build_http_client, GoogleConfig, GoogleTranslateProvider, MyMemoryConfig, MyMemoryProvider,
    ProviderInfo, TranslationProvider, TranslationResult,
};
use crate::retry::{with_retry_if, RetryConfig};
use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Provider name reported for requests that need no backend.
pub const PASSTHROUGH_PROVIDER: &str = "passthrough";

/// How the gateway walks its providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Try providers one at a time in priority order
    #[default]
    Sequential,
    /// Query every eligible provider at once; first success wins
    Race,
}

impl FromStr for FallbackPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "race" => Ok(Self::Race),
            other => bail!("Unknown fallback policy: '{}' (expected 'sequential' or 'race')", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub policy: FallbackPolicy,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            policy: FallbackPolicy::Sequential,
            retry: RetryConfig::provider_call(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache_capacity: 1024,
            cache_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Health of a single provider at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub healthy: bool,
    pub circuit_state: CircuitState,
    /// Requests left in the current quota window, if a quota applies
    pub quota_remaining: Option<u32>,
    pub checked_at: DateTime<Utc>,
}

struct ProviderSlot {
    provider: Arc<dyn TranslationProvider>,
    breaker: CircuitBreaker,
    quota: Option<RequestQuota>,
}

impl ProviderSlot {
    fn name(&self) -> &str {
        self.provider.name()
    }

    /// Admit a call if the circuit allows it and the quota is not exhausted.
    fn admit(&self) -> Option<Permit<'_>> {
        if let Some(quota) = &self.quota {
            if quota.remaining() == 0 {
                debug!("{}: skipped, request quota exhausted", self.name());
                return None;
            }
        }
        let permit = self.breaker.acquire();
        if permit.is_none() {
            debug!("{}: skipped, circuit {:?}", self.name(), self.breaker.state());
        }
        permit
    }
}

pub struct TranslationGateway {
    slots: Vec<ProviderSlot>,
    config: GatewayConfig,
    cache: TranslationCache,
    metrics: GatewayMetrics,
}

impl TranslationGateway {
    /// Create a gateway with no providers; add them with [`with_provider`].
    ///
    /// [`with_provider`]: TranslationGateway::with_provider
    pub fn new(config: GatewayConfig) -> Self {
        let cache = TranslationCache::new(config.cache_capacity, config.cache_ttl);
        Self {
            slots: Vec::new(),
            config,
            cache,
            metrics: GatewayMetrics::new(),
        }
    }

    /// Append a provider at the lowest priority.
    pub fn with_provider(mut self, provider: Arc<dyn TranslationProvider>) -> Self {
        self.push(provider, None);
        self
    }

    /// Append a provider whose calls are limited by a request quota.
    pub fn with_limited_provider(
        mut self,
        provider: Arc<dyn TranslationProvider>,
        quota: QuotaConfig,
    ) -> Self {
        self.push(provider, Some(RequestQuota::new(quota)));
        self
    }

    fn push(&mut self, provider: Arc<dyn TranslationProvider>, quota: Option<RequestQuota>) {
        let breaker = CircuitBreaker::new(provider.name(), self.config.circuit_breaker.clone());
        self.slots.push(ProviderSlot {
            provider,
            breaker,
            quota,
        });
    }

    /// Build the gateway and its providers from environment configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = build_http_client(
            Duration::from_secs(config.request_timeout_secs),
            config.tls_accept_invalid_certs,
        )?;
        let health_timeout = Duration::from_secs(config.health_check_timeout_secs);

        let mut gateway = Self::new(GatewayConfig {
            policy: config.fallback_policy,
            retry: RetryConfig::provider_call(),
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: config.circuit_failure_threshold,
                cooldown: Duration::from_secs(config.circuit_cooldown_secs),
            },
            cache_capacity: config.cache_capacity,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        });

        for kind in &config.providers {
            match kind {
                ProviderKind::Google => {
                    let provider = GoogleTranslateProvider::new(
                        client.clone(),
                        GoogleConfig {
                            url: config.google_translate_url.clone(),
                            health_timeout,
                        },
                    );
                    gateway.push(Arc::new(provider), None);
                }
                ProviderKind::MyMemory => {
                    let provider = MyMemoryProvider::new(
                        client.clone(),
                        MyMemoryConfig {
                            url: config.mymemory_url.clone(),
                            email: config.mymemory_email.clone(),
                            pairs: config.mymemory_language_pairs.clone(),
                            health_timeout,
                        },
                    );
                    let quota = config
                        .mymemory_daily_quota
                        .map(|limit| RequestQuota::new(QuotaConfig::per_day(limit)));
                    gateway.push(Arc::new(provider), quota);
                }
            }
        }

        if gateway.slots.is_empty() {
            bail!("No translation providers configured");
        }

        info!(
            "Translation gateway ready: providers [{}], policy {:?}",
            gateway.provider_names().join(", "),
            gateway.config.policy
        );
        Ok(gateway)
    }

    /// Provider names in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.slots.iter().map(ProviderSlot::name).collect()
    }

    /// Translate `text`, falling back across providers on failure.
    ///
    /// Same-language requests and empty text are returned unchanged without
    /// touching a backend. When every attempted provider fails, the last
    /// provider error is returned.
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<TranslationResult> {
        self.metrics.record_request();
        let source = LanguageCode::parse(source_language)?;
        let target = LanguageCode::parse(target_language)?;

        if text.is_empty() || source == target {
            self.metrics.record_short_circuit();
            return Ok(passthrough(text, &source, &target));
        }

        if self.cache.is_enabled() {
            if let Some(hit) = self.cache.get(text, source.as_str(), target.as_str()).await {
                debug!("Cache hit for {} -> {}", source, target);
                self.metrics.record_cache_hit();
                return Ok(hit);
            }
            self.metrics.record_cache_miss();
        }

        let eligible: Vec<&ProviderSlot> = self
            .slots
            .iter()
            .filter(|slot| {
                slot.provider
                    .is_language_pair_supported(source.as_str(), target.as_str())
            })
            .collect();

        if eligible.is_empty() {
            return Err(TranslationError::LanguagePairUnsupported {
                source_language: source.to_string(),
                target_language: target.to_string(),
            });
        }

        let result = match self.config.policy {
            FallbackPolicy::Sequential => self.translate_sequential(&eligible, text, &source, &target).await,
            FallbackPolicy::Race => self.translate_race(&eligible, text, &source, &target).await,
        }?;

        self.cache.put(text, &result).await;
        Ok(result)
    }

    /// [`translate`](TranslationGateway::translate) bounded by a caller deadline.
    ///
    /// In-flight provider calls are cancelled when the deadline passes.
    pub async fn translate_with_deadline(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        deadline: Duration,
    ) -> Result<TranslationResult> {
        match tokio::time::timeout(deadline, self.translate(text, source_language, target_language)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Translation {} -> {} cancelled after {:?}",
                    source_language, target_language, deadline
                );
                Err(TranslationError::DeadlineExceeded(deadline))
            }
        }
    }

    async fn translate_sequential(
        &self,
        eligible: &[&ProviderSlot],
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<TranslationResult> {
        let mut last_error: Option<TranslationError> = None;

        for slot in eligible {
            let Some(permit) = slot.admit() else {
                continue;
            };

            if let Some(previous) = &last_error {
                self.metrics.record_fallback();
                warn!("Falling back to {} after: {}", slot.name(), previous);
            }

            match self.attempt(slot, permit, text, source, target).await {
                Ok(result) => return Ok(result),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| TranslationError::NoProviderAvailable {
            source_language: source.to_string(),
            target_language: target.to_string(),
        }))
    }

    async fn translate_race(
        &self,
        eligible: &[&ProviderSlot],
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<TranslationResult> {
        let attempts: Vec<_> = eligible
            .iter()
            .filter_map(|&slot| slot.admit().map(|permit| (slot, permit)))
            .map(|(slot, permit)| Box::pin(self.attempt(slot, permit, text, source, target)))
            .collect();

        if attempts.is_empty() {
            return Err(TranslationError::NoProviderAvailable {
                source_language: source.to_string(),
                target_language: target.to_string(),
            });
        }

        debug!("Racing {} providers for {} -> {}", attempts.len(), source, target);

        // Losing attempts are dropped, which cancels their requests
        let (result, _losers) = futures::future::select_ok(attempts).await?;
        Ok(result)
    }

    /// One provider, with retries, settling the circuit permit on completion.
    ///
    /// When the quota stops a retry, the last backend error is returned and
    /// still counts against the circuit.
    async fn attempt(
        &self,
        slot: &ProviderSlot,
        permit: Permit<'_>,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<TranslationResult> {
        let operation_name = format!("{} {} -> {}", slot.name(), source, target);
        let last_backend_error: Mutex<Option<TranslationError>> = Mutex::new(None);
        let quota_exhausted = AtomicBool::new(false);
        let (last_error, exhausted) = (&last_backend_error, &quota_exhausted);

        let outcome = with_retry_if(
            &self.config.retry,
            &operation_name,
            || async move {
                if let Some(quota) = &slot.quota {
                    if !quota.try_consume() {
                        exhausted.store(true, Ordering::Relaxed);
                        return Err(TranslationError::NoProviderAvailable {
                            source_language: source.to_string(),
                            target_language: target.to_string(),
                        });
                    }
                }

                self.metrics.record_api_call();
                let result = slot
                    .provider
                    .translate(text, source.as_str(), target.as_str())
                    .await;
                if let Err(e) = &result {
                    self.metrics.record_api_failure();
                    *last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e.clone());
                }
                result
            },
            |e| !exhausted.load(Ordering::Relaxed) && e.is_retryable(),
        )
        .await;

        let backend_error = last_backend_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let outcome = match (outcome, backend_error) {
            (Err(_), Some(e)) if quota_exhausted.load(Ordering::Relaxed) => Err(e),
            (Err(e), None) if quota_exhausted.load(Ordering::Relaxed) => {
                debug!("{}: request quota ran out before the backend was reached", slot.name());
                drop(permit);
                return Err(e);
            }
            (outcome, _) => outcome,
        };

        match &outcome {
            Ok(result) => {
                debug!("{} translated {} -> {}", result.provider, source, target);
                permit.success();
            }
            Err(e) => {
                warn!("{} failed: {}", slot.name(), e);
                permit.failure();
            }
        }
        outcome
    }

    /// Probe every provider concurrently.
    pub async fn health_report(&self) -> Vec<ProviderHealth> {
        let probes = self.slots.iter().map(|slot| async move {
            let healthy = slot.provider.is_healthy().await;
            ProviderHealth {
                provider: slot.name().to_string(),
                healthy,
                circuit_state: slot.breaker.state(),
                quota_remaining: slot.quota.as_ref().map(RequestQuota::remaining),
                checked_at: Utc::now(),
            }
        });
        futures::future::join_all(probes).await
    }

    /// Whether any provider declares the pair.
    pub fn is_language_pair_supported(&self, source_language: &str, target_language: &str) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.provider.is_language_pair_supported(source_language, target_language))
    }

    /// Union of every provider's declared pairs.
    pub fn supported_language_pairs(&self) -> BTreeSet<LanguagePair> {
        self.slots
            .iter()
            .flat_map(|slot| slot.provider.supported_language_pairs())
            .collect()
    }

    pub fn provider_infos(&self) -> Vec<ProviderInfo> {
        self.slots.iter().map(|slot| slot.provider.provider_info()).collect()
    }

    pub fn circuit_state(&self, provider: &str) -> Option<CircuitState> {
        self.slots
            .iter()
            .find(|slot| slot.name() == provider)
            .map(|slot| slot.breaker.state())
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }
}

fn passthrough(text: &str, source: &LanguageCode, target: &LanguageCode) -> TranslationResult {
    TranslationResult {
        translated_text: text.to_string(),
        source_language: source.to_string(),
        target_language: target.to_string(),
        provider: PASSTHROUGH_PROVIDER.to_string(),
        confidence: 1.0,
        raw_response: serde_json::Value::Null,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    // ==================== Test Helpers ====================

    /// Provider with scripted outcomes; repeats the last one when exhausted.
    struct StubProvider {
        name: &'static str,
        pairs: Vec<(&'static str, &'static str)>,
        outcomes: Mutex<VecDeque<Result<String>>>,
        delay: Duration,
        healthy: bool,
        calls: AtomicU32,
    }

    impl StubProvider {
        fn new(name: &'static str, outcomes: Vec<Result<String>>) -> Self {
            Self {
                name,
                pairs: vec![("en", "ar"), ("en", "es"), ("ar", "en")],
                outcomes: Mutex::new(outcomes.into()),
                delay: Duration::ZERO,
                healthy: true,
                calls: AtomicU32::new(0),
            }
        }

        fn ok(name: &'static str, text: &str) -> Self {
            Self::new(name, vec![Ok(text.to_string())])
        }

        fn failing(name: &'static str, status: u16) -> Self {
            Self::new(name, vec![Err(server_error(name, status))])
        }

        fn with_pairs(mut self, pairs: Vec<(&'static str, &'static str)>) -> Self {
            self.pairs = pairs;
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn unhealthy(mut self) -> Self {
            self.healthy = false;
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn server_error(name: &str, status: u16) -> TranslationError {
        TranslationError::request_failed(name, Some(status), "stub failure")
    }

    #[async_trait]
    impl TranslationProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn translate(
            &self,
            _text: &str,
            source_language: &str,
            target_language: &str,
        ) -> Result<TranslationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let outcome = {
                let mut outcomes = self.outcomes.lock().unwrap();
                if outcomes.len() > 1 {
                    outcomes.pop_front().unwrap()
                } else {
                    outcomes.front().cloned().unwrap()
                }
            };
            outcome.map(|text| TranslationResult {
                translated_text: text,
                source_language: source_language.to_string(),
                target_language: target_language.to_string(),
                provider: self.name.to_string(),
                confidence: 0.5,
                raw_response: serde_json::Value::Null,
            })
        }

        fn is_language_pair_supported(&self, source_language: &str, target_language: &str) -> bool {
            self.pairs
                .iter()
                .any(|(s, t)| *s == source_language && *t == target_language)
        }

        fn supported_language_pairs(&self) -> BTreeSet<LanguagePair> {
            self.pairs.iter().map(|(s, t)| LanguagePair::new(s, t)).collect()
        }

        async fn is_healthy(&self) -> bool {
            self.healthy
        }

        fn provider_info(&self) -> ProviderInfo {
            ProviderInfo {
                name: self.name,
                description: "stub",
                website: "https://example.com/",
                pricing: "Free",
                languages: self.pairs.len(),
                api_key_required: false,
                shared_hosting_compatible: true,
            }
        }
    }

    fn fast_config() -> GatewayConfig {
        GatewayConfig {
            retry: RetryConfig::new(2, Duration::from_millis(5)),
            ..GatewayConfig::default()
        }
    }

    // ==================== Short-circuit Tests ====================

    #[tokio::test]
    async fn test_same_language_short_circuits() {
        let stub = Arc::new(StubProvider::ok("Stub", "unused"));
        let gateway = TranslationGateway::new(fast_config()).with_provider(stub.clone());

        let result = gateway.translate("Hello", "en", "en").await.unwrap();

        assert_eq!(result.translated_text, "Hello");
        assert_eq!(result.provider, PASSTHROUGH_PROVIDER);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(stub.calls(), 0);
        assert_eq!(gateway.metrics().short_circuits, 1);
    }

    #[tokio::test]
    async fn test_empty_text_passes_through() {
        let stub = Arc::new(StubProvider::ok("Stub", "unused"));
        let gateway = TranslationGateway::new(fast_config()).with_provider(stub.clone());

        let result = gateway.translate("", "en", "ar").await.unwrap();

        assert_eq!(result.translated_text, "");
        assert_eq!(result.target_language, "ar");
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_code_rejected() {
        let gateway = TranslationGateway::new(fast_config())
            .with_provider(Arc::new(StubProvider::ok("Stub", "x")));

        let err = gateway.translate("Hello", "en", "Arabic").await.unwrap_err();
        assert_eq!(err, TranslationError::InvalidLanguageCode("Arabic".to_string()));
    }

    // ==================== Fallback Tests ====================

    #[tokio::test]
    async fn test_first_provider_success() {
        let first = Arc::new(StubProvider::ok("First", "مرحبا"));
        let second = Arc::new(StubProvider::ok("Second", "unused"));
        let gateway = TranslationGateway::new(fast_config())
            .with_provider(first.clone())
            .with_provider(second.clone());

        let result = gateway.translate("Hello", "en", "ar").await.unwrap();

        assert_eq!(result.provider, "First");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let first = Arc::new(StubProvider::failing("First", 500));
        let second = Arc::new(StubProvider::ok("Second", "مرحبا"));
        let gateway = TranslationGateway::new(fast_config())
            .with_provider(first.clone())
            .with_provider(second.clone());

        let result = gateway.translate("Hello", "en", "ar").await.unwrap();

        assert_eq!(result.provider, "Second");
        assert_eq!(result.translated_text, "مرحبا");
        // 500 is retryable: two attempts on the first provider
        assert_eq!(first.calls(), 2);
        assert_eq!(gateway.metrics().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_non_retryable_error_falls_back_without_retry() {
        let first = Arc::new(StubProvider::failing("First", 403));
        let second = Arc::new(StubProvider::ok("Second", "Hola"));
        let gateway = TranslationGateway::new(fast_config())
            .with_provider(first.clone())
            .with_provider(second);

        let result = gateway.translate("Hello", "en", "es").await.unwrap();

        assert_eq!(result.provider, "Second");
        assert_eq!(first.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_on_same_provider() {
        let flaky = Arc::new(StubProvider::new(
            "Flaky",
            vec![Err(server_error("Flaky", 503)), Ok("Hola".to_string())],
        ));
        let backup = Arc::new(StubProvider::ok("Backup", "unused"));
        let gateway = TranslationGateway::new(fast_config())
            .with_provider(flaky.clone())
            .with_provider(backup.clone());

        let result = gateway.translate("Hello", "en", "es").await.unwrap();

        assert_eq!(result.provider, "Flaky");
        assert_eq!(backup.calls(), 0);
        assert_eq!(gateway.metrics().fallbacks, 0);
    }

    #[tokio::test]
    async fn test_all_failed_surfaces_last_error() {
        let gateway = TranslationGateway::new(fast_config())
            .with_provider(Arc::new(StubProvider::failing("First", 500)))
            .with_provider(Arc::new(StubProvider::failing("Second", 502)));

        let err = gateway.translate("Hello", "en", "ar").await.unwrap_err();

        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("Second"));
    }

    // ==================== Capability Pre-check Tests ====================

    #[tokio::test]
    async fn test_unsupported_pair_fails_fast() {
        let stub = Arc::new(StubProvider::ok("Stub", "x"));
        let gateway = TranslationGateway::new(fast_config()).with_provider(stub.clone());

        let err = gateway.translate("Hej", "sv", "no").await.unwrap_err();

        assert_eq!(
            err,
            TranslationError::LanguagePairUnsupported {
                source_language: "sv".to_string(),
                target_language: "no".to_string(),
            }
        );
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_skips_provider_without_pair() {
        let narrow = Arc::new(StubProvider::ok("Narrow", "x").with_pairs(vec![("en", "fr")]));
        let wide = Arc::new(StubProvider::ok("Wide", "Hej").with_pairs(vec![("en", "sv")]));
        let gateway = TranslationGateway::new(fast_config())
            .with_provider(narrow.clone())
            .with_provider(wide);

        let result = gateway.translate("Hello", "en", "sv").await.unwrap();

        assert_eq!(result.provider, "Wide");
        assert_eq!(narrow.calls(), 0);
        // Skipping an ineligible provider is not a fallback
        assert_eq!(gateway.metrics().fallbacks, 0);
    }

    #[test]
    fn test_supported_pairs_union() {
        let gateway = TranslationGateway::new(fast_config())
            .with_provider(Arc::new(StubProvider::ok("A", "x").with_pairs(vec![("en", "fr")])))
            .with_provider(Arc::new(
                StubProvider::ok("B", "x").with_pairs(vec![("en", "fr"), ("fr", "en")]),
            ));

        let pairs = gateway.supported_language_pairs();
        assert_eq!(pairs.len(), 2);
        assert!(gateway.is_language_pair_supported("fr", "en"));
        assert!(!gateway.is_language_pair_supported("en", "de"));
        assert_eq!(gateway.provider_names(), vec!["A", "B"]);
        assert_eq!(gateway.provider_infos().len(), 2);
    }

    // ==================== Circuit Breaker Tests ====================

    #[tokio::test]
    async fn test_open_circuit_skips_provider() {
        let config = GatewayConfig {
            retry: RetryConfig::no_retry(),
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 2,
                cooldown: Duration::from_secs(60),
            },
            cache_capacity: 0,
            ..GatewayConfig::default()
        };
        let broken = Arc::new(StubProvider::failing("Broken", 500));
        let backup = Arc::new(StubProvider::ok("Backup", "Hola"));
        let gateway = TranslationGateway::new(config)
            .with_provider(broken.clone())
            .with_provider(backup);

        for _ in 0..2 {
            gateway.translate("Hello", "en", "es").await.unwrap();
        }
        assert_eq!(gateway.circuit_state("Broken"), Some(CircuitState::Open));

        gateway.translate("Hello", "en", "es").await.unwrap();
        // Third request never reached the broken provider
        assert_eq!(broken.calls(), 2);
    }

    #[tokio::test]
    async fn test_all_circuits_open_is_no_provider_available() {
        let config = GatewayConfig {
            retry: RetryConfig::no_retry(),
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 1,
                cooldown: Duration::from_secs(60),
            },
            ..GatewayConfig::default()
        };
        let gateway = TranslationGateway::new(config)
            .with_provider(Arc::new(StubProvider::failing("Only", 500)));

        assert!(gateway.translate("Hello", "en", "ar").await.is_err());
        let err = gateway.translate("Hello", "en", "ar").await.unwrap_err();

        assert!(matches!(err, TranslationError::NoProviderAvailable { .. }));
    }

    #[tokio::test]
    async fn test_half_open_trial_recovers() {
        let config = GatewayConfig {
            retry: RetryConfig::no_retry(),
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 1,
                cooldown: Duration::from_millis(20),
            },
            ..GatewayConfig::default()
        };
        let provider = Arc::new(StubProvider::new(
            "Recovering",
            vec![Err(server_error("Recovering", 500)), Ok("مرحبا".to_string())],
        ));
        let gateway = TranslationGateway::new(config).with_provider(provider.clone());

        assert!(gateway.translate("Hello", "en", "ar").await.is_err());
        tokio::time::sleep(Duration::from_millis(30)).await;

        let result = gateway.translate("Hello", "en", "ar").await.unwrap();
        assert_eq!(result.translated_text, "مرحبا");
        assert_eq!(gateway.circuit_state("Recovering"), Some(CircuitState::Closed));
    }

    // ==================== Quota Tests ====================

    #[tokio::test]
    async fn test_exhausted_quota_falls_through() {
        let limited = Arc::new(StubProvider::ok("Limited", "uno"));
        let backup = Arc::new(StubProvider::ok("Backup", "dos"));
        let config = GatewayConfig {
            cache_capacity: 0,
            ..fast_config()
        };
        let gateway = TranslationGateway::new(config)
            .with_limited_provider(
                limited.clone(),
                QuotaConfig {
                    max_requests: 1,
                    window: Duration::from_secs(60),
                },
            )
            .with_provider(backup);

        assert_eq!(gateway.translate("one", "en", "es").await.unwrap().provider, "Limited");
        assert_eq!(gateway.translate("two", "en", "es").await.unwrap().provider, "Backup");
        assert_eq!(limited.calls(), 1);
    }

    #[tokio::test]
    async fn test_quota_stopping_retry_surfaces_backend_error() {
        let limited = Arc::new(StubProvider::failing("Limited", 503));
        let config = GatewayConfig {
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 1,
                cooldown: Duration::from_secs(60),
            },
            ..fast_config()
        };
        let gateway = TranslationGateway::new(config).with_limited_provider(
            limited.clone(),
            QuotaConfig {
                max_requests: 1,
                window: Duration::from_secs(60),
            },
        );

        let err = gateway.translate("one", "en", "es").await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(limited.calls(), 1);
        // The backend failure still counts against the circuit
        assert_eq!(gateway.circuit_state("Limited"), Some(CircuitState::Open));
    }

    // ==================== Cache Tests ====================

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let stub = Arc::new(StubProvider::ok("Stub", "Hola"));
        let gateway = TranslationGateway::new(fast_config()).with_provider(stub.clone());

        let first = gateway.translate("Hello", "en", "es").await.unwrap();
        let second = gateway.translate("Hello", "en", "es").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(stub.calls(), 1);
        let report = gateway.metrics();
        assert_eq!(report.cache_hits, 1);
        assert_eq!(report.cache_misses, 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let stub = Arc::new(StubProvider::new(
            "Stub",
            vec![Err(server_error("Stub", 400)), Ok("Hola".to_string())],
        ));
        let gateway = TranslationGateway::new(fast_config()).with_provider(stub.clone());

        assert!(gateway.translate("Hello", "en", "es").await.is_err());
        assert_eq!(gateway.translate("Hello", "en", "es").await.unwrap().translated_text, "Hola");
    }

    // ==================== Race Policy Tests ====================

    #[tokio::test]
    async fn test_race_returns_fastest_success() {
        let slow = Arc::new(StubProvider::ok("Slow", "lento").with_delay(Duration::from_millis(200)));
        let fast = Arc::new(StubProvider::ok("Fast", "rapido"));
        let config = GatewayConfig {
            policy: FallbackPolicy::Race,
            ..fast_config()
        };
        let gateway = TranslationGateway::new(config)
            .with_provider(slow)
            .with_provider(fast);

        let result = gateway.translate("Hello", "en", "es").await.unwrap();
        assert_eq!(result.provider, "Fast");
    }

    #[tokio::test]
    async fn test_race_failure_does_not_beat_success() {
        let failing = Arc::new(StubProvider::failing("Failing", 400));
        let slow = Arc::new(StubProvider::ok("Slow", "Hola").with_delay(Duration::from_millis(30)));
        let config = GatewayConfig {
            policy: FallbackPolicy::Race,
            ..fast_config()
        };
        let gateway = TranslationGateway::new(config)
            .with_provider(failing)
            .with_provider(slow);

        let result = gateway.translate("Hello", "en", "es").await.unwrap();
        assert_eq!(result.provider, "Slow");
    }

    #[tokio::test]
    async fn test_race_all_fail() {
        let config = GatewayConfig {
            policy: FallbackPolicy::Race,
            retry: RetryConfig::no_retry(),
            ..GatewayConfig::default()
        };
        let gateway = TranslationGateway::new(config)
            .with_provider(Arc::new(StubProvider::failing("A", 500)))
            .with_provider(Arc::new(StubProvider::failing("B", 500)));

        let err = gateway.translate("Hello", "en", "ar").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    // ==================== Deadline Tests ====================

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let slow = Arc::new(StubProvider::ok("Slow", "x").with_delay(Duration::from_secs(5)));
        let gateway = TranslationGateway::new(fast_config()).with_provider(slow);

        let err = gateway
            .translate_with_deadline("Hello", "en", "ar", Duration::from_millis(20))
            .await
            .unwrap_err();

        assert_eq!(err, TranslationError::DeadlineExceeded(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_cancelled_half_open_trial_is_released() {
        let config = GatewayConfig {
            retry: RetryConfig::no_retry(),
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 1,
                cooldown: Duration::ZERO,
            },
            ..GatewayConfig::default()
        };
        let provider = Arc::new(StubProvider::new(
            "Slow",
            vec![Err(server_error("Slow", 500)), Ok("x".to_string())],
        ).with_delay(Duration::from_millis(50)));
        let gateway = TranslationGateway::new(config).with_provider(provider.clone());

        assert!(gateway.translate("Hello", "en", "ar").await.is_err());

        // Half-open trial cancelled by the deadline
        let err = gateway
            .translate_with_deadline("Hello", "en", "ar", Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::DeadlineExceeded(_)));

        // The trial slot was freed, so the next request is admitted
        assert!(gateway.translate("Hello", "en", "ar").await.is_ok());
    }

    #[tokio::test]
    async fn test_deadline_not_hit() {
        let gateway = TranslationGateway::new(fast_config())
            .with_provider(Arc::new(StubProvider::ok("Stub", "Hola")));

        let result = gateway
            .translate_with_deadline("Hello", "en", "es", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.translated_text, "Hola");
    }

    // ==================== Health Tests ====================

    #[tokio::test]
    async fn test_health_report() {
        let gateway = TranslationGateway::new(fast_config())
            .with_provider(Arc::new(StubProvider::ok("Up", "x")))
            .with_limited_provider(
                Arc::new(StubProvider::ok("Down", "x").unhealthy()),
                QuotaConfig::per_day(1000),
            );

        let report = gateway.health_report().await;

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].provider, "Up");
        assert!(report[0].healthy);
        assert_eq!(report[0].quota_remaining, None);
        assert_eq!(report[1].provider, "Down");
        assert!(!report[1].healthy);
        assert_eq!(report[1].quota_remaining, Some(1000));
        assert_eq!(report[1].circuit_state, CircuitState::Closed);
    }

    // ==================== Policy Parsing Tests ====================

    #[test]
    fn test_fallback_policy_from_str() {
        assert_eq!("sequential".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::Sequential);
        assert_eq!(" Race ".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::Race);
        assert!("random".parse::<FallbackPolicy>().is_err());
    }

    #[test]
    fn test_from_config_requires_a_provider() {
        let config = Config {
            providers: vec![],
            ..Config::default()
        };
        assert!(TranslationGateway::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_builds_providers_in_order() {
        let config = Config {
            providers: vec![ProviderKind::MyMemory, ProviderKind::Google],
            ..Config::default()
        };
        let gateway = TranslationGateway::from_config(&config).unwrap();
        assert_eq!(gateway.provider_names(), vec!["MyMemory", "Google Translate"]);
    }
}
