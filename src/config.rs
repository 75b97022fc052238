use crate::gateway::FallbackPolicy;
use crate::i18n::{parse_pair, LanguageCode};
use crate::providers::{GoogleConfig, MyMemoryConfig};
use anyhow::{bail, Context, Result};
use std::str::FromStr;

/// Backends the gateway knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Google,
    MyMemory,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" | "google_translate" => Ok(Self::Google),
            "mymemory" => Ok(Self::MyMemory),
            other => bail!("Unknown translation provider: '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Providers, in priority order
    pub providers: Vec<ProviderKind>,
    pub fallback_policy: FallbackPolicy,

    // Google Translate
    pub google_translate_url: String,

    // MyMemory
    pub mymemory_url: String,
    pub mymemory_email: Option<String>,
    pub mymemory_language_pairs: Vec<(String, String)>,
    /// `None` disables the quota
    pub mymemory_daily_quota: Option<u32>,

    // HTTP
    pub request_timeout_secs: u64,
    pub health_check_timeout_secs: u64,
    pub tls_accept_invalid_certs: bool,

    // Circuit breaker
    pub circuit_failure_threshold: u32,
    pub circuit_cooldown_secs: u64,

    // Cache
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let google = GoogleConfig::default();
        let mymemory = MyMemoryConfig::default();
        Self {
            providers: vec![ProviderKind::Google, ProviderKind::MyMemory],
            fallback_policy: FallbackPolicy::Sequential,
            google_translate_url: google.url,
            mymemory_url: mymemory.url,
            mymemory_email: None,
            mymemory_language_pairs: mymemory.pairs,
            mymemory_daily_quota: Some(1000),
            request_timeout_secs: 30,
            health_check_timeout_secs: 5,
            tls_accept_invalid_certs: false,
            circuit_failure_threshold: 3,
            circuit_cooldown_secs: 60,
            cache_capacity: 1024,
            cache_ttl_secs: 3600,
        }
    }
}

impl Config {
    /// Read configuration from the environment. Every variable is optional.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            providers: match non_empty_var("TRANSLATION_PROVIDERS") {
                Some(value) => parse_providers(&value).context("Invalid TRANSLATION_PROVIDERS")?,
                None => defaults.providers,
            },
            fallback_policy: match non_empty_var("TRANSLATION_FALLBACK_POLICY") {
                Some(value) => value.parse().context("Invalid TRANSLATION_FALLBACK_POLICY")?,
                None => defaults.fallback_policy,
            },

            // Google Translate
            google_translate_url: non_empty_var("GOOGLE_TRANSLATE_URL")
                .unwrap_or(defaults.google_translate_url),

            // MyMemory
            mymemory_url: non_empty_var("MYMEMORY_URL").unwrap_or(defaults.mymemory_url),
            mymemory_email: non_empty_var("MYMEMORY_EMAIL"),
            mymemory_language_pairs: match non_empty_var("MYMEMORY_LANGUAGE_PAIRS") {
                Some(value) => parse_pairs(&value).context("Invalid MYMEMORY_LANGUAGE_PAIRS")?,
                None => defaults.mymemory_language_pairs,
            },
            mymemory_daily_quota: match non_empty_var("MYMEMORY_DAILY_QUOTA") {
                Some(value) => {
                    let limit: u32 = value
                        .parse()
                        .with_context(|| format!("Invalid MYMEMORY_DAILY_QUOTA: '{}'", value))?;
                    (limit > 0).then_some(limit)
                }
                None => defaults.mymemory_daily_quota,
            },

            // HTTP
            request_timeout_secs: parse_timeout_var(
                "TRANSLATION_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            health_check_timeout_secs: parse_timeout_var(
                "HEALTH_CHECK_TIMEOUT_SECS",
                defaults.health_check_timeout_secs,
            )?,
            tls_accept_invalid_certs: parse_var(
                "TLS_ACCEPT_INVALID_CERTS",
                defaults.tls_accept_invalid_certs,
            )?,

            // Circuit breaker
            circuit_failure_threshold: parse_var(
                "CIRCUIT_FAILURE_THRESHOLD",
                defaults.circuit_failure_threshold,
            )?,
            circuit_cooldown_secs: parse_var("CIRCUIT_COOLDOWN_SECS", defaults.circuit_cooldown_secs)?,

            // Cache
            cache_capacity: parse_var("TRANSLATION_CACHE_CAPACITY", defaults.cache_capacity)?,
            cache_ttl_secs: parse_var("TRANSLATION_CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        Some(value) => value
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: '{}' ({})", key, value, e)),
        None => Ok(default),
    }
}

/// Timeouts in seconds; zero would fail every request immediately.
fn parse_timeout_var(key: &str, default: u64) -> Result<u64> {
    let secs = parse_var(key, default)?;
    if secs == 0 {
        bail!("Invalid {}: timeout must be at least 1 second", key);
    }
    Ok(secs)
}

/// Parse a comma-separated provider list, e.g. `google,mymemory`.
fn parse_providers(value: &str) -> Result<Vec<ProviderKind>> {
    let mut providers = Vec::new();
    for name in value.split(',').filter(|s| !s.trim().is_empty()) {
        let kind: ProviderKind = name.parse()?;
        if !providers.contains(&kind) {
            providers.push(kind);
        }
    }
    if providers.is_empty() {
        bail!("at least one provider is required");
    }
    Ok(providers)
}

/// Parse a comma-separated pair list, e.g. `en-ar,ar-en`.
fn parse_pairs(value: &str) -> Result<Vec<(String, String)>> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|pair| {
            parse_pair(pair)
                .filter(|(source, target)| {
                    LanguageCode::parse(source).is_ok() && LanguageCode::parse(target).is_ok()
                })
                .with_context(|| format!("malformed pair '{}'", pair.trim()))
        })
        .collect()
}
