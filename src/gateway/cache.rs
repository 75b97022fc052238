//! In-memory LRU cache of successful translations.

use crate::providers::TranslationResult;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source_language: String,
    target_language: String,
    text: String,
}

struct CacheEntry {
    result: TranslationResult,
    stored_at: Instant,
}

/// Translation cache keyed by `(source, target, text)`.
///
/// A capacity of zero disables caching entirely.
pub struct TranslationCache {
    entries: Option<Mutex<LruCache<CacheKey, CacheEntry>>>,
    ttl: Duration,
}

impl TranslationCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            ttl,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    fn key(text: &str, source_language: &str, target_language: &str) -> CacheKey {
        CacheKey {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            text: text.to_string(),
        }
    }

    /// Fetch a fresh entry. Expired entries are evicted on access.
    pub async fn get(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Option<TranslationResult> {
        let entries = self.entries.as_ref()?;
        let key = Self::key(text, source_language, target_language);
        let mut cache = entries.lock().await;

        let expired = match cache.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(entry.result.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.pop(&key);
        }
        None
    }

    pub async fn put(&self, text: &str, result: &TranslationResult) {
        let Some(entries) = self.entries.as_ref() else {
            return;
        };
        let key = Self::key(text, &result.source_language, &result.target_language);
        entries.lock().await.put(
            key,
            CacheEntry {
                result: result.clone(),
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        match &self.entries {
            Some(entries) => entries.lock().await.len(),
            None => 0,
        }
    }

    pub async fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().await.clear();
        }
    }
}
