//! Language codes and pairs.
//!
//! `LanguageCode` is a syntactically validated ISO 639-1 style code. It does
//! not check the registry: whether a provider can handle a code is a
//! capability question answered by the provider itself.

use crate::error::TranslationError;
use crate::i18n::LanguageRegistry;
use serde::Serialize;
use std::fmt;

/// A well-formed language code: 2-3 lowercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Validate a language code.
    ///
    /// # Returns
    /// * `Ok(LanguageCode)` if the code is 2-3 lowercase ASCII letters
    /// * `Err(TranslationError::InvalidLanguageCode)` otherwise
    ///
    /// # Example
    /// ```
    /// use translation_gateway::i18n::LanguageCode;
    ///
    /// assert!(LanguageCode::parse("ar").is_ok());
    /// assert!(LanguageCode::parse("EN").is_err());
    /// ```
    pub fn parse(code: &str) -> Result<Self, TranslationError> {
        let well_formed = (2..=3).contains(&code.len())
            && code.bytes().all(|b| b.is_ascii_lowercase());
        if !well_formed {
            return Err(TranslationError::InvalidLanguageCode(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// English display name from the registry, or the code itself.
    pub fn name(&self) -> String {
        LanguageRegistry::get().display_name(&self.0)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LanguageCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An ordered (source, target) pair with display names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
    pub source_name: String,
    pub target_name: String,
}

impl LanguagePair {
    /// Build a pair, resolving display names through the registry.
    pub fn new(source: &str, target: &str) -> Self {
        let registry = LanguageRegistry::get();
        Self {
            source: source.to_string(),
            target: target.to_string(),
            source_name: registry.display_name(source),
            target_name: registry.display_name(target),
        }
    }

    /// `"source-target"` key, the form used in configuration.
    pub fn key(&self) -> String {
        format!("{}-{}", self.source, self.target)
    }

    pub fn matches(&self, source: &str, target: &str) -> bool {
        self.source == source && self.target == target
    }
}
