//! Language registry: Single source of truth for language names and the
//! default provider whitelists.
//!
//! The table lives in `data/languages.json` and is embedded at compile time.
//! It is parsed once on first access through a `OnceLock`, so adding a
//! language is a data change only.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

static LANGUAGE_TABLE: &str = include_str!("../../data/languages.json");

/// A language known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LanguageConfig {
    /// ISO 639-1 style code (e.g., "en", "ar", "haw")
    pub code: String,

    /// English display name (e.g., "Arabic")
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct LanguageTable {
    languages: Vec<LanguageConfig>,
    mymemory_pairs: Vec<String>,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
    by_code: HashMap<String, usize>,
    mymemory_pairs: Vec<(String, String)>,
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    ///
    /// # Panics
    /// Panics if the embedded language table is not valid. The table is part
    /// of the binary and covered by tests, so this indicates a build defect.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| {
            let table: LanguageTable = serde_json::from_str(LANGUAGE_TABLE)
                .expect("embedded language table must be valid JSON");
            Self::from_table(table)
        })
    }

    fn from_table(table: LanguageTable) -> Self {
        let by_code = table
            .languages
            .iter()
            .enumerate()
            .map(|(i, lang)| (lang.code.clone(), i))
            .collect();

        let mymemory_pairs = table
            .mymemory_pairs
            .iter()
            .filter_map(|pair| parse_pair(pair))
            .collect();

        Self {
            languages: table.languages,
            by_code,
            mymemory_pairs,
        }
    }

    /// Get a language configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.by_code.get(code).map(|&i| &self.languages[i])
    }

    /// Display name for a code, falling back to the code itself.
    pub fn display_name(&self, code: &str) -> String {
        self.get_by_code(code)
            .map(|lang| lang.name.clone())
            .unwrap_or_else(|| code.to_string())
    }

    /// All languages in table order.
    pub fn list_all(&self) -> &[LanguageConfig] {
        &self.languages
    }

    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    /// Default MyMemory whitelist as `(source, target)` tuples.
    pub fn mymemory_pairs(&self) -> &[(String, String)] {
        &self.mymemory_pairs
    }
}

/// Parse a `"source-target"` pair string.
///
/// # Returns
/// * `Some((source, target))` when both halves are non-empty
/// * `None` otherwise
pub fn parse_pair(pair: &str) -> Option<(String, String)> {
    let (source, target) = pair.trim().split_once('-')?;
    let (source, target) = (source.trim(), target.trim());
    if source.is_empty() || target.is_empty() {
        return None;
    }
    Some((source.to_lowercase(), target.to_lowercase()))
}
