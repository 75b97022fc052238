//! Language data shared by all providers.
//!
//! # Architecture
//!
//! - `registry`: Embedded language table (codes, names, default whitelists)
//! - `language`: Validated `LanguageCode` and the `LanguagePair` capability type
//!
//! # Example
//!
//! ```rust
//! use translation_gateway::i18n::{LanguageCode, LanguageRegistry};
//!
//! let arabic = LanguageCode::parse("ar").unwrap();
//! assert_eq!(arabic.name(), "Arabic");
//! assert!(LanguageRegistry::get().contains("ar"));
//! ```

mod language;
mod registry;

pub use language::{LanguageCode, LanguagePair};
pub use registry::{parse_pair, LanguageConfig, LanguageRegistry};
