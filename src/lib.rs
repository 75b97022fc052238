//! Multi-provider translation gateway.
//!
//! Wraps free translation backends (Google Translate's public endpoint and
//! MyMemory) behind one [`TranslationProvider`] contract and composes them in
//! a [`TranslationGateway`] with fallback, retries, circuit breaking, request
//! quotas and a result cache.

pub mod config;
pub mod error;
pub mod gateway;
pub mod i18n;
pub mod metrics;
pub mod providers;
pub mod retry;

pub use error::{Result, TranslationError};
pub use gateway::{FallbackPolicy, GatewayConfig, TranslationGateway};
pub use providers::{TranslationProvider, TranslationResult};
