use crate::error::{Result, TranslationError};
use anyhow::Context;
use std::time::Duration;
use tracing::{debug, warn};

/// Build the shared HTTP client used by all providers.
///
/// Certificate validation stays on unless `accept_invalid_certs` is set,
/// which is meant for tests against self-signed endpoints only.
pub fn build_http_client(timeout: Duration, accept_invalid_certs: bool) -> anyhow::Result<reqwest::Client> {
    if accept_invalid_certs {
        warn!("TLS certificate validation is DISABLED for translation providers");
    }

    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .context("Failed to build translation HTTP client")
}

/// Issue a GET and decode the body as JSON.
///
/// Anything but HTTP 200, a transport failure, or a body that is not JSON
/// becomes `ProviderRequestFailed`.
pub(crate) async fn get_json(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    query: &[(&str, &str)],
    user_agent: &str,
) -> Result<serde_json::Value> {
    let response = client
        .get(url)
        .query(query)
        .header(reqwest::header::USER_AGENT, user_agent)
        .send()
        .await
        .map_err(|e| TranslationError::from_transport(provider, &e))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
        return Err(TranslationError::request_failed(
            provider,
            Some(status.as_u16()),
            truncate(&body, 200),
        ));
    }

    let body = response
        .text()
        .await
        .map_err(|e| TranslationError::from_transport(provider, &e))?;

    serde_json::from_str(&body).map_err(|e| {
        TranslationError::request_failed(provider, Some(200), format!("response is not valid JSON: {}", e))
    })
}

/// HEAD the endpoint; any answer below 500 means the backend is reachable.
pub(crate) async fn probe(client: &reqwest::Client, provider: &str, url: &str, timeout: Duration) -> bool {
    match client.head(url).timeout(timeout).send().await {
        Ok(response) => {
            let reachable = !response.status().is_server_error();
            debug!("{} health probe: HTTP {}", provider, response.status());
            reachable
        }
        Err(e) => {
            debug!("{} health probe failed: {}", provider, e);
            false
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
