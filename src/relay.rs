use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::error::{IngestError, Result};

const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the CORS relay providers.
///
/// The relay exists because the calling environment cannot fetch
/// arbitrary third-party pages directly. The primary provider wraps the
/// page in a JSON envelope (`{"contents": "<html>…"}`); the fallback
/// returns the raw page body.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub primary: String,
    pub fallback: Option<String>,
    /// Per-request timeout. This is the pipeline's only cancellation
    /// primitive: a primary that exceeds it is aborted and the fallback
    /// is tried.
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            primary: "https://api.allorigins.win/get".to_string(),
            fallback: Some("https://corsproxy.io/".to_string()),
            timeout: DEFAULT_RELAY_TIMEOUT,
        }
    }
}

impl RelayConfig {
    pub fn primary(mut self, primary: impl Into<String>) -> Self {
        self.primary = primary.into();
        self
    }

    pub fn fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn no_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fetch a third-party page's HTML through the relay.
///
/// The primary provider is tried first; on any failure (timeout,
/// connection error, bad status, unusable payload) the fallback provider
/// is tried once. No further retries — both failing is a retrieval
/// failure for the item.
pub async fn fetch_page_html(client: &Client, config: &RelayConfig, target_url: &str) -> Result<String> {
    let primary_err = match fetch_primary(client, config, target_url).await {
        Ok(html) => return Ok(html),
        Err(err) => err,
    };

    let Some(fallback) = &config.fallback else {
        return Err(primary_err);
    };

    tracing::debug!(url = target_url, error = %primary_err, "primary relay failed, trying fallback");
    fetch_fallback(client, config, fallback, target_url).await
}

async fn fetch_primary(client: &Client, config: &RelayConfig, target_url: &str) -> Result<String> {
    let resp = client
        .get(&config.primary)
        .query(&[("url", target_url)])
        .timeout(config.timeout)
        .send()
        .await
        .map_err(|e| IngestError::Retrieval(format!("primary relay: {}", e)))?;

    if !resp.status().is_success() {
        return Err(IngestError::Retrieval(format!(
            "primary relay returned HTTP {}",
            resp.status().as_u16()
        )));
    }

    let payload: Value = resp
        .json()
        .await
        .map_err(|e| IngestError::Retrieval(format!("primary relay returned unusable payload: {}", e)))?;

    let contents = payload
        .get("contents")
        .and_then(Value::as_str)
        .unwrap_or("");
    if contents.trim().is_empty() {
        return Err(IngestError::Retrieval(
            "primary relay returned no contents".to_string(),
        ));
    }
    Ok(contents.to_string())
}

async fn fetch_fallback(
    client: &Client,
    config: &RelayConfig,
    fallback: &str,
    target_url: &str,
) -> Result<String> {
    let resp = client
        .get(fallback)
        .query(&[("url", target_url)])
        .timeout(config.timeout)
        .send()
        .await
        .map_err(|e| IngestError::Retrieval(format!("fallback relay: {}", e)))?;

    if !resp.status().is_success() {
        return Err(IngestError::Retrieval(format!(
            "fallback relay returned HTTP {}",
            resp.status().as_u16()
        )));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| IngestError::Retrieval(format!("fallback relay: {}", e)))?;
    if body.trim().is_empty() {
        return Err(IngestError::Retrieval(
            "no relay could retrieve the page".to_string(),
        ));
    }
    Ok(body)
}
