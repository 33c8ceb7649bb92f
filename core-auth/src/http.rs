//! JSON-over-HTTP helpers for plugin API calls.
//!
//! Plugins call provider REST endpoints with flat key/value parameters and
//! read back JSON. Status codes are not interpreted; provider error bodies
//! are JSON too and are returned to the plugin as-is.

use crate::error::{AuthError, Result};
use bridge_traits::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Append `params` to `base_url` as a query string.
///
/// Uses `&` when `base_url` already has a query and leaves the URL alone
/// when there are no parameters.
pub fn build_get_url<K, V>(base_url: &str, params: &[(K, V)]) -> Result<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return Ok(base_url.to_string());
    }

    let pairs: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .collect();
    let query = serde_urlencoded::to_string(&pairs)
        .map_err(|e| AuthError::InvalidUrl(format!("Failed to encode parameters: {}", e)))?;

    let separator = if base_url.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}{}", base_url, separator, query))
}

/// GET/POST helpers decoding JSON responses.
#[derive(Clone)]
pub struct HttpHelpers {
    client: Arc<dyn HttpClient>,
}

impl HttpHelpers {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// `GET base_url?params` and decode the body as JSON.
    #[instrument(skip(self, params), fields(url = %base_url))]
    pub async fn get<K, V>(&self, base_url: &str, params: &[(K, V)]) -> Result<Value>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = build_get_url(base_url, params)?;
        let request = HttpRequest::new(HttpMethod::Get, url);
        self.send(request).await
    }

    /// `POST base_url` with `params` as a form body and decode the JSON reply.
    #[instrument(skip(self, params), fields(url = %base_url))]
    pub async fn post<K, V>(&self, base_url: &str, params: &[(K, V)]) -> Result<Value>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let request = HttpRequest::new(HttpMethod::Post, base_url)
            .form(params)
            .map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
        self.send(request).await
    }

    async fn send(&self, request: HttpRequest) -> Result<Value> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        decode(&response)
    }
}

fn decode(response: &HttpResponse) -> Result<Value> {
    debug!(status = response.status, bytes = response.body.len(), "Response received");
    response
        .json()
        .map_err(|e| AuthError::MalformedResponse(format!("status {}: {}", response.status, e)))
}
