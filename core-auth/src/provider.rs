//! Authorization protocol clients.
//!
//! [`AuthProvider`] is the seam between the generic flow and a platform's
//! OAuth2 dialect. [`OAuth2Client`] implements the common "authorize +
//! access_token" convention; plugins with other dialects inject their own
//! provider into [`OAuth2Flow`](crate::oauth::OAuth2Flow).

use crate::error::{AuthError, Result};
use crate::types::Token;
use async_trait::async_trait;
use bridge_traits::{Clock, HttpClient, HttpMethod, HttpRequest};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Platform-specific half of the OAuth2 authorization code flow.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// URL the user must visit to grant access.
    fn authorize_url(&self) -> Result<String>;

    /// Trade the authorization code for a token.
    ///
    /// The returned fields are merged into the token parsed from the
    /// callback URL.
    async fn exchange_code(&self, code: &str) -> Result<Token>;
}

/// App registration used by [`OAuth2Client`].
#[derive(Clone)]
pub struct OAuth2Config {
    /// Channel the client acts for; used in error messages
    pub channel: String,
    pub app_key: String,
    pub app_secret: String,
    /// Base of the provider's OAuth2 endpoints, e.g. `https://api.weibo.com/oauth2/`
    pub auth_url: String,
    pub callback_url: String,
}

impl fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("channel", &self.channel)
            .field("app_key", &self.app_key)
            .field("app_secret", &"[REDACTED]")
            .field("auth_url", &self.auth_url)
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

/// Default [`AuthProvider`].
///
/// * authorize: `GET {auth_url}authorize?client_id=..&response_type=code&redirect_uri=..`
/// * exchange: form `POST {auth_url}access_token` with `grant_type=authorization_code`
///
/// A relative `expires_in` in the exchange response is rewritten as an
/// absolute Unix timestamp.
pub struct OAuth2Client {
    config: OAuth2Config,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl OAuth2Client {
    pub fn new(config: OAuth2Config, http_client: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            http_client,
            clock,
        }
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}{}", self.config.auth_url, name)
    }

    fn authentication_failed(&self, reason: impl Into<String>) -> AuthError {
        AuthError::AuthenticationFailed {
            channel: self.config.channel.clone(),
            reason: reason.into(),
        }
    }

    /// Rewrite a lifetime-in-seconds `expires_in` as an absolute timestamp.
    fn normalize_expiry(&self, token: &mut Token) {
        let now = self.clock.unix_timestamp();
        if let Some(expires_in) = token.expires_in() {
            if expires_in < now {
                token.insert("expires_in", now + expires_in);
            }
        }
    }
}

#[async_trait]
impl AuthProvider for OAuth2Client {
    fn authorize_url(&self) -> Result<String> {
        let endpoint = self.endpoint("authorize");
        let mut url = Url::parse(&endpoint)
            .map_err(|e| AuthError::InvalidUrl(format!("{}: {}", endpoint, e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.app_key)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.callback_url);

        Ok(url.to_string())
    }

    #[instrument(skip(self, code), fields(channel = %self.config.channel))]
    async fn exchange_code(&self, code: &str) -> Result<Token> {
        let request = HttpRequest::new(HttpMethod::Post, self.endpoint("access_token"))
            .form(&[
                ("client_id", self.config.app_key.as_str()),
                ("client_secret", self.config.app_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .map_err(|e| AuthError::Network(e.to_string()))?;

        debug!("Exchanging authorization code for token");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            warn!(status = response.status, "Token endpoint rejected the code");
            return Err(self.authentication_failed(format!(
                "Token endpoint returned {}: {}",
                response.status, body
            )));
        }

        let mut token: Token = response
            .json()
            .map_err(|e| AuthError::MalformedResponse(format!("Token response: {}", e)))?;
        self.normalize_expiry(&mut token);

        debug!(expires_in = ?token.expires_in(), "Token exchange succeeded");
        Ok(token)
    }
}
