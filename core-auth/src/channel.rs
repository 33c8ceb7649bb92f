//! Per-channel authorization state.
//!
//! [`SnsChannel`] is the object a platform plugin holds for one configured
//! account. It owns the channel identity, the app credentials and the current
//! token, and offers the authorization, persistence and HTTP operations the
//! plugin builds on.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::SnsChannel;
//! use core_runtime::config::{load_channels, PlatformBridges};
//!
//! # async fn example() -> core_auth::Result<()> {
//! let bridges = PlatformBridges::builder().build()?;
//! let channels = load_channels("conf/channel.json")?;
//!
//! let mut channel = SnsChannel::new(bridges);
//! channel.read_channel(&channels[0]);
//!
//! if !channel.get_saved_token().await {
//!     channel
//!         .oauth2("https://api.weibo.com/oauth2/", "http://snsapi.sinaapp.com/")
//!         .await?;
//!     channel.save_token().await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::http::HttpHelpers;
use crate::oauth::OAuth2Flow;
use crate::provider::{AuthProvider, OAuth2Client, OAuth2Config};
use crate::strategy::{CodeFetchStrategy, PollPolicy, UrlRequestStrategy};
use crate::token_store::TokenStore;
use crate::types::Token;
use core_runtime::config::{AuthenticationInfo, ChannelConfig, PlatformBridges};
use serde_json::Value;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// One configured connection to an SNS provider account.
pub struct SnsChannel {
    bridges: PlatformBridges,
    http: HttpHelpers,
    channel_name: String,
    platform: String,
    app_key: Option<String>,
    app_secret: Option<String>,
    auth_info: AuthenticationInfo,
    token: Token,
    poll_policy: PollPolicy,
    cancel: CancellationToken,
}

impl SnsChannel {
    /// Create a channel with no identity, default authentication settings
    /// and an empty token.
    pub fn new(bridges: PlatformBridges) -> Self {
        Self {
            http: HttpHelpers::new(bridges.http_client.clone()),
            bridges,
            channel_name: String::new(),
            platform: String::new(),
            app_key: None,
            app_secret: None,
            auth_info: AuthenticationInfo::default(),
            token: Token::new(),
            poll_policy: PollPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Override the external code-fetch retry settings.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Take identity, credentials and authentication settings from a
    /// channel file entry.
    ///
    /// Settings missing from `config` keep their current values.
    pub fn read_channel(&mut self, config: &ChannelConfig) {
        self.channel_name = config.channel_name.clone();
        self.platform = config.platform.clone();

        if let Some(auth_info) = &config.auth_info {
            self.auth_info = auth_info.clone();
        }
        if let Some(app_key) = &config.app_key {
            self.app_key = Some(app_key.clone());
        }
        if let Some(app_secret) = &config.app_secret {
            self.app_secret = Some(app_secret.clone());
        }

        debug!(channel = %self.channel_name, platform = %self.platform, "Channel configured");
    }

    /// Set the app credentials issued by the provider.
    pub fn setup_app(&mut self, app_key: impl Into<String>, app_secret: impl Into<String>) {
        self.app_key = Some(app_key.into());
        self.app_secret = Some(app_secret.into());
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn app_key(&self) -> Option<&str> {
        self.app_key.as_deref()
    }

    pub fn auth_info(&self) -> &AuthenticationInfo {
        &self.auth_info
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Handle that aborts a pending code-fetch wait.
    ///
    /// A handle that has fired is replaced once the interrupted run returns,
    /// so fetch a new one before each authorization.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Authorize with the default OAuth2 client.
    ///
    /// `callback_url` is ignored when the channel's authentication settings
    /// carry their own.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] when app credentials are missing, and
    /// any error of [`authorize_with`](Self::authorize_with).
    pub async fn oauth2(&mut self, auth_url: &str, callback_url: &str) -> Result<()> {
        let (Some(app_key), Some(app_secret)) = (self.app_key.clone(), self.app_secret.clone())
        else {
            return Err(AuthError::Config(format!(
                "Channel '{}' has no app_key/app_secret",
                self.channel_name
            )));
        };

        let callback_url = self
            .auth_info
            .callback_url
            .clone()
            .unwrap_or_else(|| callback_url.to_string());

        let client = OAuth2Client::new(
            OAuth2Config {
                channel: self.channel_name.clone(),
                app_key,
                app_secret,
                auth_url: auth_url.to_string(),
                callback_url,
            },
            self.bridges.http_client.clone(),
            self.bridges.clock.clone(),
        );

        self.authorize_with(&client).await
    }

    /// Run the interactive flow against `provider` and keep the token in
    /// memory.
    #[instrument(skip(self, provider), fields(channel = %self.channel_name))]
    pub async fn authorize_with(&mut self, provider: &dyn AuthProvider) -> Result<()> {
        let mut flow = OAuth2Flow::new(
            self.channel_name.clone(),
            UrlRequestStrategy::from_bridges(self.auth_info.request_url.clone(), &self.bridges),
            CodeFetchStrategy::from_bridges(self.auth_info.fetch_code.clone(), &self.bridges)
                .with_policy(self.poll_policy)
                .with_cancellation(self.cancel.clone()),
        );

        let result = flow.run(provider).await;
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        self.token = result?;
        info!("Channel '{}' is authorized", self.channel_name);
        Ok(())
    }

    fn token_store(&self) -> TokenStore {
        TokenStore::new(
            self.channel_name.clone(),
            self.auth_info.save_token_file.clone(),
            self.bridges.clock.clone(),
        )
    }

    /// Persist the current token as selected by `save_token_file`.
    pub async fn save_token(&self) -> Result<()> {
        self.token_store().save(&self.token).await
    }

    /// Restore a saved, unexpired token.
    ///
    /// Returns `false` (leaving the current token alone) when persistence is
    /// disabled or no valid token was saved.
    pub async fn get_saved_token(&mut self) -> bool {
        match self.token_store().load().await {
            Some(token) => {
                self.token = token;
                info!("Read saved token for '{}' successfully", self.channel_name);
                true
            }
            None => false,
        }
    }

    /// Whether `token` (or the current token when `None`) has expired.
    pub fn is_expired(&self, token: Option<&Token>) -> bool {
        token
            .unwrap_or(&self.token)
            .is_expired_at(self.bridges.clock.unix_timestamp())
    }

    /// Whether the channel holds a token usable for API calls.
    pub fn is_authorized(&self) -> bool {
        !self.token.is_empty() && !self.is_expired(None)
    }

    /// `GET` a provider endpoint and decode the JSON reply.
    pub async fn http_get<K, V>(&self, base_url: &str, params: &[(K, V)]) -> Result<Value>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.http.get(base_url, params).await
    }

    /// `POST` form parameters to a provider endpoint and decode the JSON reply.
    pub async fn http_post<K, V>(&self, base_url: &str, params: &[(K, V)]) -> Result<Value>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.http.post(base_url, params).await
    }
}

impl fmt::Debug for SnsChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnsChannel")
            .field("channel_name", &self.channel_name)
            .field("platform", &self.platform)
            .field("app_key", &self.app_key)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[REDACTED]"))
            .field("auth_info", &self.auth_info)
            .field("token", &self.token)
            .finish()
    }
}
