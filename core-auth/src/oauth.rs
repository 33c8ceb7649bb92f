//! OAuth2 authorization code flow
//!
//! [`OAuth2Flow`] drives one interactive authorization:
//!
//! 1. ask the [`AuthProvider`] for the authorization URL
//! 2. hand it to the user through the [`UrlRequestStrategy`]
//! 3. wait for the redirected callback URL through the [`CodeFetchStrategy`]
//! 4. parse `code` out of the callback and exchange it exactly once
//!
//! The token returned is the callback's query fields merged with the
//! exchange response. The flow never persists anything; that is left to the
//! caller.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::OAuth2Flow;
//! use core_auth::strategy::{CodeFetchStrategy, UrlRequestStrategy};
//! use core_auth::provider::AuthProvider;
//! use core_runtime::config::{CommandStrategy, PlatformBridges};
//!
//! # async fn example(bridges: PlatformBridges, provider: &dyn AuthProvider) -> core_auth::Result<()> {
//! let mut flow = OAuth2Flow::new(
//!     "my_weibo",
//!     UrlRequestStrategy::from_bridges(CommandStrategy::BuiltIn, &bridges),
//!     CodeFetchStrategy::from_bridges(CommandStrategy::BuiltIn, &bridges),
//! );
//!
//! let token = flow.run(provider).await?;
//! println!("authorized until {:?}", token.expires_in());
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::provider::AuthProvider;
use crate::strategy::{CodeFetchStrategy, FetchedCode, UrlRequestStrategy};
use crate::types::{FlowState, Token};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Parse the query string of a callback URL into a token.
///
/// Pairs with empty values are dropped; a repeated key keeps its last value.
/// Input that is not an absolute URL is split at the first `?`.
///
/// ```
/// let token = core_auth::oauth::parse_code("http://cb?code=ABC&openid=XYZ");
/// assert_eq!(token.code(), Some("ABC"));
/// assert_eq!(token.openid(), Some("XYZ"));
/// ```
pub fn parse_code(url: &str) -> Token {
    let query = match Url::parse(url) {
        Ok(parsed) => parsed.query().unwrap_or_default().to_string(),
        Err(_) => url
            .split_once('?')
            .map(|(_, query)| query.split('#').next().unwrap_or_default())
            .unwrap_or_default()
            .to_string(),
    };

    Token::from_pairs(
        url::form_urlencoded::parse(query.as_bytes())
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.into_owned(), value.into_owned())),
    )
}

/// Interactive OAuth2 authorization for one channel.
pub struct OAuth2Flow {
    channel: String,
    url_request: UrlRequestStrategy,
    code_fetch: CodeFetchStrategy,
    state: FlowState,
}

impl OAuth2Flow {
    pub fn new(
        channel: impl Into<String>,
        url_request: UrlRequestStrategy,
        code_fetch: CodeFetchStrategy,
    ) -> Self {
        Self {
            channel: channel.into(),
            url_request,
            code_fetch,
            state: FlowState::Unauthenticated,
        }
    }

    /// State reached by the last (or current) run.
    pub fn state(&self) -> FlowState {
        self.state
    }

    fn failed(&self, reason: impl Into<String>) -> AuthError {
        AuthError::AuthenticationFailed {
            channel: self.channel.clone(),
            reason: reason.into(),
        }
    }

    /// Run the whole flow, starting over from `Unauthenticated`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthenticationFailed`] when no callback value
    /// arrives, the callback carries no `code` or the exchange fails.
    /// Errors building the authorization URL are returned unchanged.
    #[instrument(skip(self, provider), fields(channel = %self.channel))]
    pub async fn run(&mut self, provider: &dyn AuthProvider) -> Result<Token> {
        info!("Try to authenticate '{}' using OAuth2", self.channel);
        self.state = FlowState::Unauthenticated;

        let result = self.authorize(provider).await;
        self.state = match &result {
            Ok(_) => FlowState::Authenticated,
            Err(e) => {
                warn!(error = %e, "Authorization failed");
                FlowState::AuthFailed
            }
        };
        result
    }

    async fn authorize(&mut self, provider: &dyn AuthProvider) -> Result<Token> {
        let url = provider.authorize_url()?;

        self.state = FlowState::AwaitingCode;
        let requested_at = self.url_request.request(&url).await;

        let callback = match self.code_fetch.fetch(requested_at).await {
            FetchedCode::Code(callback) => callback,
            FetchedCode::Unavailable => {
                return Err(self.failed("no authorization code was received"));
            }
        };

        self.state = FlowState::Exchanging;
        let mut token = parse_code(&callback);
        let code = match token.code() {
            Some(code) => code.to_string(),
            None => return Err(self.failed("callback URL does not contain a code")),
        };

        let exchanged = provider.exchange_code(&code).await.map_err(|e| match e {
            AuthError::AuthenticationFailed { .. } => e,
            other => self.failed(other.to_string()),
        })?;
        token.merge(exchanged);

        debug!(token = ?token, "Authorized");
        Ok(token)
    }
}
