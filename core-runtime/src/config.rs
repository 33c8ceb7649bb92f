//! # Channel Configuration Module
//!
//! Provides configuration management for SNS channels.
//!
//! ## Overview
//!
//! A channel file is a JSON array; each entry describes one configured
//! connection to a provider account:
//!
//! ```json
//! [
//!   {
//!     "channel_name": "my_weibo",
//!     "platform": "SinaWeiboStatus",
//!     "open": "yes",
//!     "app_key": "1234",
//!     "app_secret": "abcd",
//!     "auth_info": {
//!       "callback_url": "http://snsapi.sinaapp.com/",
//!       "cmd_fetch_code": "(built-in)",
//!       "cmd_request_url": "(built-in)",
//!       "save_token_file": "(built-in)"
//!     }
//!   }
//! ]
//! ```
//!
//! Selector strings in `auth_info` are resolved into [`CommandStrategy`] and
//! [`TokenFile`] when the file is parsed. Missing selectors default to the
//! built-in behavior.
//!
//! The second half of this module wires host capabilities together into
//! [`PlatformBridges`], failing fast with an actionable error when a
//! capability is missing.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{load_channels, PlatformBridges};
//!
//! let channels = load_channels("conf/channel.json")?;
//! let bridges = PlatformBridges::builder().build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, CommandRunner, ConsolePrompt, HttpClient, SystemClock, UrlLauncher};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Selector value meaning "use the in-process default implementation".
pub const BUILT_IN: &str = "(built-in)";

/// Selector value meaning "intentionally absent".
pub const NULL_SENTINEL: &str = "(null)";

/// How one pluggable authorization step is carried out.
///
/// Parsed from the `cmd_fetch_code` / `cmd_request_url` selectors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandStrategy {
    /// In-process default (browser / console)
    #[default]
    BuiltIn,
    /// Shell command template; arguments are appended by the caller
    External(String),
}

impl CommandStrategy {
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        if selector == BUILT_IN {
            Self::BuiltIn
        } else {
            Self::External(selector.to_string())
        }
    }

    /// Selector string as written in the channel file.
    pub fn as_selector(&self) -> &str {
        match self {
            Self::BuiltIn => BUILT_IN,
            Self::External(command) => command,
        }
    }

    pub fn is_built_in(&self) -> bool {
        matches!(self, Self::BuiltIn)
    }
}

impl From<String> for CommandStrategy {
    fn from(selector: String) -> Self {
        Self::parse(&selector)
    }
}

impl From<CommandStrategy> for String {
    fn from(strategy: CommandStrategy) -> Self {
        strategy.as_selector().to_string()
    }
}

/// Where a channel's token is persisted.
///
/// Parsed from the `save_token_file` selector.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TokenFile {
    /// `"{channel_name}.token.save"` in the working directory
    #[default]
    BuiltIn,
    /// Persistence switched off
    Disabled,
    /// Explicit path
    Path(PathBuf),
}

impl TokenFile {
    pub fn parse(selector: &str) -> Self {
        match selector.trim() {
            BUILT_IN => Self::BuiltIn,
            NULL_SENTINEL => Self::Disabled,
            path => Self::Path(PathBuf::from(path)),
        }
    }

    /// Selector string as written in the channel file.
    pub fn as_selector(&self) -> String {
        match self {
            Self::BuiltIn => BUILT_IN.to_string(),
            Self::Disabled => NULL_SENTINEL.to_string(),
            Self::Path(path) => path.to_string_lossy().into_owned(),
        }
    }

    /// Resolve the file for `channel_name`, or `None` when disabled.
    pub fn resolve(&self, channel_name: &str) -> Option<PathBuf> {
        match self {
            Self::BuiltIn => Some(PathBuf::from(format!("{}.token.save", channel_name))),
            Self::Disabled => None,
            Self::Path(path) => Some(path.clone()),
        }
    }
}

impl From<String> for TokenFile {
    fn from(selector: String) -> Self {
        Self::parse(&selector)
    }
}

impl From<TokenFile> for String {
    fn from(file: TokenFile) -> Self {
        file.as_selector()
    }
}

/// Per-channel authentication settings.
///
/// Immutable once a channel has read it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationInfo {
    /// Overrides the plugin's callback URL when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,

    /// How the callback value is collected
    #[serde(default, rename = "cmd_fetch_code")]
    pub fetch_code: CommandStrategy,

    /// How the authorization URL is shown to the user
    #[serde(default, rename = "cmd_request_url")]
    pub request_url: CommandStrategy,

    /// Where the token is persisted
    #[serde(default)]
    pub save_token_file: TokenFile,

    /// Account name for plugins that automate the provider's login page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_password: Option<String>,
}

impl AuthenticationInfo {
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn with_fetch_code(mut self, strategy: CommandStrategy) -> Self {
        self.fetch_code = strategy;
        self
    }

    pub fn with_request_url(mut self, strategy: CommandStrategy) -> Self {
        self.request_url = strategy;
        self
    }

    pub fn with_token_file(mut self, file: TokenFile) -> Self {
        self.save_token_file = file;
        self
    }
}

impl fmt::Debug for AuthenticationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationInfo")
            .field("callback_url", &self.callback_url)
            .field("fetch_code", &self.fetch_code)
            .field("request_url", &self.request_url)
            .field("save_token_file", &self.save_token_file)
            .field("login_username", &self.login_username)
            .field(
                "login_password",
                &self.login_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// One entry of a channel file.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel_name: String,
    pub platform: String,

    /// `"yes"` / `"no"`; a missing value counts as open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_info: Option<AuthenticationInfo>,

    /// Provider-specific keys, passed through untouched for plugins
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChannelConfig {
    pub fn new(channel_name: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            platform: platform.into(),
            open: None,
            app_key: None,
            app_secret: None,
            auth_info: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_app(mut self, app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        self.app_key = Some(app_key.into());
        self.app_secret = Some(app_secret.into());
        self
    }

    pub fn with_auth_info(mut self, auth_info: AuthenticationInfo) -> Self {
        self.auth_info = Some(auth_info);
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
            .as_deref()
            .map_or(true, |open| open.eq_ignore_ascii_case("yes"))
    }
}

impl fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("channel_name", &self.channel_name)
            .field("platform", &self.platform)
            .field("open", &self.open)
            .field("app_key", &self.app_key)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[REDACTED]"))
            .field("auth_info", &self.auth_info)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Parse a channel file's contents.
///
/// # Errors
///
/// Returns [`Error::Config`] for malformed JSON, an empty channel name or a
/// channel name used twice.
pub fn parse_channels(json: &str) -> Result<Vec<ChannelConfig>> {
    let channels: Vec<ChannelConfig> = serde_json::from_str(json)
        .map_err(|e| Error::Config(format!("Invalid channel file: {}", e)))?;

    let mut seen = HashSet::new();
    for channel in &channels {
        if channel.channel_name.trim().is_empty() {
            return Err(Error::Config("Channel name cannot be empty".to_string()));
        }
        if !seen.insert(channel.channel_name.as_str()) {
            return Err(Error::Config(format!(
                "Duplicate channel name '{}'",
                channel.channel_name
            )));
        }
    }

    Ok(channels)
}

/// Read and parse a channel file from disk.
pub fn load_channels(path: impl AsRef<Path>) -> Result<Vec<ChannelConfig>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let channels = parse_channels(&contents)?;

    tracing::debug!(count = channels.len(), "Loaded channel configuration");
    Ok(channels)
}

/// Host capabilities a channel needs.
///
/// Use [`PlatformBridges::builder`] to construct instances.
#[derive(Clone)]
pub struct PlatformBridges {
    /// HTTP transport for token exchange and API helpers
    pub http_client: Arc<dyn HttpClient>,
    /// Built-in URL delivery
    pub url_launcher: Arc<dyn UrlLauncher>,
    /// Built-in code collection
    pub console: Arc<dyn ConsolePrompt>,
    /// External-command strategies
    pub command_runner: Arc<dyn CommandRunner>,
    /// Time source for expiry checks and request timestamps
    pub clock: Arc<dyn Clock>,
}

impl fmt::Debug for PlatformBridges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformBridges")
            .field("http_client", &"HttpClient { ... }")
            .field("url_launcher", &"UrlLauncher { ... }")
            .field("console", &"ConsolePrompt { ... }")
            .field("command_runner", &"CommandRunner { ... }")
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

impl PlatformBridges {
    /// Creates a new builder for constructing `PlatformBridges`.
    pub fn builder() -> PlatformBridgesBuilder {
        PlatformBridgesBuilder::default()
    }
}

fn capability_missing(capability: &str, desktop_default: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "No {} implementation provided. \
             Desktop: enable the 'desktop-shims' feature to use {}. \
             Otherwise inject a host implementation through PlatformBridges::builder().",
            capability, desktop_default
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(bridge_desktop::ReqwestHttpClient::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing("HttpClient", "ReqwestHttpClient"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_url_launcher() -> Result<Arc<dyn UrlLauncher>> {
    Ok(Arc::new(bridge_desktop::SystemBrowser::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_url_launcher() -> Result<Arc<dyn UrlLauncher>> {
    Err(capability_missing("UrlLauncher", "SystemBrowser"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_console() -> Result<Arc<dyn ConsolePrompt>> {
    Ok(Arc::new(bridge_desktop::StdinConsole::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_console() -> Result<Arc<dyn ConsolePrompt>> {
    Err(capability_missing("ConsolePrompt", "StdinConsole"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_command_runner() -> Result<Arc<dyn CommandRunner>> {
    Ok(Arc::new(bridge_desktop::ShellCommandRunner::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_command_runner() -> Result<Arc<dyn CommandRunner>> {
    Err(capability_missing("CommandRunner", "ShellCommandRunner"))
}

/// Builder for [`PlatformBridges`].
#[derive(Default)]
pub struct PlatformBridgesBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    url_launcher: Option<Arc<dyn UrlLauncher>>,
    console: Option<Arc<dyn ConsolePrompt>>,
    command_runner: Option<Arc<dyn CommandRunner>>,
    clock: Option<Arc<dyn Clock>>,
}

impl PlatformBridgesBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn url_launcher(mut self, launcher: Arc<dyn UrlLauncher>) -> Self {
        self.url_launcher = Some(launcher);
        self
    }

    pub fn console(mut self, console: Arc<dyn ConsolePrompt>) -> Self {
        self.console = Some(console);
        self
    }

    pub fn command_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.command_runner = Some(runner);
        self
    }

    /// Sets the time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the bridge set, filling gaps with desktop defaults when the
    /// `desktop-shims` feature is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] for the first capability that
    /// has neither an injected nor a default implementation.
    pub fn build(self) -> Result<PlatformBridges> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let url_launcher = match self.url_launcher {
            Some(launcher) => launcher,
            None => provide_default_url_launcher()?,
        };

        let console = match self.console {
            Some(console) => console,
            None => provide_default_console()?,
        };

        let command_runner = match self.command_runner {
            Some(runner) => runner,
            None => provide_default_command_runner()?,
        };

        Ok(PlatformBridges {
            http_client,
            url_launcher,
            console,
            command_runner,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}
