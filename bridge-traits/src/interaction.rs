//! User Interaction Abstractions
//!
//! Capabilities the authorization flow needs to reach the person at the
//! keyboard: showing them a URL and reading back what the provider
//! redirected them to.

use async_trait::async_trait;

use crate::error::Result;

/// Opens a URL for the user, typically in the default web browser.
///
/// Implementations must return as soon as the URL has been handed off;
/// they never wait for the user to finish with the page.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::interaction::UrlLauncher;
///
/// fn show(launcher: &dyn UrlLauncher) {
///     launcher.open_url("https://api.example.com/oauth2/authorize?client_id=1").ok();
/// }
/// ```
pub trait UrlLauncher: Send + Sync {
    fn open_url(&self, url: &str) -> Result<()>;
}

/// Line-oriented console prompt.
#[async_trait]
pub trait ConsolePrompt: Send + Sync {
    /// Print `message` and wait for one line of input.
    ///
    /// The returned line has its trailing newline removed.
    async fn prompt_line(&self, message: &str) -> Result<String>;
}
