//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `UrlLauncher` using the `open` crate
//! - `ConsolePrompt` over tokio stdin/stdout
//! - `CommandRunner` using `tokio::process`
//!
//! ## Feature Flags
//!
//! - `browser`: Enable the system browser launcher (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, ShellCommandRunner};
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new());
//! let runner = Arc::new(ShellCommandRunner::new());
//! // Hand both to PlatformBridges::builder()
//! ```

#[cfg(feature = "browser")]
mod browser;
mod console;
mod http;
mod process;

#[cfg(feature = "browser")]
pub use browser::SystemBrowser;
pub use console::StdinConsole;
pub use http::ReqwestHttpClient;
pub use process::ShellCommandRunner;
