//! # Host Bridge Traits
//!
//! Platform abstraction traits that the SNS core consumes and each host
//! platform implements.
//!
//! ## Overview
//!
//! The core never touches the network, the browser, the terminal or child
//! processes directly. Each side effect is expressed as a trait here so the
//! authorization flow can be driven by desktop defaults, by a host
//! application, or by test doubles.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-shot async HTTP requests
//!
//! ### User Interaction
//! - [`UrlLauncher`](interaction::UrlLauncher) - Show the authorization URL
//! - [`ConsolePrompt`](interaction::ConsolePrompt) - Read the callback URL back
//! - [`CommandRunner`](process::CommandRunner) - Delegate either step to a shell command
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic expiry checks
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should convert platform errors into it and keep the
//! original message as context.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a channel can be moved across
//! tokio tasks.

pub mod error;
pub mod http;
pub mod interaction;
pub mod process;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use interaction::{ConsolePrompt, UrlLauncher};
pub use process::{CommandOutput, CommandRunner};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
