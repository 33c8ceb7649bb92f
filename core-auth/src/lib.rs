//! # Authentication Module
//!
//! OAuth2 authorization, token persistence and HTTP helpers shared by every
//! SNS platform plugin.
//!
//! ## Overview
//!
//! A plugin holds one [`SnsChannel`] per configured account. The channel
//! runs the interactive [`OAuth2Flow`](oauth::OAuth2Flow): the authorization
//! URL is shown to the user, the redirected callback URL is collected, and its
//! `code` is exchanged for a token by an [`AuthProvider`]. The token can be
//! saved to disk and restored on the next start while it has not expired.
//!
//! ## Features
//!
//! - Built-in or external-command URL delivery and code collection
//! - Bounded, cancellable polling of external code-fetch commands
//! - Pluggable protocol clients with a default OAuth2 implementation
//! - File-backed token persistence with expiry checks
//! - JSON GET/POST helpers for provider APIs

pub mod channel;
pub mod error;
pub mod http;
pub mod oauth;
pub mod provider;
pub mod strategy;
pub mod token_store;
pub mod types;

pub use channel::SnsChannel;
pub use error::{AuthError, Result};
pub use http::HttpHelpers;
pub use oauth::{parse_code, OAuth2Flow};
pub use provider::{AuthProvider, OAuth2Client, OAuth2Config};
pub use strategy::{CodeFetchStrategy, FetchedCode, PollPolicy, UrlRequestStrategy};
pub use token_store::TokenStore;
pub use types::{FlowState, Token};
