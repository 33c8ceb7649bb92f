//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the SNS core:
//! - Logging and tracing infrastructure
//! - Channel configuration and authentication selectors
//! - Host bridge wiring
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that `core-auth` and plugins
//! depend on. It resolves configuration once, at load time, into typed
//! values so the authorization flow never string-compares selectors.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
