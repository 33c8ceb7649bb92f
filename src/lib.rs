//! Workspace facade crate.
//!
//! Re-exports the workspace crates so plugins can depend on `sns-workspace`
//! alone. The `desktop-shims` feature (default) pulls in the desktop bridge
//! implementations and lets `PlatformBridges` fill in missing capabilities.

pub use bridge_traits;
pub use core_auth;
pub use core_runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;
