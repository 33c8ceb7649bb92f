//! File-backed token persistence
//!
//! A channel's token is written as a flat JSON object to the file its
//! [`TokenFile`] selector names, and read back on the next start so the
//! interactive flow can be skipped while the token is still valid.
//!
//! ## Behavior
//!
//! - `(built-in)` stores to `"{channel_name}.token.save"` in the working directory
//! - `(null)` turns persistence off: saving succeeds without touching disk
//!   and loading never opens a file
//! - Anything unusable on load (missing, unreadable, corrupt or expired)
//!   reads as "no saved token"
//!
//! Tokens are stored in plain text; encrypting the file is not done yet.
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{Token, TokenStore};
//! use core_runtime::config::TokenFile;
//! use bridge_traits::SystemClock;
//! use std::sync::Arc;
//!
//! # async fn example(token: Token) -> core_auth::Result<()> {
//! let store = TokenStore::new("my_weibo", TokenFile::BuiltIn, Arc::new(SystemClock));
//! store.save(&token).await?;
//!
//! if let Some(saved) = store.load().await {
//!     println!("restored token expiring at {:?}", saved.expires_in());
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::Token;
use bridge_traits::Clock;
use core_runtime::config::TokenFile;
use core_runtime::logging::strip_path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persists one channel's token.
#[derive(Clone)]
pub struct TokenStore {
    channel_name: String,
    file: TokenFile,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    pub fn new(channel_name: impl Into<String>, file: TokenFile, clock: Arc<dyn Clock>) -> Self {
        Self {
            channel_name: channel_name.into(),
            file,
            clock,
        }
    }

    /// File backing this store, or `None` when persistence is disabled.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        self.file.resolve(&self.channel_name)
    }

    /// Overwrite the token file with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenPersistence`] if the token cannot be
    /// serialized or the file cannot be written.
    pub async fn save(&self, token: &Token) -> Result<()> {
        let Some(path) = self.resolve_path() else {
            debug!(channel = %self.channel_name, "Token persistence disabled, not saving");
            return Ok(());
        };

        let json = serde_json::to_vec(token)
            .map_err(|e| AuthError::TokenPersistence(format!("Failed to serialize token: {}", e)))?;

        tokio::fs::write(&path, json).await.map_err(|e| {
            warn!(
                channel = %self.channel_name,
                file = %strip_path(&path.to_string_lossy()),
                error = %e,
                "Failed to save token"
            );
            AuthError::TokenPersistence(format!("{}: {}", path.display(), e))
        })?;

        info!(
            channel = %self.channel_name,
            file = %strip_path(&path.to_string_lossy()),
            "Token saved"
        );
        Ok(())
    }

    /// Read back a previously saved, still valid token.
    pub async fn load(&self) -> Option<Token> {
        let Some(path) = self.resolve_path() else {
            debug!(
                channel = %self.channel_name,
                "This channel is configured not to save token to file"
            );
            return None;
        };
        let file = strip_path(&path.to_string_lossy()).to_string();

        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) => {
                debug!(channel = %self.channel_name, file = %file, error = %e, "No saved token");
                return None;
            }
        };

        let token: Token = match serde_json::from_slice(&contents) {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    channel = %self.channel_name,
                    file = %file,
                    error = %e,
                    "Saved token is corrupt, ignoring it"
                );
                return None;
            }
        };

        if self.is_expired(&token) {
            debug!(channel = %self.channel_name, "Saved token is expired");
            return None;
        }

        debug!(channel = %self.channel_name, file = %file, "Loaded saved token");
        Some(token)
    }

    /// `true` when the token's `expires_in` is missing or before now.
    pub fn is_expired(&self, token: &Token) -> bool {
        token.is_expired_at(self.clock.unix_timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::FixedClock;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000;

    fn token_expiring_at(expires_in: i64) -> Token {
        let mut token = Token::from_pairs([("code", "42"), ("access_token", "2.00abc")]);
        token.insert("expires_in", expires_in);
        token
    }

    fn store_in(dir: &TempDir, file_name: &str) -> TokenStore {
        TokenStore::new(
            "weibo",
            TokenFile::Path(dir.path().join(file_name)),
            Arc::new(FixedClock::at_unix(NOW)),
        )
    }

    #[test]
    fn test_resolve_path() {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at_unix(NOW));

        let builtin = TokenStore::new("weibo", TokenFile::BuiltIn, clock.clone());
        assert_eq!(builtin.resolve_path(), Some(PathBuf::from("weibo.token.save")));

        let disabled = TokenStore::new("weibo", TokenFile::Disabled, clock.clone());
        assert_eq!(disabled.resolve_path(), None);

        let explicit = TokenStore::new("weibo", TokenFile::Path("/tmp/w.json".into()), clock);
        assert_eq!(explicit.resolve_path(), Some(PathBuf::from("/tmp/w.json")));
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "weibo.token.save");
        let token = token_expiring_at(NOW + 3600);

        store.save(&token).await.unwrap();
        let loaded = store.load().await.expect("token should load");

        assert_eq!(loaded, token);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "weibo.token.save");

        store.save(&token_expiring_at(NOW + 10)).await.unwrap();
        store.save(&token_expiring_at(NOW + 20)).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.expires_in(), Some(NOW + 20));
    }

    #[tokio::test]
    async fn test_disabled_store_never_touches_disk() {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at_unix(NOW));
        let channel = "disabled_store_weibo";
        let store = TokenStore::new(channel, TokenFile::Disabled, clock.clone());

        // Where the same channel would land with the built-in file name
        let builtin_path = TokenStore::new(channel, TokenFile::BuiltIn, clock)
            .resolve_path()
            .unwrap();
        assert!(!builtin_path.exists());

        assert_eq!(store.resolve_path(), None);
        store.save(&token_expiring_at(NOW + 3600)).await.unwrap();

        assert!(!builtin_path.exists());
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "absent.token.save");

        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "weibo.token.save");

        store.save(&token_expiring_at(NOW - 1)).await.unwrap();
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_token_expiring_now_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "weibo.token.save");

        store.save(&token_expiring_at(NOW)).await.unwrap();
        assert!(store.load().await.is_some());
    }

    #[tokio::test]
    async fn test_token_without_expiry_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weibo.token.save");
        std::fs::write(&path, r#"{"code": "42"}"#).unwrap();

        let store = store_in(&dir, "weibo.token.save");
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weibo.token.save");
        std::fs::write(&path, r#"{"code": "42", "expires_in": 17"#).unwrap();

        let store = store_in(&dir, "weibo.token.save");
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(
            "weibo",
            TokenFile::Path(dir.path().join("missing").join("weibo.token.save")),
            Arc::new(FixedClock::at_unix(NOW)),
        );

        let err = store.save(&token_expiring_at(NOW)).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenPersistence(_)));
    }

    #[test]
    fn test_is_expired_uses_clock() {
        let store = TokenStore::new(
            "weibo",
            TokenFile::Disabled,
            Arc::new(FixedClock::at_unix(NOW)),
        );

        assert!(!store.is_expired(&token_expiring_at(NOW + 1)));
        assert!(!store.is_expired(&token_expiring_at(NOW)));
        assert!(store.is_expired(&token_expiring_at(NOW - 1)));
        assert!(store.is_expired(&Token::new()));
    }
}
