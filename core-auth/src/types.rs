use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Fields whose values never appear in `Debug` output.
const REDACTED_FIELDS: &[&str] = &["access_token", "refresh_token", "code"];

/// OAuth2 token of one channel.
///
/// A token is an open set of named JSON fields. The flow guarantees `code`
/// (from the callback URL) plus whatever the provider's exchange returned,
/// which normally includes `access_token` and `expires_in`.
///
/// `expires_in` is an absolute Unix timestamp in seconds. A token without it
/// is always treated as expired.
///
/// # Security
///
/// The `Debug` implementation redacts credential fields.
///
/// # Examples
///
/// ```
/// use core_auth::Token;
///
/// let mut token = Token::from_pairs([("code", "42")]);
/// token.insert("expires_in", 2_000_000_000i64);
///
/// assert_eq!(token.code(), Some("42"));
/// assert!(!token.is_expired_at(1_700_000_000));
/// assert!(Token::new().is_expired_at(0));
/// ```
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(Map<String, Value>);

impl Token {
    /// Create an empty token
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a token from string key/value pairs, e.g. a parsed query string
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn code(&self) -> Option<&str> {
        self.get_str("code")
    }

    pub fn openid(&self) -> Option<&str> {
        self.get_str("openid")
    }

    pub fn access_token(&self) -> Option<&str> {
        self.get_str("access_token")
    }

    /// Absolute expiry as Unix seconds.
    ///
    /// Accepts integer, float (truncated toward negative infinity) and
    /// numeric-string encodings.
    pub fn expires_in(&self) -> Option<i64> {
        match self.0.get("expires_in")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().map(|f| f.floor() as i64)),
            _ => None,
        }
    }

    /// `true` when `expires_in` is missing or strictly before `now`.
    ///
    /// A token expiring exactly at `now` is still valid.
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_in() {
            Some(expires_in) => expires_in < now,
            None => true,
        }
    }

    /// Copy every field of `other` into `self`, overwriting duplicates.
    pub fn merge(&mut self, other: Token) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Token {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// Custom Debug implementation to avoid logging credentials
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.0 {
            if REDACTED_FIELDS.contains(&key.as_str()) {
                map.entry(key, &"[REDACTED]");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

/// Progress of one OAuth2 authorization run.
///
/// # State Transitions
///
/// ```text
/// Unauthenticated -> AwaitingCode -> Exchanging -> Authenticated
///                          |              |
///                          +----> AuthFailed <----+
/// ```
///
/// `AuthFailed` is terminal for the run; a new run starts over from
/// `Unauthenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FlowState {
    /// No authorization attempted yet
    #[default]
    Unauthenticated,
    /// Authorization URL delivered, waiting for the callback value
    AwaitingCode,
    /// Exchanging the authorization code for a token
    Exchanging,
    /// Token obtained
    Authenticated,
    /// The run ended without a token
    AuthFailed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Unauthenticated => write!(f, "Unauthenticated"),
            FlowState::AwaitingCode => write!(f, "Awaiting Code..."),
            FlowState::Exchanging => write!(f, "Exchanging Code..."),
            FlowState::Authenticated => write!(f, "Authenticated"),
            FlowState::AuthFailed => write!(f, "Authentication Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_expiring_at(value: Value) -> Token {
        let mut token = Token::new();
        token.insert("expires_in", value);
        token
    }

    #[test]
    fn test_token_from_pairs() {
        let token = Token::from_pairs([("code", "ABC"), ("openid", "XYZ")]);
        assert_eq!(token.code(), Some("ABC"));
        assert_eq!(token.openid(), Some("XYZ"));
        assert_eq!(token.access_token(), None);
    }

    #[test]
    fn test_expiry_boundary_is_not_expired() {
        let token = token_expiring_at(json!(1_000));
        assert!(!token.is_expired_at(999));
        assert!(!token.is_expired_at(1_000));
        assert!(token.is_expired_at(1_001));
    }

    #[test]
    fn test_expiry_accepts_float_and_string() {
        let token = token_expiring_at(json!(1_000.75));
        assert_eq!(token.expires_in(), Some(1_000));
        assert!(!token.is_expired_at(1_000));
        assert!(token.is_expired_at(1_001));

        let token = token_expiring_at(json!("1500"));
        assert_eq!(token.expires_in(), Some(1_500));
    }

    #[test]
    fn test_missing_or_invalid_expiry_counts_as_expired() {
        assert!(Token::new().is_expired_at(0));
        assert!(token_expiring_at(json!(null)).is_expired_at(0));
        assert!(token_expiring_at(json!("soon")).is_expired_at(0));
    }

    #[test]
    fn test_merge_overwrites_duplicates() {
        let mut token = Token::from_pairs([("code", "42"), ("uid", "old")]);
        let mut exchanged = Token::new();
        exchanged.insert("access_token", "2.00abc");
        exchanged.insert("uid", "new");

        token.merge(exchanged);

        assert_eq!(token.code(), Some("42"));
        assert_eq!(token.access_token(), Some("2.00abc"));
        assert_eq!(token.get_str("uid"), Some("new"));
    }

    #[test]
    fn test_token_serializes_as_flat_object() {
        let mut token = Token::from_pairs([("code", "42")]);
        token.insert("expires_in", 1_700_000_000i64);

        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json, json!({"code": "42", "expires_in": 1_700_000_000i64}));

        let back: Token = serde_json::from_value(json).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn test_token_debug_redacts() {
        let mut token = Token::from_pairs([("code", "secret_code")]);
        token.insert("access_token", "secret_access");
        token.insert("uid", "12345");

        let debug = format!("{:?}", token);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret_code"));
        assert!(!debug.contains("secret_access"));
        assert!(debug.contains("12345"));
    }

    #[test]
    fn test_flow_state_default_and_display() {
        assert_eq!(FlowState::default(), FlowState::Unauthenticated);
        assert_eq!(format!("{}", FlowState::AwaitingCode), "Awaiting Code...");
        assert_eq!(format!("{}", FlowState::AuthFailed), "Authentication Failed");
    }
}
