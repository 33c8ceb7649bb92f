use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Channel '{channel}' authentication failed: {reason}")]
    AuthenticationFailed { channel: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to persist token: {0}")]
    TokenPersistence(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),
}

pub type Result<T> = std::result::Result<T, AuthError>;
