//! Error types shared by the fetchers, the config layer and the engine.
//!
//! Fetch errors are always recovered inside the control loop (the failing
//! source just contributes nothing that cycle).  Config errors are surfaced
//! to whoever called `apply_config`.

use thiserror::Error;

/// Total failure of one source fetch.
///
/// Partial failures (one story that will not decode, one subreddit that
/// times out) never become a `FetchError`; fetchers skip them and log.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, timeout or a non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// Missing or rejected credentials for the source.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The payload could not be decoded at all.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return FetchError::Decode(err.to_string());
        }
        match err.status() {
            Some(status) if status == 401 || status == 403 => FetchError::Auth(err.to_string()),
            _ => FetchError::Transport(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid identity {handle:?} for {source_name}: only letters, digits and '_' are allowed")]
    InvalidIdentity { source_name: String, handle: String },

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("engine control loop has stopped")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_identity_message_names_handle() {
        let err = ConfigError::InvalidIdentity {
            source_name: "reddit".into(),
            handle: "rust lang".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"rust lang\""));
        assert!(msg.contains("reddit"));
    }

    #[test]
    fn engine_error_is_transparent_over_config() {
        let err: EngineError = ConfigError::InvalidIdentity {
            source_name: "social feed".into(),
            handle: "a,b".into(),
        }
        .into();
        assert!(err.to_string().starts_with("invalid identity"));
    }
}
