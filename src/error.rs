use thiserror::Error;

/// Every failure the engine, the HTTP client and the override path can report.
#[derive(Debug, Error)]
pub enum EvohomeError {
    /// No usable access token: login or refresh was rejected, or the service
    /// kept answering 401/403 after a forced refresh.
    #[error("auth error: {0}")]
    Auth(String),

    /// Non-success HTTP status (`status` set) or transport failure (`status` unset).
    #[error("remote error{}: {message}", .status.map(|s| format!(" (http {s})")).unwrap_or_default())]
    Remote { status: Option<u16>, message: String },

    /// Payload did not match the expected snapshot shape.
    #[error("decode error at `{path}`: {message}")]
    Decode { path: String, message: String },

    /// The installation tree has no control system at the requested position.
    #[error("not initialized: {0}")]
    NotInitialized(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl EvohomeError {
    pub fn transport(message: impl Into<String>) -> Self {
        EvohomeError::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// A caller may fix this by re-authenticating.
    pub fn is_auth(&self) -> bool {
        matches!(self, EvohomeError::Auth(_))
    }

    /// Worth waiting out with backoff rather than reporting as a data problem.
    pub fn is_transient(&self) -> bool {
        match self {
            EvohomeError::Remote { status: None, .. } => true,
            EvohomeError::Remote { status: Some(s), .. } => *s == 429 || *s >= 500,
            _ => false,
        }
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for EvohomeError {
    fn from(value: serde_path_to_error::Error<serde_json::Error>) -> Self {
        EvohomeError::Decode {
            path: value.path().to_string(),
            message: value.into_inner().to_string(),
        }
    }
}

pub type Result<T, E = EvohomeError> = std::result::Result<T, E>;
