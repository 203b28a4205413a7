//! Error types for the cardwatch service

/// Errors that can occur in the cardwatch service
#[derive(Debug, thiserror::Error)]
pub enum CardwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No card with id '{0}'")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for cardwatch operations
pub type Result<T> = std::result::Result<T, CardwatchError>;

/// Classified outcome of a failed backend fetch.
///
/// The Display form is the short user-facing message attached to a card;
/// the next poll may recover, so none of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {code} from backend: {snippet}")]
    HttpStatus { code: u16, snippet: String },

    #[error("Non-JSON response: {snippet}")]
    InvalidContentType { snippet: String },

    #[error("Backend unreachable: {0}")]
    NetworkUnreachable(String),
}
