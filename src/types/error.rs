//! Error types for Vestibule
//!
//! One enum covers configuration, connection and request-boundary failures.
//! Every variant carries a plain message so a single outcome can be cloned
//! out to every caller waiting on a shared connection attempt.

/// Main error type for Vestibule operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VestibuleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VestibuleError {
    /// Whether a caller may simply retry the failed operation.
    ///
    /// Only connection failures qualify; configuration errors are fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Whether the process should refuse to start or serve
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<mongodb::error::Error> for VestibuleError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for VestibuleError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

/// Result type alias for Vestibule operations
pub type Result<T> = std::result::Result<T, VestibuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connection_errors_are_retryable() {
        assert!(VestibuleError::Connection("timed out".into()).is_retryable());
        assert!(!VestibuleError::Config("MONGODB_URI".into()).is_retryable());
        assert!(!VestibuleError::Database("dup key".into()).is_retryable());
    }

    #[test]
    fn test_config_is_fatal() {
        assert!(VestibuleError::Config("missing".into()).is_fatal());
        assert!(!VestibuleError::Connection("refused".into()).is_fatal());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = VestibuleError::Connection("server selection timed out".into());
        assert_eq!(err.to_string(), "Connection error: server selection timed out");
    }

    #[test]
    fn test_json_error_maps_to_bad_request() {
        let err: VestibuleError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, VestibuleError::BadRequest(_)));
    }
}
