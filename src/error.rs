//! Privacore error types

use thiserror::Error;

/// Privacore error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input or state transition rejected
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backing store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cryptographic error
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// True when the error denotes a missing entity rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias for Privacore operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("unmasking request req-123".to_string());
        assert_eq!(err.to_string(), "Not found: unmasking request req-123");
        assert!(err.is_not_found());

        let err = Error::Validation("request is not pending".to_string());
        assert!(err.to_string().contains("Validation"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
