//! Error types for filemeta.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the stable error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::DuplicateKey(_) => "DUPLICATE_KEY",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether the caller caused this error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::DuplicateKey(_)
                | Self::InvalidTransition(_)
                | Self::Validation(_)
        )
    }

    /// Returns whether retrying the same call could succeed.
    ///
    /// This layer never retries on its own.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NotFound("x".into()).error_code(), "NOT_FOUND");
        assert_eq!(
            AppError::DuplicateKey("x".into()).error_code(),
            "DUPLICATE_KEY"
        );
        assert_eq!(
            AppError::InvalidTransition("x".into()).error_code(),
            "INVALID_TRANSITION"
        );
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let errors = [
            AppError::NotFound("file".into()),
            AppError::DuplicateKey("file".into()),
            AppError::InvalidTransition("file".into()),
            AppError::Validation("file".into()),
        ];
        for err in errors {
            assert!(err.is_client_error(), "{err} should be a client error");
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn test_database_error_is_retryable() {
        let err = AppError::Database("connection reset".into());
        assert!(err.is_retryable());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_display_includes_message() {
        let err = AppError::NotFound("FileRecord: 42".into());
        assert_eq!(err.to_string(), "Not found: FileRecord: 42");
    }
}
