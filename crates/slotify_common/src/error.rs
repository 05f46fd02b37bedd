// --- File: crates/slotify_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type for all Slotify errors.
///
/// This enum provides the error taxonomy shared across all crates. Each crate
/// can extend this by implementing From<SpecificError> for SlotifyError.
#[derive(Error, Debug)]
pub enum SlotifyError {
    /// A business, service or appointment could not be found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing required fields or an out-of-range selection
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An external integration (calendar, classifier, outbound send) failed
    #[error("Integration failure: {service_name} - {message}")]
    IntegrationFailure {
        service_name: String,
        message: String,
    },

    /// Two bookings raced for the same derived slot. The booking path does
    /// not currently detect this condition; the variant exists so callers
    /// that add a uniqueness check have a stable error to map to.
    #[error("Conflict risk: {0}")]
    ConflictRisk(String),

    /// Error occurred during a database operation
    #[error("Database error: {0}")]
    Database(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A trait for converting errors to HTTP status codes.
///
/// This trait can be implemented by error types to provide a consistent way
/// to convert errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for SlotifyError {
    fn status_code(&self) -> u16 {
        match self {
            SlotifyError::NotFound(_) => 404,
            SlotifyError::InvalidInput(_) => 400,
            SlotifyError::IntegrationFailure { .. } => 502,
            SlotifyError::ConflictRisk(_) => 409,
            SlotifyError::Database(_) => 500,
            SlotifyError::Internal(_) => 500,
        }
    }
}

/// A trait for adding context to errors.
///
/// This trait can be implemented by error types to provide a consistent way
/// to add context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, SlotifyError>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Adds context to an error with a lazy context provider.
    fn with_context<C, F>(self, f: F) -> Result<T, SlotifyError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, SlotifyError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| SlotifyError::Internal(format!("{}: {}", context, error)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, SlotifyError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| SlotifyError::Internal(format!("{}: {}", f(), error)))
    }
}

// Common error conversions
impl From<reqwest::Error> for SlotifyError {
    fn from(err: reqwest::Error) -> Self {
        SlotifyError::IntegrationFailure {
            service_name: "http".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SlotifyError {
    fn from(err: serde_json::Error) -> Self {
        SlotifyError::InvalidInput(err.to_string())
    }
}

// Utility functions for error construction
pub fn not_found<T: fmt::Display>(message: T) -> SlotifyError {
    SlotifyError::NotFound(message.to_string())
}

pub fn invalid_input<T: fmt::Display>(message: T) -> SlotifyError {
    SlotifyError::InvalidInput(message.to_string())
}

pub fn integration_failure<T: fmt::Display>(service_name: &str, message: T) -> SlotifyError {
    SlotifyError::IntegrationFailure {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> SlotifyError {
    SlotifyError::Internal(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(not_found("business").status_code(), 404);
        assert_eq!(invalid_input("slot").status_code(), 400);
        assert_eq!(integration_failure("calendar", "timeout").status_code(), 502);
        assert_eq!(
            SlotifyError::ConflictRisk("slot taken".into()).status_code(),
            409
        );
        assert_eq!(SlotifyError::Database("locked".into()).status_code(), 500);
    }

    #[test]
    fn context_wraps_into_internal() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
        let err = result.context("reading config").unwrap_err();
        assert!(matches!(err, SlotifyError::Internal(_)));
        assert!(err.to_string().contains("reading config"));
    }
}
