//! Error types for smsview.
//!
//! This module defines the error taxonomy using `thiserror`. Errors compose via `?`
//! and `From` conversions.
//!
//! # Error Hierarchy
//!
//! - [`AppError`] - Top-level error returned by the binary
//!   - [`ConfigError`] - config file unreadable or invalid
//!   - [`LoggingError`] - tracing subscriber could not be installed
//!   - [`PrefsError`] - expanded-message preference file unreadable
//!   - [`FetchError`] - network/HTTP failure talking to the backend
//!     - [`AuthError`] - session could not be authenticated or refreshed
//!
//! # Recovery Strategy
//!
//! Only the network/auth layer produces errors that reach the presentation layer.
//! The message store, conversation cache and switcher never fail on data-shape
//! anomalies: unknown ids are logged and skipped.
//!
//! - **Fetch failures** are recoverable: the pagination state machine returns to idle,
//!   the error is shown on a dismissable banner and the last-good message list is kept.
//!   Retry is manual (scroll again, click again).
//! - **Auth failures** are fatal to the session: credentials are cleared and the user
//!   must log in again. They are never retried.

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::state::PrefsError;
use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or resolved.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tracing could not be initialised.
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    /// Backend call failed.
    #[error("Backend error: {0}")]
    Fetch(#[from] FetchError),

    /// Local I/O failed (fixture or preference files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Expanded-message preferences could not be read or written.
    #[error("Preferences error: {0}")]
    Prefs(#[from] PrefsError),

    /// Local JSON could not be decoded.
    #[error("Invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// Command-line arguments were inconsistent.
    #[error("{0}")]
    Usage(String),
}

/// Failure of one backend request.
///
/// Carried to the UI as a banner message; never clears already-merged messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request did not produce an HTTP response.
    #[error("Network error: {reason}")]
    Network {
        /// Transport-level reason.
        reason: String,
    },

    /// The backend answered with a non-success status.
    ///
    /// `message` is already reduced from the error body
    /// (see [`crate::model::wire::error_message_from_body`]).
    #[error("{message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// User-facing message.
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("Unexpected response: {reason}")]
    Decode {
        /// Decoder message.
        reason: String,
    },

    /// The request could not be authenticated.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl FetchError {
    /// Shorthand for a network failure.
    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network {
            reason: reason.into(),
        }
    }

    /// Shorthand for an HTTP failure.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// True for 401 responses, which trigger one token refresh.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// True when the session is gone and the user must log in again.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Authentication failures. Both variants end the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No access token is available.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The refresh token was rejected or the retried request was still unauthorized.
    #[error("Session expired. Please login again.")]
    SessionExpired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_reduced_message() {
        let err = FetchError::http(400, "Invalid transition");
        assert_eq!(err.to_string(), "Invalid transition");
    }

    #[test]
    fn unauthorized_is_detected_by_status() {
        assert!(FetchError::http(401, "x").is_unauthorized());
        assert!(!FetchError::http(403, "x").is_unauthorized());
        assert!(!FetchError::network("reset").is_unauthorized());
    }

    #[test]
    fn auth_errors_are_session_fatal() {
        let err: FetchError = AuthError::SessionExpired.into();
        assert!(err.is_session_fatal());
        assert_eq!(err.to_string(), "Session expired. Please login again.");
        assert!(!FetchError::network("x").is_session_fatal());
    }

    #[test]
    fn fetch_error_converts_into_app_error() {
        fn run() -> Result<(), AppError> {
            Err(FetchError::network("timeout"))?;
            Ok(())
        }
        assert!(matches!(run(), Err(AppError::Fetch(_))));
    }
}
