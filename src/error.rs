//! Error types for crewdeck

use thiserror::Error;

/// How an error should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed input; shown inline, nothing else happens
    Validation,
    /// Invalid OTP or token; fatal to the current session
    Authentication,
    /// Wrong user type for a resource; recovered by redirect
    Authorization,
    /// Network or server trouble on a data endpoint; retryable, session kept
    Transient,
}

/// Portal client error
#[derive(Debug, Error)]
pub enum PortalError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local storage could not be read or written
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Server returned an error
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Server rejected our credentials (401/403)
    #[error("Unauthorized ({status})")]
    Unauthorized { status: u16 },

    /// Request was well-formed but the user type may not perform it
    #[error("Forbidden for this account: {0}")]
    Forbidden(String),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Form input rejected before any request was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// OTP login was answered with a non-success code
    #[error("OTP rejected: {0}")]
    OtpRejected(String),

    /// Session cookie could not be issued or decoded
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PortalError {
    /// Classify this error for the caller's recovery policy.
    pub fn class(&self) -> ErrorClass {
        match self {
            PortalError::InvalidInput(_) => ErrorClass::Validation,
            PortalError::Unauthorized { .. }
            | PortalError::OtpRejected(_)
            | PortalError::Session(_) => ErrorClass::Authentication,
            PortalError::Forbidden(_) => ErrorClass::Authorization,
            PortalError::Http(_)
            | PortalError::Json(_)
            | PortalError::Io(_)
            | PortalError::Server { .. }
            | PortalError::InvalidResponse(_)
            | PortalError::Config(_) => ErrorClass::Transient,
        }
    }

    /// True for responses that should trip the global re-validation path.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, PortalError::Unauthorized { .. })
    }
}

impl From<jsonwebtoken::errors::Error> for PortalError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        PortalError::Session(e.to_string())
    }
}

/// Result type for portal operations
pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            PortalError::InvalidInput("otp".into()).class(),
            ErrorClass::Validation
        );
        assert_eq!(
            PortalError::Unauthorized { status: 401 }.class(),
            ErrorClass::Authentication
        );
        assert_eq!(
            PortalError::Forbidden("employee".into()).class(),
            ErrorClass::Authorization
        );
        assert_eq!(
            PortalError::Server {
                status: 502,
                message: "bad gateway".into()
            }
            .class(),
            ErrorClass::Transient
        );
    }

    #[test]
    fn test_only_unauthorized_triggers_revalidation() {
        assert!(PortalError::Unauthorized { status: 403 }.is_unauthorized());
        assert!(!PortalError::Server {
            status: 500,
            message: String::new()
        }
        .is_unauthorized());
    }
}
