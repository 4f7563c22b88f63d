//! Error types shared by every social-auth backend.
//!
//! Backends raise [`AuthError`], a closed type tagged with an [`AuthErrorKind`].
//! Callers match on the kind rather than on the message text.

use std::fmt;

use thiserror::Error;

/// What went wrong during an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// The user aborted the login on the provider side.
    Canceled,
    /// Generic authentication failure.
    Failed,
    /// Unrecognized or catch-all provider error.
    UnknownError,
    /// The request omitted or malformed a required parameter.
    MissingParameter,
    /// Expected login-flow state is absent (e.g. no stored session).
    StateMissing,
    /// The provider rejected the session/state as forbidden.
    StateForbidden,
    /// Token-level failure.
    TokenError,
    /// Network/HTTP failure surfaced through the shared HTTP-error kind.
    Http,
    /// Raw transport failure that has not been wrapped yet.
    Transport,
    /// A field expected in a provider response is absent.
    MissingField,
    /// The provider answered with something that is not a valid envelope.
    MalformedResponse,
}

impl AuthErrorKind {
    /// Map a non-zero provider error code to its kind.
    pub fn from_provider_code(code: i32) -> Self {
        match code {
            999 => Self::UnknownError,
            101 | 102 | 103 | 201 | 301 | 404 => Self::MissingParameter,
            405 => Self::StateForbidden,
            _ => Self::UnknownError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Canceled => "authentication canceled",
            Self::Failed => "authentication failed",
            Self::UnknownError => "unknown provider error",
            Self::MissingParameter => "missing parameter",
            Self::StateMissing => "session state missing",
            Self::StateForbidden => "session state forbidden",
            Self::TokenError => "token error",
            Self::Http => "HTTP error",
            Self::Transport => "transport error",
            Self::MissingField => "missing response field",
            Self::MalformedResponse => "malformed provider response",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authentication error raised by a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}{kind}: {message}", backend_prefix(.backend))]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
    /// Name of the backend that raised the error, if any.
    pub backend: Option<&'static str>,
    /// Provider error code, for errors decoded from a provider envelope.
    pub code: Option<i32>,
}

fn backend_prefix(backend: &Option<&'static str>) -> String {
    backend.map(|name| format!("[{}] ", name)).unwrap_or_default()
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            backend: None,
            code: None,
        }
    }

    /// Build the error for a non-zero provider error code.
    pub fn from_provider(code: i32, description: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            ..Self::new(AuthErrorKind::from_provider_code(code), description)
        }
    }

    pub fn state_missing(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::StateMissing, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            AuthErrorKind::MissingField,
            format!("field '{}' not present in response", field),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::MalformedResponse, message)
    }

    /// Tag the error with the backend that raised it.
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    /// Rewrite a raw transport failure into the shared HTTP-error kind.
    /// Every other kind passes through unchanged.
    pub fn into_http(self) -> Self {
        match self.kind {
            AuthErrorKind::Transport => Self {
                kind: AuthErrorKind::Http,
                ..self
            },
            _ => self,
        }
    }
}

/// Failure reported by an [`HttpTransport`](crate::auth::transport::HttpTransport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("{url} answered with HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

impl TransportError {
    /// HTTP status code, when the failure came from a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        Self::new(AuthErrorKind::Transport, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_code_mapping() {
        for code in [101, 102, 103, 201, 301, 404] {
            assert_eq!(
                AuthErrorKind::from_provider_code(code),
                AuthErrorKind::MissingParameter,
                "code {}",
                code
            );
        }
        assert_eq!(
            AuthErrorKind::from_provider_code(405),
            AuthErrorKind::StateForbidden
        );
        assert_eq!(
            AuthErrorKind::from_provider_code(999),
            AuthErrorKind::UnknownError
        );
        assert_eq!(
            AuthErrorKind::from_provider_code(202),
            AuthErrorKind::UnknownError
        );
        assert_eq!(
            AuthErrorKind::from_provider_code(-1),
            AuthErrorKind::UnknownError
        );
    }

    #[test]
    fn test_from_provider_keeps_code_and_description() {
        let err = AuthError::from_provider(405, "Session is locked");
        assert_eq!(err.kind(), AuthErrorKind::StateForbidden);
        assert_eq!(err.code, Some(405));
        assert_eq!(err.message, "Session is locked");
    }

    #[test]
    fn test_display_includes_backend() {
        let err = AuthError::state_missing("Missing Session ID.").with_backend("yourmembership");
        assert_eq!(
            err.to_string(),
            "[yourmembership] session state missing: Missing Session ID."
        );

        let bare = AuthError::missing_field("WebsiteID");
        assert_eq!(
            bare.to_string(),
            "missing response field: field 'WebsiteID' not present in response"
        );
    }

    #[test]
    fn test_transport_error_becomes_http_only_when_wrapped() {
        let err: AuthError = TransportError::Connection {
            url: "https://api.yourmembership.com/".to_string(),
            message: "connection refused".to_string(),
        }
        .into();
        assert_eq!(err.kind(), AuthErrorKind::Transport);

        let wrapped = err.into_http();
        assert_eq!(wrapped.kind(), AuthErrorKind::Http);
        assert!(wrapped.message.contains("connection refused"));

        let provider = AuthError::from_provider(101, "Missing SessionID").into_http();
        assert_eq!(provider.kind(), AuthErrorKind::MissingParameter);
    }

    #[test]
    fn test_transport_status_accessor() {
        let err = TransportError::Status {
            url: "https://api.yourmembership.com/".to_string(),
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.status(), Some(503));
    }
}
