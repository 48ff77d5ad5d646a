//! Error types for platform API operations.
//!
//! Errors are categorized so callers can tell transport failures, which a
//! later re-run may get past, from rejections the platform will repeat.

use std::fmt;

/// Result type alias for platform API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of platform API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, TLS or timeout failure before a response arrived.
    Network,
    /// The platform answered with a non-success status.
    Status,
    /// The requested entity does not exist (HTTP 404).
    NotFound,
    /// The response body could not be understood.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Status => "Request rejected by the platform",
            Self::NotFound => "Entity not found",
            Self::Format => "Unexpected response format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the platform URL and connectivity, then re-run",
            Self::Status => "Inspect the response body for the platform's validation message",
            Self::NotFound => "The entity may have been deleted outside of this tool",
            Self::Format => "Verify the host points at an api/v2 compatible endpoint",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the platform.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure (connection refused, TLS, timeout).
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// The platform returned a status outside the success set.
    #[error("status: {status}, body: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Response body was not the expected JSON shape.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// A URL could not be built from the configured host.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Create a status error from a response.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// HTTP status code carried by this error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => *status,
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http { .. } => ErrorCategory::Network,
            Error::Status { status: 404, .. } => ErrorCategory::NotFound,
            Error::Status { status, .. } if *status >= 500 => ErrorCategory::Network,
            Error::Status { .. } => ErrorCategory::Status,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::InvalidUrl(_) | Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the platform reported the entity as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::Status.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Format.is_retryable());
        assert!(!ErrorCategory::Other.is_retryable());
    }

    #[test]
    fn test_error_category_display() {
        let display = format!("{}", ErrorCategory::Network);
        assert!(display.contains("Network"));
    }

    #[test]
    fn test_status_categories() {
        assert_eq!(Error::status(404, "").category(), ErrorCategory::NotFound);
        assert_eq!(Error::status(400, "{}").category(), ErrorCategory::Status);
        assert_eq!(Error::status(502, "").category(), ErrorCategory::Network);
        assert!(Error::status(404, "").is_not_found());
        assert!(Error::status(503, "").is_retryable());
    }

    #[test]
    fn test_status_display_carries_body() {
        let err = Error::status(400, r#"{"name":["This field is required."]}"#);
        let display = err.to_string();
        assert!(display.contains("400"));
        assert!(display.contains("This field is required."));
    }

    #[test]
    fn test_status_code() {
        assert_eq!(Error::http("reset", None).status_code(), None);
        assert_eq!(Error::http("HTTP 401", Some(401)).status_code(), Some(401));
        assert_eq!(Error::status(409, "").status_code(), Some(409));
        assert_eq!(Error::Other("x".into()).status_code(), None);
    }

    #[test]
    fn test_from_serde_json() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }
}
