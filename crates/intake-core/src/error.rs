//! Error types and result aliases for Intake.
//!
//! Every call to the ingestion service and every view-state update reports
//! failures through [`Error`]. Views collapse the variants into a single
//! operator-facing message per operation; the variants exist so that logs
//! and tests can tell a refused request from a broken connection.

/// The result type used throughout Intake.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Intake operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced an HTTP response.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The service answered with a non-success status.
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code returned by the service.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("malformed response: {message}")]
    MalformedResponse {
        /// Description of the decoding failure.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested resource was not found.
    #[error("not found: {resource_type} {id}")]
    NotFound {
        /// The kind of resource that was looked up.
        resource_type: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A state machine was asked to make a transition it does not allow.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// State the item was in.
        from: String,
        /// State that was requested.
        to: String,
    },
}

impl Error {
    /// Creates a transport error with the given message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error with a source cause.
    #[must_use]
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a malformed-response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(resource_type: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Returns true if the service itself refused the request.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_includes_status() {
        let err = Error::Rejected {
            status: 409,
            message: "dataset exists".to_string(),
        };
        assert_eq!(err.to_string(), "request rejected (409): dataset exists");
        assert!(err.is_rejection());
    }

    #[test]
    fn transport_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::transport_with_source("connect failed", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_rejection());
    }
}
