//! Errors surfaced to callers of the requester.

use thiserror::Error;

use crate::auth::AuthenticationError;
use crate::journal::JournalError;
use crate::request::RequestDescriptor;
use crate::transport::TransportError;

pub type RequesterResult<T> = Result<T, RequesterError>;

/// Outcome of a failed logical request.
///
/// `Clone` because one outcome is delivered to every caller awaiting the same
/// deduplicated operation.
#[derive(Debug, Clone, Error)]
pub enum RequesterError {
    /// Retries were exhausted; the last transport failure is kept as is.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The operation was cancelled by `interrupt()`.
    #[error("request interrupted: {descriptor}")]
    Interrupted { descriptor: RequestDescriptor },

    #[error("authentication unavailable: {0}")]
    AuthenticationUnavailable(#[from] AuthenticationError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    /// The operation task ended without producing an outcome.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RequesterError {
    /// HTTP status of the final failed attempt, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequesterError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RequesterError::Interrupted { .. })
    }

    /// Descriptor of the aborted request when this is an interruption.
    pub fn interrupted_descriptor(&self) -> Option<&RequestDescriptor> {
        match self {
            RequesterError::Interrupted { descriptor } => Some(descriptor),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Authentication;

    #[test]
    fn test_status_survives_conversion() {
        let err: RequesterError = TransportError::Http {
            status: 503,
            body: "busy".into(),
        }
        .into();
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_interrupted());
    }

    #[test]
    fn test_interruption_carries_descriptor() {
        let descriptor = RequestDescriptor::get("/r", Authentication::None);
        let err = RequesterError::Interrupted {
            descriptor: descriptor.clone(),
        };
        assert!(err.is_interrupted());
        assert_eq!(err.interrupted_descriptor(), Some(&descriptor));
        assert!(err.to_string().contains("/r"));
        assert_eq!(err.status(), None);
    }
}
