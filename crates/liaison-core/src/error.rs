//! Error types for the Liaison coordination core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Liaison core.
///
/// Business outcomes (`InsufficientBalance`, `InvalidTransition`, ...) are
/// surfaced verbatim to callers so the presentation layer can react to them
/// (e.g. offer a top-up). Infrastructure failures are folded into
/// `TransientStoreFailure`, which is the only retryable store condition.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreError {
    /// The actor's available balance does not cover the action's cost.
    #[error("Insufficient balance for '{user_id}': required {required}, available {available}")]
    InsufficientBalance {
        user_id: String,
        required: u64,
        available: u64,
    },

    /// The action is not legal for the current relationship state.
    #[error("Invalid transition: {action} is not allowed while relationship is {state}")]
    InvalidTransition { action: String, state: String },

    /// An open proposal of the same family already exists for the pair.
    #[error("Duplicate proposal: an open proposal already exists for pair {pair}")]
    DuplicateProposal { pair: String },

    /// A response or withdrawal referenced no open proposal.
    #[error("No pending proposal for pair {pair}")]
    NoPendingProposal { pair: String },

    /// The actor is not the party allowed to perform this action.
    #[error("'{user_id}' is not authorized to {action}")]
    NotAuthorizedForAction { user_id: String, action: String },

    /// Retryable infrastructure error (storage write or read failed).
    #[error("Transient store failure: {0}")]
    TransientStoreFailure(String),

    /// The pre-commit phase of an execution did not finish in time.
    #[error("Execution timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The session token did not map to a user.
    #[error("Unauthenticated session")]
    Unauthenticated,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an InvalidTransition error
    pub fn invalid_transition(action: impl ToString, state: impl ToString) -> Self {
        Self::InvalidTransition {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    /// Creates a NotAuthorizedForAction error
    pub fn not_authorized(user_id: impl Into<String>, action: impl ToString) -> Self {
        Self::NotAuthorizedForAction {
            user_id: user_id.into(),
            action: action.to_string(),
        }
    }

    /// Creates a TransientStoreFailure error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientStoreFailure(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is an InsufficientBalance error
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, Self::InsufficientBalance { .. })
    }

    /// Check if this is an InvalidTransition error
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Check if this is a TransientStoreFailure error
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStoreFailure(_))
    }

    /// Whether the caller may retry the same request unchanged.
    ///
    /// Business outcomes are never retryable: the caller must change intent
    /// (top up, respond instead of proposing, ...).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStoreFailure(_) | Self::Timeout { .. })
    }

    /// Whether this error is an expected business outcome rather than a fault.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::InvalidTransition { .. }
                | Self::DuplicateProposal { .. }
                | Self::NoPendingProposal { .. }
                | Self::NotAuthorizedForAction { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used by binaries wrapping library calls)
impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, CoreError>`.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CoreError::transient("disk full").is_retryable());
        assert!(CoreError::Timeout { elapsed_ms: 10 }.is_retryable());
        assert!(!CoreError::invalid_transition("Chat", "None").is_retryable());
        assert!(
            !CoreError::InsufficientBalance {
                user_id: "a".into(),
                required: 1,
                available: 0
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_business_outcome_classification() {
        assert!(CoreError::DuplicateProposal { pair: "a|b".into() }.is_business_outcome());
        assert!(CoreError::not_authorized("a", "respond").is_business_outcome());
        assert!(!CoreError::transient("io").is_business_outcome());
        assert!(!CoreError::Unauthenticated.is_business_outcome());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: CoreError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        match err {
            CoreError::Io { message } => assert!(message.contains("gone")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
