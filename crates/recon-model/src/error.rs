//! Error taxonomy for the reconciliation engine.

use thiserror::Error;

use crate::ids::ConflictId;

/// Errors returned by engine operations.
///
/// Type incompatibility is never reported here. It surfaces as a low factor
/// score or a validation warning instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconError {
    /// A descriptor or argument is malformed. Nothing was computed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A resolution action string did not name a known action.
    #[error("invalid resolution action: '{0}'")]
    InvalidResolutionAction(String),

    /// A lifecycle transition that the state machine does not define.
    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// No conflict with this id exists in the ledger.
    #[error("conflict not found: {0}")]
    ConflictNotFound(ConflictId),

    /// A mapping did not pass the validator and cannot be marked validated.
    #[error("mapping failed validation with {warnings} warning(s)")]
    ValidationFailed { warnings: usize },
}

impl ReconError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
