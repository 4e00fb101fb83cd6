//! # Domain Errors
//!
//! Programming-contract violations and build failures. Ledger-level
//! failures never appear here; they are reported through
//! `SubmissionResult`.

use shared_types::{Address, LedgerError};
use thiserror::Error;

/// Transaction lifecycle error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Caller supplied an unusable transaction shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An address marked `signer` has no authorizing capability.
    #[error("Missing signer: {0}")]
    MissingSigner(Address),

    /// Freshness metadata could not be fetched.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction could not be encoded for signing or broadcast.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl LifecycleError {
    /// Whether this error indicates a caller bug rather than an
    /// environmental failure.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::MissingSigner(_) | Self::Encoding(_)
        )
    }
}

impl From<LedgerError> for LifecycleError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Encoding(msg) => Self::Encoding(msg),
            other => Self::Connection(other.to_string()),
        }
    }
}
