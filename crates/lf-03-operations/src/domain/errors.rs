//! # Domain Errors

use lf_01_transaction_lifecycle::{ErrorKind, LifecycleError};
use thiserror::Error;

use super::value_objects::OperationState;

/// An operation could not start. Surfaced as a notice; nothing is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// No signing identity is connected.
    #[error("Please connect your wallet.")]
    NoIdentity,

    /// Increment requested before any counter exists.
    #[error("No counter account to increment.")]
    NoCounter,

    /// Transfer requested without a recipient.
    #[error("Please enter a recipient address.")]
    MissingRecipient,

    /// Recipient text is not a valid address.
    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    /// Transfer amount is zero.
    #[error("Please enter an amount greater than zero.")]
    ZeroAmount,

    /// Transfer amount cannot be expressed in lamports.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Why an operation ended `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// Transaction could not be built.
    #[error("build failed: {0}")]
    Build(LifecycleError),

    /// Submission refused by the lifecycle before broadcast.
    #[error("contract violation: {0}")]
    Contract(LifecycleError),

    /// Ledger-level failure.
    #[error("submission failed: {0}")]
    Submission(ErrorKind),
}

/// Illegal state machine step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Illegal operation transition {from:?} -> {to:?}")]
pub struct TransitionError {
    /// State before
    pub from: OperationState,
    /// Requested state
    pub to: OperationState,
}

/// Invalid client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Explorer host is blank.
    #[error("explorer host must not be empty")]
    EmptyExplorerHost,
}
