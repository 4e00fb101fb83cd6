//! # Error Types
//!
//! Defines error types returned by capability implementations.

use thiserror::Error;

/// Errors raised by a `LedgerConnection` or `SigningIdentity`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The ledger could not be reached or the request did not complete.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The ledger definitively refused the transaction.
    #[error("Rejected by ledger: {0}")]
    Rejected(String),

    /// The identity holder refused to authorize the transaction.
    #[error("User declined to sign")]
    UserDeclined,

    /// Wire encoding or decoding failed.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Errors from parsing the canonical text form of an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAddressError {
    /// Input was not valid hex.
    #[error("Invalid address encoding: {0}")]
    InvalidEncoding(String),

    /// Input decoded to the wrong number of bytes.
    #[error("Invalid address length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },
}
