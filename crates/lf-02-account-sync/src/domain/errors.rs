//! # Domain Errors

use shared_types::Address;
use thiserror::Error;

/// Account payload could not be turned into typed program state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Account is owned by a different program.
    #[error("Wrong owner: expected {expected}, got {actual}")]
    WrongOwner {
        /// Program expected to own the account
        expected: Address,
        /// Actual owner
        actual: Address,
    },

    /// Leading discriminator does not name the expected account type.
    #[error("Account discriminator mismatch")]
    BadDiscriminator,

    /// Payload shorter than the account layout.
    #[error("Account data too short: expected {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum length
        expected: usize,
        /// Actual length
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short_message() {
        let err = DecodeError::TooShort {
            expected: 16,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Account data too short: expected 16 bytes, got 3");
    }
}
