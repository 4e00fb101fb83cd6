//! # LF-01 Transaction Lifecycle
//!
//! Assembles, signs, broadcasts and confirms ledger transactions.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Take a list of instructions from a program client and drive it to a
//! definitive outcome:
//! - `TransactionBuilder` attaches a freshly fetched freshness token and the
//!   fee payer.
//! - `TransactionSubmitter` collects every required signature, broadcasts
//!   exactly once, waits for inclusion and reports `Confirmed` or `Failed`.
//!
//! ## Error Policy
//!
//! | Failure | Surfaced as |
//! |---------|-------------|
//! | Empty instructions / fee payer not set | `LifecycleError::InvalidInput` |
//! | Signer role not covered | `LifecycleError::MissingSigner` |
//! | Freshness fetch failed | `LifecycleError::Connection` |
//! | Ledger rejection, lost connection, user declined | `SubmissionResult` with `Failed` |
//!
//! ## Module Structure
//!
//! ```text
//! lf-01-transaction-lifecycle/
//! ├── domain/          # SubmissionResult, ErrorKind, LifecycleError
//! ├── ports/           # Capability traits consumed (re-exported)
//! ├── application/     # TransactionBuilder, TransactionSubmitter
//! └── adapters/        # LocalWallet signing identity
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::LocalWallet;
pub use application::{TransactionBuilder, TransactionSubmitter};
pub use domain::{ErrorKind, LifecycleError, SubmissionResult, SubmissionStatus};
pub use ports::{CoSigner, LedgerConnection, SendOptions, SigningIdentity};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
