//! # Domain Value Objects

use shared_types::Signature;

use super::errors::RejectReason;

/// State of one operation instance.
///
/// ```text
/// Idle ──→ Building ──→ Submitting ──→ Settled
///   ↑         │              │
///   └─────────┤              └───────→ Rejected
///             └──────────────────────→ Rejected
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    /// Not started.
    Idle,
    /// Checking preconditions and building the transaction.
    Building,
    /// Signing, broadcasting and awaiting confirmation.
    Submitting,
    /// Confirmed by the ledger.
    Settled {
        /// Confirmed transaction signature
        signature: Signature,
    },
    /// Ended without a confirmed transaction.
    Rejected {
        /// Failure cause
        reason: RejectReason,
    },
}

impl OperationState {
    /// Whether the invocation is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled { .. } | Self::Rejected { .. })
    }

    /// Whether `next` is a legal successor.
    pub fn can_transition_to(&self, next: &OperationState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Building)
                | (Self::Building, Self::Idle)
                | (Self::Building, Self::Submitting)
                | (Self::Building, Self::Rejected { .. })
                | (Self::Submitting, Self::Settled { .. })
                | (Self::Submitting, Self::Rejected { .. })
        )
    }
}
