//! # Domain Value Objects
//!
//! Submission outcome types.

use serde::{Deserialize, Serialize};
use shared_types::{LedgerError, Signature};
use std::fmt;

/// Lifecycle status of a broadcast transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Broadcast accepted, inclusion not yet reported.
    Pending,
    /// Included by the ledger.
    Confirmed,
    /// Not included.
    Failed,
}

/// Why a submission failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The ledger refused the transaction.
    RejectedByLedger,
    /// The connection failed before a definitive answer.
    ConnectionLost,
    /// The identity holder declined to sign.
    UserDeclinedSigning,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RejectedByLedger => write!(f, "rejected by ledger"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::UserDeclinedSigning => write!(f, "user declined signing"),
        }
    }
}

impl From<&LedgerError> for ErrorKind {
    fn from(err: &LedgerError) -> Self {
        match err {
            LedgerError::Connection(_) => Self::ConnectionLost,
            LedgerError::UserDeclined => Self::UserDeclinedSigning,
            LedgerError::Rejected(_) | LedgerError::Encoding(_) => Self::RejectedByLedger,
        }
    }
}

/// Definitive outcome of one `submit` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    /// Transaction signature; absent when nothing was broadcast.
    pub signature: Option<Signature>,
    /// Final status.
    pub status: SubmissionStatus,
    /// Failure reason when `status` is `Failed`.
    pub error: Option<ErrorKind>,
}

impl SubmissionResult {
    /// A broadcast transaction awaiting inclusion.
    #[must_use]
    pub fn pending(signature: Signature) -> Self {
        Self {
            signature: Some(signature),
            status: SubmissionStatus::Pending,
            error: None,
        }
    }

    /// A failed submission.
    #[must_use]
    pub fn failed(signature: Option<Signature>, kind: ErrorKind) -> Self {
        Self {
            signature,
            status: SubmissionStatus::Failed,
            error: Some(kind),
        }
    }

    /// Mark as included.
    #[must_use]
    pub fn confirm(self) -> Self {
        Self {
            status: SubmissionStatus::Confirmed,
            error: None,
            ..self
        }
    }

    /// Mark as failed, keeping the signature.
    #[must_use]
    pub fn fail(self, kind: ErrorKind) -> Self {
        Self::failed(self.signature, kind)
    }

    /// Whether the ledger included the transaction.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == SubmissionStatus::Confirmed
    }

    /// The signature, only when confirmed.
    #[must_use]
    pub fn confirmed_signature(&self) -> Option<Signature> {
        if self.is_confirmed() {
            self.signature
        } else {
            None
        }
    }
}
