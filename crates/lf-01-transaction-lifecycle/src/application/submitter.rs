//! # Transaction Submitter
//!
//! Collects signatures, broadcasts exactly once and waits for a
//! definitive answer from the ledger.
//!
//! ## Flow
//!
//! ```text
//! validate signers ──→ authorize ──→ broadcast ──→ confirm
//!        │                 │             │            │
//!   LifecycleError      Failed        Failed    Confirmed | Failed
//! ```
//!
//! With no co-signers the identity signs and broadcasts in one step
//! (`authorize_and_send`). With co-signers the identity authorizes, every
//! co-signer adds its signature, and the fully signed transaction is sent
//! raw through the connection.
//!
//! There is no client-side timeout and no retry. A retry is a new `submit`
//! call with a freshly built transaction.

use std::sync::Arc;

use shared_types::{
    CoSigner, LedgerConnection, LedgerError, SendOptions, Signature, SigningIdentity,
    UnsignedTransaction,
};
use tracing::{debug, info, warn};

use crate::domain::{ErrorKind, LifecycleError, SubmissionResult};

/// Drives a transaction from unsigned to confirmed or failed.
pub struct TransactionSubmitter {
    connection: Arc<dyn LedgerConnection>,
}

impl TransactionSubmitter {
    /// Create a submitter broadcasting through `connection`.
    pub fn new(connection: Arc<dyn LedgerConnection>) -> Self {
        Self { connection }
    }

    /// The connection used for broadcast and confirmation.
    pub fn connection(&self) -> &Arc<dyn LedgerConnection> {
        &self.connection
    }

    /// Submit a transaction.
    ///
    /// Returns `Err` only for programming-contract violations. Every
    /// ledger-level failure is reported as a `Failed` result.
    pub async fn submit(
        &self,
        tx: UnsignedTransaction,
        identity: &dyn SigningIdentity,
        extra_signers: &[&dyn CoSigner],
        options: SendOptions,
    ) -> Result<SubmissionResult, LifecycleError> {
        Self::check_signers(&tx, identity, extra_signers)?;
        // Local serialization failures are contract errors; anything the
        // connection reports after this point is a ledger-side failure.
        tx.message_bytes().map_err(LifecycleError::from)?;

        let freshness = tx.freshness;
        let sent = if extra_signers.is_empty() {
            identity
                .authorize_and_send(tx, self.connection.as_ref(), options)
                .await
        } else {
            match Self::co_sign(tx, identity, extra_signers).await {
                Ok(wire) => self.connection.send_raw(&wire, options).await,
                Err(LedgerError::Encoding(msg)) => return Err(LifecycleError::Encoding(msg)),
                Err(e) => Err(e),
            }
        };

        let signature = match sent {
            Ok(signature) => signature,
            Err(e) => {
                warn!("[lf-01] Submission failed before broadcast completed: {}", e);
                return Ok(SubmissionResult::failed(None, ErrorKind::from(&e)));
            }
        };

        debug!(
            "[lf-01] Broadcast {} (skip_preflight={})",
            signature, options.skip_preflight
        );
        let pending = SubmissionResult::pending(signature);

        match self
            .connection
            .confirm_transaction(&signature, &freshness)
            .await
        {
            Ok(()) => {
                info!("[lf-01] Confirmed {}", signature);
                Ok(pending.confirm())
            }
            Err(e) => {
                warn!("[lf-01] Transaction {} failed at confirmation: {}", signature, e);
                Ok(pending.fail(ErrorKind::from(&e)))
            }
        }
    }

    /// Every signer role must be covered: the identity as fee payer, and a
    /// co-signer for every other signer address. Co-signers the
    /// transaction does not ask for are refused too.
    fn check_signers(
        tx: &UnsignedTransaction,
        identity: &dyn SigningIdentity,
        extra_signers: &[&dyn CoSigner],
    ) -> Result<(), LifecycleError> {
        if tx.instructions.is_empty() {
            return Err(LifecycleError::InvalidInput(
                "instruction list is empty".to_string(),
            ));
        }
        if identity.address() != tx.fee_payer {
            return Err(LifecycleError::MissingSigner(tx.fee_payer));
        }

        let required = tx.required_signers();
        for signer in required.iter().filter(|s| **s != tx.fee_payer) {
            if !extra_signers.iter().any(|s| s.address() == *signer) {
                return Err(LifecycleError::MissingSigner(*signer));
            }
        }
        if let Some(unknown) = extra_signers
            .iter()
            .find(|s| !required.contains(&s.address()))
        {
            return Err(LifecycleError::InvalidInput(format!(
                "unknown signer {}",
                unknown.address()
            )));
        }
        Ok(())
    }

    /// Collect the identity's and every co-signer's signature and encode
    /// the result for broadcast.
    async fn co_sign(
        tx: UnsignedTransaction,
        identity: &dyn SigningIdentity,
        extra_signers: &[&dyn CoSigner],
    ) -> Result<Vec<u8>, LedgerError> {
        let mut signed = identity.authorize(tx).await?;
        for signer in extra_signers {
            signed.sign_with(*signer)?;
        }

        if let Some(missing) = signed.missing_signers().first() {
            // The identity returned without its own signature.
            return Err(LedgerError::Rejected(format!("missing signature for {missing}")));
        }

        signed.to_wire_bytes()
    }
}
