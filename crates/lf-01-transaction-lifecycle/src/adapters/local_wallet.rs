//! # Local Wallet
//!
//! A `SigningIdentity` backed by an in-process keypair. Used by the
//! simulated-ledger scenarios and by headless tooling. It can be switched
//! into a declining mode to reproduce a user rejecting the signature
//! prompt.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use shared_types::{
    Address, Keypair, LedgerError, SignedTransaction, SigningIdentity, UnsignedTransaction,
};
use tracing::debug;

/// Keypair-backed signing identity.
pub struct LocalWallet {
    keypair: Keypair,
    declining: AtomicBool,
    authorizations: AtomicU64,
}

impl LocalWallet {
    /// Wrap an existing keypair.
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair,
            declining: AtomicBool::new(false),
            authorizations: AtomicU64::new(0),
        }
    }

    /// Wallet with a freshly generated keypair.
    pub fn generate() -> Self {
        Self::new(Keypair::generate())
    }

    /// Decline every subsequent authorization request.
    pub fn set_declining(&self, declining: bool) {
        self.declining.store(declining, Ordering::SeqCst);
    }

    /// Number of transactions signed so far.
    pub fn authorizations(&self) -> u64 {
        self.authorizations.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.keypair.address())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningIdentity for LocalWallet {
    fn address(&self) -> Address {
        self.keypair.address()
    }

    async fn authorize(&self, tx: UnsignedTransaction) -> Result<SignedTransaction, LedgerError> {
        if self.declining.load(Ordering::SeqCst) {
            debug!("[lf-01] Wallet {} declined to sign", self.keypair.address());
            return Err(LedgerError::UserDeclined);
        }
        let mut signed = SignedTransaction::new(tx);
        signed.sign_with(&self.keypair)?;
        self.authorizations.fetch_add(1, Ordering::SeqCst);
        Ok(signed)
    }
}
