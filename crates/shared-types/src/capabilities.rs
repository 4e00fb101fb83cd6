//! # Capability Traits
//!
//! The external collaborators every component is handed at construction:
//! the ledger connection and the signing identity. Both are treated as
//! opaque, shared, read-mostly capabilities.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use shared_types::{LedgerConnection, FreshnessToken, LedgerError};
//! use async_trait::async_trait;
//!
//! pub struct RpcConnection { /* ... */ }
//!
//! #[async_trait]
//! impl LedgerConnection for RpcConnection {
//!     fn endpoint(&self) -> &str { "https://api.devnet.example" }
//!     async fn get_freshness(&self) -> Result<FreshnessToken, LedgerError> { todo!() }
//!     // ...
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::{
    AccountInfo, Address, Blockhash, FreshnessToken, Signature, SignedTransaction,
    UnsignedTransaction,
};
use crate::errors::LedgerError;

/// Broadcast options forwarded to the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    /// Skip ledger-side simulation before acceptance. Failures then
    /// surface only at confirmation time.
    pub skip_preflight: bool,
}

/// Ledger connection - outbound port.
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Stable identifier of the remote endpoint (part of every cache key).
    fn endpoint(&self) -> &str;

    /// Fetch current freshness metadata.
    async fn get_freshness(&self) -> Result<FreshnessToken, LedgerError>;

    /// Fetch raw account contents. `Ok(None)` when the account does not exist.
    async fn get_account(&self, address: &Address) -> Result<Option<AccountInfo>, LedgerError>;

    /// Broadcast a fully signed, wire-encoded transaction.
    async fn send_raw(&self, wire: &[u8], options: SendOptions) -> Result<Signature, LedgerError>;

    /// Wait until the transaction is included or definitively rejected.
    ///
    /// There is no client-side timeout: a stalled connection leaves the
    /// call pending.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        freshness: &FreshnessToken,
    ) -> Result<(), LedgerError>;
}

/// Signing identity - outbound port (the user's wallet).
#[async_trait]
pub trait SigningIdentity: Send + Sync {
    /// Public address of the identity; acts as fee payer.
    fn address(&self) -> Address;

    /// Add the identity's signature to the transaction.
    async fn authorize(&self, tx: UnsignedTransaction) -> Result<SignedTransaction, LedgerError>;

    /// Sign and broadcast in one step through `connection`.
    async fn authorize_and_send(
        &self,
        tx: UnsignedTransaction,
        connection: &dyn LedgerConnection,
        options: SendOptions,
    ) -> Result<Signature, LedgerError> {
        let signed = self.authorize(tx).await?;
        let wire = signed.to_wire_bytes()?;
        connection.send_raw(&wire, options).await
    }
}

/// A local signer that co-signs alongside the identity (e.g. the keypair
/// of a freshly created account).
pub trait CoSigner: Send + Sync {
    /// Address this signer authorizes for.
    fn address(&self) -> Address;

    /// Sign the transaction message bytes.
    fn sign_message(&self, message: &[u8]) -> Signature;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Scriptable in-memory ledger connection for unit tests.
///
/// Hands out a distinct freshness token per fetch, serves accounts from a
/// map, and records every broadcast transaction after checking signatures.
pub struct MockLedgerConnection {
    endpoint: String,
    accounts: RwLock<HashMap<Address, AccountInfo>>,
    sent: Mutex<Vec<SignedTransaction>>,
    send_error: Mutex<Option<LedgerError>>,
    confirm_error: Mutex<Option<LedgerError>>,
    fail_freshness: AtomicBool,
    fail_reads: AtomicBool,
    freshness_fetches: AtomicU64,
    account_fetches: AtomicU64,
}

impl MockLedgerConnection {
    /// Create a mock with the given endpoint identifier.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            accounts: RwLock::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
            confirm_error: Mutex::new(None),
            fail_freshness: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            freshness_fetches: AtomicU64::new(0),
            account_fetches: AtomicU64::new(0),
        }
    }

    /// Insert or replace an account.
    pub fn set_account(&self, address: Address, info: AccountInfo) {
        self.accounts.write().insert(address, info);
    }

    /// Make freshness fetches fail.
    pub fn set_fail_freshness(&self, fail: bool) {
        self.fail_freshness.store(fail, Ordering::SeqCst);
    }

    /// Make account fetches fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make broadcasts fail with `error` (or succeed again with `None`).
    pub fn set_send_error(&self, error: Option<LedgerError>) {
        *self.send_error.lock() = error;
    }

    /// Make confirmations fail with `error` (or succeed again with `None`).
    pub fn set_confirm_error(&self, error: Option<LedgerError>) {
        *self.confirm_error.lock() = error;
    }

    /// Transactions accepted so far.
    pub fn sent_transactions(&self) -> Vec<SignedTransaction> {
        self.sent.lock().clone()
    }

    /// Number of freshness fetches served.
    pub fn freshness_fetches(&self) -> u64 {
        self.freshness_fetches.load(Ordering::SeqCst)
    }

    /// Number of account fetches served (including failed ones).
    pub fn account_fetches(&self) -> u64 {
        self.account_fetches.load(Ordering::SeqCst)
    }
}

impl Default for MockLedgerConnection {
    fn default() -> Self {
        Self::new("mock://ledger")
    }
}

#[async_trait]
impl LedgerConnection for MockLedgerConnection {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_freshness(&self) -> Result<FreshnessToken, LedgerError> {
        if self.fail_freshness.load(Ordering::SeqCst) {
            return Err(LedgerError::Connection("Mock failure".to_string()));
        }
        let n = self.freshness_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&n.to_le_bytes());
        Ok(FreshnessToken::new(Blockhash(hash), 150 + n))
    }

    async fn get_account(&self, address: &Address) -> Result<Option<AccountInfo>, LedgerError> {
        self.account_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Connection("Mock failure".to_string()));
        }
        Ok(self.accounts.read().get(address).cloned())
    }

    async fn send_raw(&self, wire: &[u8], _options: SendOptions) -> Result<Signature, LedgerError> {
        if let Some(err) = self.send_error.lock().clone() {
            return Err(err);
        }
        let tx = SignedTransaction::from_wire_bytes(wire)?;
        if !tx.is_fully_signed() {
            return Err(LedgerError::Rejected("missing signature".to_string()));
        }
        tx.verify_signatures()?;
        let signature = tx
            .signature()
            .ok_or_else(|| LedgerError::Rejected("missing fee payer signature".to_string()))?;
        debug!(signature = %signature, "Mock ledger accepted transaction");
        self.sent.lock().push(tx);
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        _freshness: &FreshnessToken,
    ) -> Result<(), LedgerError> {
        if let Some(err) = self.confirm_error.lock().clone() {
            return Err(err);
        }
        let known = self
            .sent
            .lock()
            .iter()
            .any(|tx| tx.signature().as_ref() == Some(signature));
        if known {
            Ok(())
        } else {
            Err(LedgerError::Rejected("unknown signature".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AccountMeta, Instruction};
    use crate::keypair::Keypair;

    struct KeypairIdentity(Keypair);

    #[async_trait]
    impl SigningIdentity for KeypairIdentity {
        fn address(&self) -> Address {
            self.0.address()
        }

        async fn authorize(
            &self,
            tx: UnsignedTransaction,
        ) -> Result<SignedTransaction, LedgerError> {
            let mut signed = SignedTransaction::new(tx);
            signed.sign_with(&self.0)?;
            Ok(signed)
        }
    }

    #[tokio::test]
    async fn test_mock_freshness_tokens_are_distinct() {
        let conn = MockLedgerConnection::default();
        let a = conn.get_freshness().await.unwrap();
        let b = conn.get_freshness().await.unwrap();
        assert_ne!(a.blockhash, b.blockhash);
        assert_eq!(conn.freshness_fetches(), 2);
    }

    #[tokio::test]
    async fn test_mock_failed_reads() {
        let conn = MockLedgerConnection::default();
        conn.set_fail_reads(true);
        assert!(conn.get_account(&Address::default()).await.is_err());
        assert_eq!(conn.account_fetches(), 1);
    }

    #[tokio::test]
    async fn test_default_authorize_and_send() {
        let conn = MockLedgerConnection::default();
        let identity = KeypairIdentity(Keypair::generate());
        let freshness = conn.get_freshness().await.unwrap();
        let tx = UnsignedTransaction::new(
            identity.address(),
            freshness,
            vec![Instruction::new(
                Address::default(),
                vec![AccountMeta::writable(identity.address(), true)],
                vec![],
            )],
        );

        let signature = identity
            .authorize_and_send(tx, &conn, SendOptions::default())
            .await
            .unwrap();
        assert!(conn.confirm_transaction(&signature, &freshness).await.is_ok());
        assert_eq!(conn.sent_transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_rejects_unsigned_broadcast() {
        let conn = MockLedgerConnection::default();
        let freshness = conn.get_freshness().await.unwrap();
        let tx = SignedTransaction::new(UnsignedTransaction::new(
            Address::new([1u8; 32]),
            freshness,
            vec![],
        ));
        let wire = tx.to_wire_bytes().unwrap();
        assert!(matches!(
            conn.send_raw(&wire, SendOptions::default()).await,
            Err(LedgerError::Rejected(_))
        ));
    }
}
