//! # Yielding Connection
//!
//! Wraps a `LedgerConnection` so that every freshness fetch, broadcast and
//! confirmation suspends once before reaching the ledger. Joined operations
//! driven through it interleave at those points instead of running one
//! after the other. Each call is appended to a log as it starts.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    AccountInfo, Address, FreshnessToken, LedgerConnection, LedgerError, SendOptions, Signature,
};

/// Ledger call recorded by `YieldingConnection`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    /// `get_freshness`
    Freshness,
    /// `send_raw`
    Send,
    /// `confirm_transaction`
    Confirm,
}

/// Connection that yields to the scheduler before each write-path call.
pub struct YieldingConnection {
    inner: Arc<dyn LedgerConnection>,
    calls: Mutex<Vec<LedgerCall>>,
}

impl YieldingConnection {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn LedgerConnection>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls seen so far, in start order.
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().clone()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn enter(&self, call: LedgerCall) {
        self.calls.lock().push(call);
        tokio::task::yield_now().await;
    }
}

#[async_trait]
impl LedgerConnection for YieldingConnection {
    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }

    async fn get_freshness(&self) -> Result<FreshnessToken, LedgerError> {
        self.enter(LedgerCall::Freshness).await;
        self.inner.get_freshness().await
    }

    async fn get_account(&self, address: &Address) -> Result<Option<AccountInfo>, LedgerError> {
        self.inner.get_account(address).await
    }

    async fn send_raw(&self, wire: &[u8], options: SendOptions) -> Result<Signature, LedgerError> {
        self.enter(LedgerCall::Send).await;
        self.inner.send_raw(wire, options).await
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        freshness: &FreshnessToken,
    ) -> Result<(), LedgerError> {
        self.enter(LedgerCall::Confirm).await;
        self.inner.confirm_transaction(signature, freshness).await
    }
}
