//! # Account State Sync Service
//!
//! Tracks accounts by address. Each tracked address is a slot holding
//! the trigger it was last asked about, the last published view and a
//! watch channel feeding subscribers.
//!
//! ## Recompute
//!
//! ```text
//! track(address, trigger)
//!     │
//!     ├── key in cache ──────────────→ publish cached value
//!     │
//!     └── fetch account ──→ decode ──→ cache + publish
//!              │                │
//!              └── error ───────┴───→ warn, return last published value
//! ```
//!
//! Publication is skipped when the slot's trigger, the connection or the
//! identity changed while the fetch was in flight. No lock is held across
//! an await point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use shared_types::{Address, LedgerConnection, Signature};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::domain::{CacheKey, Tracked, TrackedAccountView};
use crate::ports::AccountDecoder;

struct Slot<T> {
    trigger: Option<Signature>,
    view: Option<TrackedAccountView<T>>,
    sender: watch::Sender<Option<Tracked<T>>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            trigger: None,
            view: None,
            sender,
        }
    }
}

/// Account State Sync - keeps typed account views in step with triggers.
pub struct AccountStateSync<D: AccountDecoder> {
    /// Payload decoder.
    decoder: D,
    /// Current ledger connection.
    connection: RwLock<Arc<dyn LedgerConnection>>,
    /// Current caller identity.
    identity: RwLock<Option<Address>>,
    /// Values by 4-tuple key.
    cache: Mutex<LruCache<CacheKey, Tracked<D::Output>>>,
    /// Tracked slots by address.
    slots: Mutex<HashMap<Address, Slot<D::Output>>>,
    /// Network fetches performed.
    fetches: AtomicU64,
}

impl<D: AccountDecoder> AccountStateSync<D> {
    /// Create a sync service.
    pub fn new(
        connection: Arc<dyn LedgerConnection>,
        identity: Option<Address>,
        decoder: D,
        config: SyncConfig,
    ) -> Self {
        Self {
            decoder,
            connection: RwLock::new(connection),
            identity: RwLock::new(identity),
            cache: Mutex::new(LruCache::new(config.capacity())),
            slots: Mutex::new(HashMap::new()),
            fetches: AtomicU64::new(0),
        }
    }

    /// Swap the ledger connection. Takes effect on the next recompute.
    pub fn set_connection(&self, connection: Arc<dyn LedgerConnection>) {
        info!("[lf-02] Connection switched to {}", connection.endpoint());
        *self.connection.write() = connection;
    }

    /// Swap the caller identity. Takes effect on the next recompute.
    pub fn set_identity(&self, identity: Option<Address>) {
        *self.identity.write() = identity;
    }

    /// Current caller identity.
    pub fn identity(&self) -> Option<Address> {
        *self.identity.read()
    }

    /// Track `address` under `trigger`.
    ///
    /// Fetches only if the 4-tuple key is not cached. Returns `None` only
    /// when nothing is known yet and the fetch failed.
    pub async fn track(
        &self,
        address: Address,
        trigger: Option<Signature>,
    ) -> Option<Tracked<D::Output>> {
        self.slots
            .lock()
            .entry(address)
            .or_insert_with(Slot::new)
            .trigger = trigger;
        self.recompute(address, trigger).await
    }

    /// Publish a new trigger for `address` and recompute it.
    pub async fn publish_trigger(
        &self,
        address: Address,
        trigger: Signature,
    ) -> Option<Tracked<D::Output>> {
        debug!(address = %address, signature = %trigger, "[lf-02] Trigger published");
        self.track(address, Some(trigger)).await
    }

    /// Recompute `address` under its current trigger.
    pub async fn refresh(&self, address: Address) -> Option<Tracked<D::Output>> {
        let trigger = self.slots.lock().get(&address).and_then(|slot| slot.trigger);
        self.track(address, trigger).await
    }

    /// Recompute every tracked slot. Used after a connection or identity swap.
    pub async fn refresh_all(&self) {
        let slots: Vec<(Address, Option<Signature>)> = self
            .slots
            .lock()
            .iter()
            .map(|(address, slot)| (*address, slot.trigger))
            .collect();
        for (address, trigger) in slots {
            self.recompute(address, trigger).await;
        }
    }

    /// Last published value, without a network call.
    pub fn latest(&self, address: &Address) -> Option<Tracked<D::Output>> {
        self.slots
            .lock()
            .get(address)
            .and_then(|slot| slot.view.as_ref())
            .map(|view| view.last_fetched_value.clone())
    }

    /// Full view of a tracked slot.
    pub fn view(&self, address: &Address) -> Option<TrackedAccountView<D::Output>> {
        self.slots
            .lock()
            .get(address)
            .and_then(|slot| slot.view.clone())
    }

    /// Stream of values published for `address`, starting with the current
    /// one if any.
    pub fn subscribe(&self, address: Address) -> impl Stream<Item = Tracked<D::Output>> + Send {
        let receiver = self
            .slots
            .lock()
            .entry(address)
            .or_insert_with(Slot::new)
            .sender
            .subscribe();
        WatchStream::new(receiver).filter_map(|value| value)
    }

    /// Drop the slot for `address` unless someone is subscribed to it.
    ///
    /// Returns whether the slot is gone. Cached values stay in the LRU.
    pub fn release(&self, address: &Address) -> bool {
        let mut slots = self.slots.lock();
        match slots.get(address) {
            Some(slot) if slot.sender.receiver_count() > 0 => false,
            Some(_) => {
                slots.remove(address);
                debug!(address = %address, "[lf-02] Slot released");
                true
            }
            None => true,
        }
    }

    /// Addresses with a slot.
    pub fn tracked_addresses(&self) -> Vec<Address> {
        self.slots.lock().keys().copied().collect()
    }

    /// Number of cached values.
    pub fn cached_entries(&self) -> usize {
        self.cache.lock().len()
    }

    /// Number of network fetches performed so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn current_key(
        &self,
        address: Address,
        trigger: Option<Signature>,
    ) -> (CacheKey, Arc<dyn LedgerConnection>) {
        let connection = self.connection.read().clone();
        let key = CacheKey {
            connection_id: connection.endpoint().to_string(),
            identity: *self.identity.read(),
            address,
            trigger,
        };
        (key, connection)
    }

    async fn recompute(
        &self,
        address: Address,
        trigger: Option<Signature>,
    ) -> Option<Tracked<D::Output>> {
        let (key, connection) = self.current_key(address, trigger);

        let cached = self.cache.lock().get(&key).cloned();
        if let Some(value) = cached {
            debug!(address = %address, "[lf-02] Cache hit");
            self.publish(&key, value.clone());
            return Some(value);
        }

        self.fetches.fetch_add(1, Ordering::SeqCst);
        let fetched = match connection.get_account(&address).await {
            Ok(Some(info)) => self
                .decoder
                .decode(&address, &info)
                .map(Tracked::Found)
                .map_err(|e| e.to_string()),
            Ok(None) => Ok(Tracked::NotFound),
            Err(e) => Err(e.to_string()),
        };

        match fetched {
            Ok(value) => {
                self.cache.lock().put(key.clone(), value.clone());
                self.publish(&key, value.clone());
                Some(value)
            }
            Err(reason) => {
                warn!(address = %address, "[lf-02] Account fetch failed, keeping last value: {}", reason);
                self.latest(&address)
            }
        }
    }

    fn publish(&self, key: &CacheKey, value: Tracked<D::Output>) {
        let (current, _) = self.current_key(key.address, key.trigger);
        if current != *key {
            debug!(address = %key.address, "[lf-02] Connection or identity changed, result not published");
            return;
        }

        let mut slots = self.slots.lock();
        let slot = slots.entry(key.address).or_insert_with(Slot::new);
        if slot.trigger != key.trigger {
            debug!(address = %key.address, "[lf-02] Trigger moved on, result not published");
            return;
        }
        slot.view = Some(TrackedAccountView {
            address: key.address,
            last_fetched_value: value.clone(),
            last_recompute_trigger: key.trigger,
        });
        slot.sender.send_replace(Some(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared_types::{
        AccountInfo, FreshnessToken, LedgerError, MockLedgerConnection, SendOptions,
    };
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    use crate::domain::DecodeError;

    struct LamportsDecoder;

    impl AccountDecoder for LamportsDecoder {
        type Output = u64;

        fn decode(&self, _address: &Address, info: &AccountInfo) -> Result<u64, DecodeError> {
            if info.data.len() < 2 {
                return Err(DecodeError::TooShort {
                    expected: 2,
                    actual: info.data.len(),
                });
            }
            Ok(info.lamports)
        }
    }

    fn account(lamports: u64) -> AccountInfo {
        AccountInfo {
            lamports,
            owner: Address::default(),
            data: vec![0, 0],
        }
    }

    fn sig(tag: u8) -> Signature {
        Signature::new([tag; 64])
    }

    const ADDR: Address = Address::new([1u8; 32]);

    fn setup() -> (Arc<MockLedgerConnection>, AccountStateSync<LamportsDecoder>) {
        let conn = Arc::new(MockLedgerConnection::default());
        let sync = AccountStateSync::new(
            conn.clone(),
            Some(Address::new([9u8; 32])),
            LamportsDecoder,
            SyncConfig::for_testing(),
        );
        (conn, sync)
    }

    #[tokio::test]
    async fn test_missing_account_is_not_found() {
        let (_conn, sync) = setup();
        assert_eq!(sync.track(ADDR, None).await, Some(Tracked::NotFound));
        assert_eq!(sync.latest(&ADDR), Some(Tracked::NotFound));
    }

    #[tokio::test]
    async fn test_identical_key_fetches_once() {
        let (conn, sync) = setup();
        conn.set_account(ADDR, account(5));

        let a = sync.track(ADDR, Some(sig(1))).await;
        let b = sync.track(ADDR, Some(sig(1))).await;

        assert_eq!(a, b);
        assert_eq!(conn.account_fetches(), 1);
        assert_eq!(sync.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_new_trigger_refetches() {
        let (conn, sync) = setup();
        conn.set_account(ADDR, account(5));
        sync.track(ADDR, Some(sig(1))).await;

        conn.set_account(ADDR, account(6));
        let value = sync.publish_trigger(ADDR, sig(2)).await;

        assert_eq!(value, Some(Tracked::Found(6)));
        let view = sync.view(&ADDR).unwrap();
        assert_eq!(view.last_recompute_trigger, Some(sig(2)));
        assert_eq!(conn.account_fetches(), 2);
    }

    #[tokio::test]
    async fn test_identity_and_connection_changes_refetch() {
        let (conn, sync) = setup();
        conn.set_account(ADDR, account(5));
        sync.track(ADDR, None).await;

        sync.set_identity(Some(Address::new([8u8; 32])));
        sync.track(ADDR, None).await;
        assert_eq!(conn.account_fetches(), 2);

        let other = Arc::new(MockLedgerConnection::new("mock://other"));
        other.set_account(ADDR, account(40));
        sync.set_connection(other.clone());
        sync.refresh_all().await;

        assert_eq!(other.account_fetches(), 1);
        assert_eq!(sync.latest(&ADDR), Some(Tracked::Found(40)));
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_previous_value() {
        let (conn, sync) = setup();
        conn.set_account(ADDR, account(10));
        sync.track(ADDR, Some(sig(1))).await;

        conn.set_fail_reads(true);
        let value = sync.publish_trigger(ADDR, sig(2)).await;
        assert_eq!(value, Some(Tracked::Found(10)));
        assert_eq!(sync.latest(&ADDR), Some(Tracked::Found(10)));

        // The failed key was not cached.
        conn.set_fail_reads(false);
        conn.set_account(ADDR, account(11));
        assert_eq!(sync.refresh(ADDR).await, Some(Tracked::Found(11)));
        assert_eq!(conn.account_fetches(), 3);
    }

    #[tokio::test]
    async fn test_decode_error_keeps_previous_value() {
        let (conn, sync) = setup();
        conn.set_account(ADDR, account(10));
        sync.track(ADDR, Some(sig(1))).await;

        conn.set_account(
            ADDR,
            AccountInfo {
                lamports: 99,
                owner: Address::default(),
                data: vec![],
            },
        );
        assert_eq!(
            sync.publish_trigger(ADDR, sig(2)).await,
            Some(Tracked::Found(10))
        );
    }

    #[tokio::test]
    async fn test_first_fetch_error_yields_none() {
        let (conn, sync) = setup();
        conn.set_fail_reads(true);
        assert_eq!(sync.track(ADDR, None).await, None);
        assert_eq!(sync.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_lru_eviction_refetches() {
        let conn = Arc::new(MockLedgerConnection::default());
        let sync = AccountStateSync::new(
            conn.clone(),
            None,
            LamportsDecoder,
            SyncConfig { cache_capacity: 1 },
        );
        let other = Address::new([2u8; 32]);

        sync.track(ADDR, None).await;
        sync.track(other, None).await;
        sync.track(ADDR, None).await;

        assert_eq!(conn.account_fetches(), 3);
        assert_eq!(sync.cached_entries(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_published_values() {
        let (conn, sync) = setup();
        let mut stream = Box::pin(sync.subscribe(ADDR));

        conn.set_account(ADDR, account(5));
        sync.publish_trigger(ADDR, sig(1)).await;
        assert_eq!(stream.next().await, Some(Tracked::Found(5)));

        conn.set_account(ADDR, account(7));
        sync.publish_trigger(ADDR, sig(2)).await;
        assert_eq!(stream.next().await, Some(Tracked::Found(7)));
    }

    #[tokio::test]
    async fn test_release_keeps_subscribed_slots() {
        let (conn, sync) = setup();
        conn.set_account(ADDR, account(5));
        sync.track(ADDR, None).await;

        let stream = sync.subscribe(ADDR);
        assert!(!sync.release(&ADDR));
        assert_eq!(sync.tracked_addresses(), vec![ADDR]);

        drop(stream);
        assert!(sync.release(&ADDR));
        assert!(sync.tracked_addresses().is_empty());
        assert_eq!(sync.latest(&ADDR), None);

        // The cached value survives the slot.
        assert_eq!(sync.track(ADDR, None).await, Some(Tracked::Found(5)));
        assert_eq!(conn.account_fetches(), 1);
    }

    /// Holds the first account read until released.
    struct GatedConnection {
        inner: MockLedgerConnection,
        gate: Notify,
        gated: AtomicBool,
        reads: AtomicU64,
    }

    #[async_trait]
    impl LedgerConnection for GatedConnection {
        fn endpoint(&self) -> &str {
            self.inner.endpoint()
        }

        async fn get_freshness(&self) -> Result<FreshnessToken, LedgerError> {
            self.inner.get_freshness().await
        }

        async fn get_account(
            &self,
            address: &Address,
        ) -> Result<Option<AccountInfo>, LedgerError> {
            let result = self.inner.get_account(address).await;
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.gated.swap(false, Ordering::SeqCst) {
                self.gate.notified().await;
            }
            result
        }

        async fn send_raw(
            &self,
            wire: &[u8],
            options: SendOptions,
        ) -> Result<Signature, LedgerError> {
            self.inner.send_raw(wire, options).await
        }

        async fn confirm_transaction(
            &self,
            signature: &Signature,
            freshness: &FreshnessToken,
        ) -> Result<(), LedgerError> {
            self.inner.confirm_transaction(signature, freshness).await
        }
    }

    #[tokio::test]
    async fn test_late_result_for_old_trigger_not_published() {
        let conn = Arc::new(GatedConnection {
            inner: MockLedgerConnection::default(),
            gate: Notify::new(),
            gated: AtomicBool::new(true),
            reads: AtomicU64::new(0),
        });
        conn.inner.set_account(ADDR, account(1));
        let sync = Arc::new(AccountStateSync::new(
            conn.clone(),
            None,
            LamportsDecoder,
            SyncConfig::for_testing(),
        ));

        let slow = tokio::spawn({
            let sync = sync.clone();
            async move { sync.track(ADDR, Some(sig(1))).await }
        });
        while conn.reads.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        conn.inner.set_account(ADDR, account(2));
        assert_eq!(
            sync.publish_trigger(ADDR, sig(2)).await,
            Some(Tracked::Found(2))
        );

        conn.gate.notify_one();
        assert_eq!(slow.await.unwrap(), Some(Tracked::Found(1)));

        let view = sync.view(&ADDR).unwrap();
        assert_eq!(view.last_fetched_value, Tracked::Found(2));
        assert_eq!(view.last_recompute_trigger, Some(sig(2)));
    }
}
