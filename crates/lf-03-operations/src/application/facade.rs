//! # Operation Facade
//!
//! The three user-facing use cases. Each invocation runs its own state
//! machine:
//!
//! ```text
//! user action
//!     │
//!     ▼
//! Building ──(precondition)──→ Idle + notice
//!     │
//!     ├──(build error)──→ Rejected + notice
//!     ▼
//! Submitting ──(Failed)──→ Rejected + notice
//!     │
//!     ▼
//! Settled ──→ publish signature as trigger ──→ account sync recomputes
//! ```
//!
//! Concurrent invocations are independent. With `serialize_same_address`
//! set, invocations writing the same address wait on an advisory lock.

use std::collections::HashMap;
use std::sync::Arc;

use lf_01_transaction_lifecycle::{
    ErrorKind, SubmissionResult, TransactionBuilder, TransactionSubmitter,
};
use lf_02_account_sync::{AccountStateSync, Tracked};
use parking_lot::{Mutex, RwLock};
use shared_bus::{
    ClientEvent, EventFilter, EventPublisher, InMemoryEventBus, OperationKind, Subscription,
    UserNotice,
};
use shared_types::{
    Address, CoSigner, Instruction, Keypair, LedgerConnection, LedgerError, SendOptions,
    Signature, SigningIdentity,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_stream::Stream;
use tracing::{error, info, warn};

use crate::config::ClientConfig;
use crate::domain::{
    ConfigError, Operation, OperationReport, OperationState, PreconditionError, RejectReason,
};
use crate::explorer::explorer_tx_url;
use crate::programs::{
    counter, sol_to_lamports, system, Balance, BalanceDecoder, CounterAccount, CounterDecoder,
};

/// Notice published for every rejected operation.
pub const TRANSACTION_FAILED_NOTICE: &str = "Transaction failed!";

/// Entry point for counter and transfer operations.
pub struct OperationFacade {
    config: ClientConfig,
    connection: RwLock<Arc<dyn LedgerConnection>>,
    identity: RwLock<Option<Arc<dyn SigningIdentity>>>,
    builder: TransactionBuilder,
    counter_key: RwLock<Option<Address>>,
    last_signature: RwLock<Option<Signature>>,
    counters: AccountStateSync<CounterDecoder>,
    balances: AccountStateSync<BalanceDecoder>,
    bus: Arc<InMemoryEventBus>,
    address_locks: Mutex<HashMap<Address, Arc<AsyncMutex<()>>>>,
}

impl OperationFacade {
    /// Create a facade with its own event bus.
    pub fn new(
        connection: Arc<dyn LedgerConnection>,
        identity: Option<Arc<dyn SigningIdentity>>,
        config: ClientConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_event_bus(connection, identity, config, Arc::new(InMemoryEventBus::new()))
    }

    /// Create a facade publishing to an existing bus.
    pub fn with_event_bus(
        connection: Arc<dyn LedgerConnection>,
        identity: Option<Arc<dyn SigningIdentity>>,
        config: ClientConfig,
        bus: Arc<InMemoryEventBus>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let identity_address = identity.as_ref().map(|id| id.address());
        Ok(Self {
            counters: AccountStateSync::new(
                connection.clone(),
                identity_address,
                CounterDecoder,
                config.sync.clone(),
            ),
            balances: AccountStateSync::new(
                connection.clone(),
                identity_address,
                BalanceDecoder,
                config.sync.clone(),
            ),
            config,
            connection: RwLock::new(connection),
            identity: RwLock::new(identity),
            builder: TransactionBuilder::new(),
            counter_key: RwLock::new(None),
            last_signature: RwLock::new(None),
            bus,
            address_locks: Mutex::new(HashMap::new()),
        })
    }

    // =========================================================================
    // Use cases
    // =========================================================================

    /// Create a counter account. A fresh keypair for the account co-signs.
    ///
    /// On success the new address becomes the current counter key.
    pub async fn create_counter(&self) -> Result<OperationReport, PreconditionError> {
        let mut op = Operation::new(OperationKind::CreateCounter);
        self.advance(&mut op, OperationState::Building);

        let identity = match self.current_identity() {
            Some(identity) => identity,
            None => {
                return Err(self
                    .precondition_failed(&mut op, PreconditionError::NoIdentity)
                    .await)
            }
        };
        let payer = identity.address();
        let counter_keypair = Keypair::generate();
        let counter_address = counter_keypair.address();

        let options = SendOptions {
            skip_preflight: self.config.counter_skip_preflight,
        };
        self.run(
            &mut op,
            identity.as_ref(),
            Ok(vec![counter::initialize(payer, counter_address)]),
            &[&counter_keypair],
            options,
        )
        .await;

        if let Some(signature) = op.signature() {
            let previous = self.counter_key.write().replace(counter_address);
            if let Some(previous) = previous {
                self.counters.release(&previous);
            }
            self.settled(&op, signature).await;
            self.counters.publish_trigger(counter_address, signature).await;
            self.balances.publish_trigger(payer, signature).await;
        } else {
            self.rejected(&op).await;
        }
        Ok(self.report(op, counter_address))
    }

    /// Increment the current counter.
    pub async fn increment_counter(&self) -> Result<OperationReport, PreconditionError> {
        self.increment(None).await
    }

    /// Increment the counter at `counter_address`.
    pub async fn increment_counter_at(
        &self,
        counter_address: Address,
    ) -> Result<OperationReport, PreconditionError> {
        self.increment(Some(counter_address)).await
    }

    /// Transfer `lamports` from the identity to `recipient` (text address).
    pub async fn transfer_value(
        &self,
        recipient: &str,
        lamports: u64,
    ) -> Result<OperationReport, PreconditionError> {
        self.transfer(recipient, Ok(lamports)).await
    }

    /// Transfer a whole-token amount.
    pub async fn transfer_sol(
        &self,
        recipient: &str,
        amount: f64,
    ) -> Result<OperationReport, PreconditionError> {
        let lamports = sol_to_lamports(amount)
            .ok_or_else(|| PreconditionError::InvalidAmount(amount.to_string()));
        self.transfer(recipient, lamports).await
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Value of the current counter, recomputed under the latest signature.
    pub async fn counter_value(&self) -> Option<Tracked<CounterAccount>> {
        let counter = self.counter_key()?;
        self.counter_value_at(counter).await
    }

    /// Value of the counter at `address`.
    pub async fn counter_value_at(&self, address: Address) -> Option<Tracked<CounterAccount>> {
        self.counters.track(address, self.last_signature()).await
    }

    /// Balance of the connected identity.
    pub async fn balance(&self) -> Option<Tracked<Balance>> {
        let address = self.current_identity()?.address();
        self.balance_of(address).await
    }

    /// Balance of any address.
    pub async fn balance_of(&self, address: Address) -> Option<Tracked<Balance>> {
        self.balances.track(address, self.last_signature()).await
    }

    /// Published counter values for `address`.
    pub fn subscribe_counter(
        &self,
        address: Address,
    ) -> impl Stream<Item = Tracked<CounterAccount>> + Send {
        self.counters.subscribe(address)
    }

    /// Published balances for `address`.
    pub fn subscribe_balance(&self, address: Address) -> impl Stream<Item = Tracked<Balance>> + Send {
        self.balances.subscribe(address)
    }

    /// Operation outcomes and notices.
    pub fn subscribe_events(&self, filter: EventFilter) -> Subscription {
        self.bus.subscribe(filter)
    }

    /// The event bus this facade publishes to.
    pub fn event_bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Address of the most recently created counter.
    pub fn counter_key(&self) -> Option<Address> {
        *self.counter_key.read()
    }

    /// Most recent settled signature.
    pub fn last_signature(&self) -> Option<Signature> {
        *self.last_signature.read()
    }

    /// Explorer link for the most recent settled signature.
    pub fn explorer_link(&self) -> Option<String> {
        self.last_signature().map(|signature| self.explorer_url(&signature))
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Capability swaps
    // =========================================================================

    /// Connect, switch or disconnect the signing identity. Tracked views are
    /// recomputed for the new identity.
    pub async fn set_identity(&self, identity: Option<Arc<dyn SigningIdentity>>) {
        let address = identity.as_ref().map(|id| id.address());
        *self.identity.write() = identity;
        info!("[lf-03] Identity set to {:?}", address);
        self.counters.set_identity(address);
        self.balances.set_identity(address);
        self.counters.refresh_all().await;
        self.balances.refresh_all().await;
    }

    /// Switch the ledger connection. Tracked views are recomputed.
    pub async fn set_connection(&self, connection: Arc<dyn LedgerConnection>) {
        *self.connection.write() = connection.clone();
        self.counters.set_connection(connection.clone());
        self.balances.set_connection(connection);
        self.counters.refresh_all().await;
        self.balances.refresh_all().await;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn increment(
        &self,
        explicit: Option<Address>,
    ) -> Result<OperationReport, PreconditionError> {
        let mut op = Operation::new(OperationKind::IncrementCounter);
        self.advance(&mut op, OperationState::Building);

        let identity = match self.current_identity() {
            Some(identity) => identity,
            None => {
                return Err(self
                    .precondition_failed(&mut op, PreconditionError::NoIdentity)
                    .await)
            }
        };
        let counter_address = match explicit.or_else(|| self.counter_key()) {
            Some(address) => address,
            None => {
                return Err(self
                    .precondition_failed(&mut op, PreconditionError::NoCounter)
                    .await)
            }
        };

        let _guard = self.lock_address(counter_address).await;
        let options = SendOptions {
            skip_preflight: self.config.counter_skip_preflight,
        };
        self.run(
            &mut op,
            identity.as_ref(),
            Ok(vec![counter::increment(counter_address)]),
            &[],
            options,
        )
        .await;

        if let Some(signature) = op.signature() {
            self.settled(&op, signature).await;
            self.counters.publish_trigger(counter_address, signature).await;
            self.balances
                .publish_trigger(identity.address(), signature)
                .await;
        } else {
            self.rejected(&op).await;
        }
        Ok(self.report(op, counter_address))
    }

    async fn transfer(
        &self,
        recipient: &str,
        lamports: Result<u64, PreconditionError>,
    ) -> Result<OperationReport, PreconditionError> {
        let mut op = Operation::new(OperationKind::TransferValue);
        self.advance(&mut op, OperationState::Building);

        let checked = self.current_identity().ok_or(PreconditionError::NoIdentity).and_then(
            |identity| {
                let recipient = Self::parse_recipient(recipient)?;
                let lamports = lamports?;
                if lamports == 0 {
                    return Err(PreconditionError::ZeroAmount);
                }
                Ok((identity, recipient, lamports))
            },
        );
        let (identity, recipient, lamports) = match checked {
            Ok(checked) => checked,
            Err(e) => return Err(self.precondition_failed(&mut op, e).await),
        };
        let payer = identity.address();

        let _guard = self.lock_address(payer).await;
        let instruction = system::transfer(payer, recipient, lamports).map(|ix| vec![ix]);
        let options = SendOptions {
            skip_preflight: self.config.transfer_skip_preflight,
        };
        self.run(&mut op, identity.as_ref(), instruction, &[], options)
            .await;

        if let Some(signature) = op.signature() {
            self.settled(&op, signature).await;
            // The post-transfer balance comes from the ledger, never from
            // local arithmetic.
            self.balances.publish_trigger(payer, signature).await;
        } else {
            self.rejected(&op).await;
        }
        Ok(self.report(op, recipient))
    }

    fn parse_recipient(text: &str) -> Result<Address, PreconditionError> {
        if text.trim().is_empty() {
            return Err(PreconditionError::MissingRecipient);
        }
        text.parse::<Address>()
            .map_err(|e| PreconditionError::InvalidRecipient(e.to_string()))
    }

    /// Build and submit. Leaves `op` in `Settled` or `Rejected`.
    async fn run(
        &self,
        op: &mut Operation,
        identity: &dyn SigningIdentity,
        instructions: Result<Vec<Instruction>, LedgerError>,
        extra_signers: &[&dyn CoSigner],
        options: SendOptions,
    ) {
        let connection = self.current_connection();

        let built = match instructions {
            Ok(instructions) => {
                self.builder
                    .build(Some(identity.address()), instructions, connection.as_ref())
                    .await
            }
            Err(e) => Err(e.into()),
        };
        let tx = match built {
            Ok(tx) => tx,
            Err(e) => {
                warn!("[lf-03] {} {} build failed: {}", op.kind(), op.id(), e);
                self.advance(
                    op,
                    OperationState::Rejected {
                        reason: RejectReason::Build(e),
                    },
                );
                return;
            }
        };

        self.advance(op, OperationState::Submitting);
        let submitter = TransactionSubmitter::new(connection);
        let next = match submitter.submit(tx, identity, extra_signers, options).await {
            Ok(result) => Self::state_for(result),
            Err(e) => {
                error!("[lf-03] {} {} refused by lifecycle: {}", op.kind(), op.id(), e);
                OperationState::Rejected {
                    reason: RejectReason::Contract(e),
                }
            }
        };
        self.advance(op, next);
    }

    fn state_for(result: SubmissionResult) -> OperationState {
        match result.confirmed_signature() {
            Some(signature) => OperationState::Settled { signature },
            None => OperationState::Rejected {
                reason: RejectReason::Submission(
                    result.error.unwrap_or(ErrorKind::RejectedByLedger),
                ),
            },
        }
    }

    fn advance(&self, op: &mut Operation, next: OperationState) {
        if let Err(e) = op.transition(next) {
            error!("[lf-03] {}", e);
        }
    }

    async fn precondition_failed(
        &self,
        op: &mut Operation,
        err: PreconditionError,
    ) -> PreconditionError {
        self.advance(op, OperationState::Idle);
        warn!("[lf-03] {} not started: {}", op.kind(), err);
        self.bus
            .publish(ClientEvent::Notice(UserNotice::error(err.to_string())))
            .await;
        err
    }

    async fn settled(&self, op: &Operation, signature: Signature) {
        *self.last_signature.write() = Some(signature);
        info!(signature = %signature, "[lf-03] {} {} settled", op.kind(), op.id());
        self.bus
            .publish(ClientEvent::OperationSettled {
                operation_id: op.id(),
                kind: op.kind(),
                signature,
            })
            .await;
    }

    async fn rejected(&self, op: &Operation) {
        let reason = match op.state() {
            OperationState::Rejected { reason } => reason.to_string(),
            other => format!("unexpected state {other:?}"),
        };
        warn!("[lf-03] {} {} rejected: {}", op.kind(), op.id(), reason);
        self.bus
            .publish(ClientEvent::OperationRejected {
                operation_id: op.id(),
                kind: op.kind(),
                reason,
            })
            .await;
        self.bus
            .publish(ClientEvent::Notice(UserNotice::error(
                TRANSACTION_FAILED_NOTICE,
            )))
            .await;
    }

    fn report(&self, op: Operation, target: Address) -> OperationReport {
        let signature = op.signature();
        OperationReport {
            id: op.id(),
            kind: op.kind(),
            state: op.state().clone(),
            target,
            signature,
            explorer_url: signature.map(|sig| self.explorer_url(&sig)),
            history: op.history().to_vec(),
        }
    }

    fn explorer_url(&self, signature: &Signature) -> String {
        explorer_tx_url(&self.config.explorer_host, signature, self.config.cluster)
    }

    async fn lock_address(&self, address: Address) -> Option<OwnedMutexGuard<()>> {
        if !self.config.serialize_same_address {
            return None;
        }
        let lock = {
            let mut locks = self.address_locks.lock();
            // A lock only the map refers to is neither held nor awaited.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(address)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        Some(lock.lock_owned().await)
    }

    fn current_identity(&self) -> Option<Arc<dyn SigningIdentity>> {
        self.identity.read().clone()
    }

    fn current_connection(&self) -> Arc<dyn LedgerConnection> {
        self.connection.read().clone()
    }
}
