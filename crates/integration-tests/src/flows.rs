//! # End-to-End Flows
//!
//! Scenarios running the operation facade against `SimulatedLedger`.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;
    use lf_01_transaction_lifecycle::{
        ErrorKind, LocalWallet, SubmissionStatus, TransactionBuilder, TransactionSubmitter,
    };
    use lf_02_account_sync::Tracked;
    use lf_03_operations::programs::{counter, Balance, LAMPORTS_PER_SOL};
    use lf_03_operations::{
        ClientConfig, CounterAccount, OperationFacade, OperationState, PreconditionError,
        RejectReason,
    };
    use shared_bus::{ClientEvent, EventFilter, EventTopic};
    use shared_types::{Address, LedgerConnection, SendOptions, SigningIdentity};

    use crate::ledger_sim::{SimulatedLedger, BLOCKHASH_VALIDITY};
    use crate::yielding::{LedgerCall, YieldingConnection};

    const STARTING_LAMPORTS: u64 = 10_000_000_000;

    /// A funded wallet connected to a facade over a fresh ledger.
    struct Harness {
        ledger: Arc<SimulatedLedger>,
        wallet: Arc<LocalWallet>,
        facade: OperationFacade,
    }

    impl Harness {
        fn with_config(config: ClientConfig) -> Self {
            Self::build(config, |ledger| ledger)
        }

        /// Route every ledger call through a `YieldingConnection` so joined
        /// operations interleave.
        fn yielding(config: ClientConfig) -> (Self, Arc<YieldingConnection>) {
            let mut wrapper = None;
            let h = Self::build(config, |ledger| {
                let conn = Arc::new(YieldingConnection::new(ledger));
                wrapper = Some(conn.clone());
                conn as Arc<dyn LedgerConnection>
            });
            (h, wrapper.unwrap())
        }

        fn build(
            config: ClientConfig,
            connect: impl FnOnce(Arc<dyn LedgerConnection>) -> Arc<dyn LedgerConnection>,
        ) -> Self {
            crate::init_test_tracing();
            let ledger = Arc::new(SimulatedLedger::default());
            let wallet = Arc::new(LocalWallet::generate());
            ledger.airdrop(wallet.address(), STARTING_LAMPORTS);

            let shared: Arc<dyn LedgerConnection> = ledger.clone();
            let connection = connect(shared);
            let identity: Arc<dyn SigningIdentity> = wallet.clone();
            let facade = OperationFacade::new(connection, Some(identity), config).unwrap();
            Self {
                ledger,
                wallet,
                facade,
            }
        }

        fn new() -> Self {
            Self::with_config(ClientConfig::for_testing())
        }
    }

    fn count(value: Option<Tracked<CounterAccount>>) -> Option<u64> {
        value.and_then(Tracked::into_found).map(|c| c.count)
    }

    fn notices(events: Vec<ClientEvent>) -> Vec<String> {
        events
            .into_iter()
            .filter_map(|event| match event {
                ClientEvent::Notice(notice) => Some(notice.message),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_then_three_increments() {
        let h = Harness::new();

        let created = h.facade.create_counter().await.unwrap();
        assert!(created.is_settled());
        assert_eq!(count(h.facade.counter_value().await), Some(0));

        for _ in 0..3 {
            let report = h.facade.increment_counter().await.unwrap();
            assert!(report.is_settled());
        }

        assert_eq!(count(h.facade.counter_value().await), Some(3));
    }

    #[tokio::test]
    async fn test_created_counter_is_never_not_found() {
        let h = Harness::new();
        let created = h.facade.create_counter().await.unwrap();
        let counter = created.target;

        let mut updates = Box::pin(h.facade.subscribe_counter(counter));
        assert_eq!(
            updates.next().await,
            Some(Tracked::Found(CounterAccount {
                address: counter,
                count: 0
            }))
        );
        assert_eq!(
            h.facade.counter_value_at(counter).await,
            Some(Tracked::Found(CounterAccount {
                address: counter,
                count: 0
            }))
        );
    }

    #[tokio::test]
    async fn test_counter_before_creation_is_not_found() {
        let h = Harness::new();
        let unknown = Address::new([42u8; 32]);
        assert_eq!(
            h.facade.counter_value_at(unknown).await,
            Some(Tracked::NotFound)
        );
        assert_eq!(h.facade.counter_value().await, None);
    }

    #[tokio::test]
    async fn test_transfer_decreases_balance() {
        let h = Harness::new();
        let recipient = Address::new([9u8; 32]);

        let before = h.facade.balance().await.and_then(Tracked::into_found).unwrap();
        let report = h
            .facade
            .transfer_sol(&recipient.to_string(), 1.0)
            .await
            .unwrap();
        assert!(report.is_settled());

        let after = h.facade.balance().await.and_then(Tracked::into_found).unwrap();
        assert!(after < before);
        assert_eq!(
            h.facade.balance_of(recipient).await,
            Some(Tracked::Found(Balance {
                lamports: LAMPORTS_PER_SOL
            }))
        );
    }

    #[tokio::test]
    async fn test_racing_increments_both_terminate() {
        let (h, conn) = Harness::yielding(ClientConfig::for_testing());
        let counter = h.facade.create_counter().await.unwrap().target;
        conn.clear_calls();

        let (a, b) = futures::join!(
            h.facade.increment_counter_at(counter),
            h.facade.increment_counter_at(counter)
        );
        let reports = [a.unwrap(), b.unwrap()];

        // Both transactions were built and broadcast before either confirmed.
        assert_eq!(
            conn.calls(),
            vec![
                LedgerCall::Freshness,
                LedgerCall::Freshness,
                LedgerCall::Send,
                LedgerCall::Send,
                LedgerCall::Confirm,
                LedgerCall::Confirm,
            ]
        );
        assert_ne!(reports[0].signature, reports[1].signature);
        for report in &reports {
            assert!(report.state.is_terminal());
        }
        let settled = reports.iter().filter(|r| r.is_settled()).count() as u64;
        assert_eq!(settled, 2);
        assert_eq!(count(h.facade.counter_value_at(counter).await), Some(settled));
    }

    #[tokio::test]
    async fn test_serialized_increments_apply_in_turn() {
        let (h, conn) = Harness::yielding(ClientConfig {
            serialize_same_address: true,
            ..ClientConfig::for_testing()
        });
        let counter = h.facade.create_counter().await.unwrap().target;
        conn.clear_calls();

        let reports = futures::future::join_all(
            (0..4).map(|_| h.facade.increment_counter_at(counter)),
        )
        .await;

        assert!(reports.into_iter().all(|r| r.unwrap().is_settled()));
        // Each increment completes its round trip before the next starts.
        let one_round = [LedgerCall::Freshness, LedgerCall::Send, LedgerCall::Confirm];
        assert_eq!(conn.calls(), one_round.repeat(4));
        assert_eq!(count(h.facade.counter_value_at(counter).await), Some(4));
    }

    #[tokio::test]
    async fn test_failed_reads_keep_last_value() {
        let h = Harness::new();
        h.facade.create_counter().await.unwrap();
        assert_eq!(count(h.facade.counter_value().await), Some(0));

        h.ledger.set_fail_reads(true);
        let report = h.facade.increment_counter().await.unwrap();
        assert!(report.is_settled());
        assert_eq!(count(h.facade.counter_value().await), Some(0));

        h.ledger.set_fail_reads(false);
        assert_eq!(count(h.facade.counter_value().await), Some(1));
    }

    #[tokio::test]
    async fn test_one_notice_per_failure() {
        let h = Harness::new();
        let mut events = h
            .facade
            .subscribe_events(EventFilter::topics(vec![EventTopic::Notices]));

        // Landed with skip_preflight, fails at confirmation.
        let missing = Address::new([3u8; 32]);
        let report = h.facade.increment_counter_at(missing).await.unwrap();
        assert_eq!(
            report.state,
            OperationState::Rejected {
                reason: RejectReason::Submission(ErrorKind::RejectedByLedger)
            }
        );
        assert_eq!(h.facade.last_signature(), None);

        // Refused at broadcast by preflight.
        let report = h
            .facade
            .transfer_value(&missing.to_string(), STARTING_LAMPORTS * 2)
            .await
            .unwrap();
        assert!(!report.is_settled());

        h.facade.set_identity(None).await;
        assert_eq!(
            h.facade.create_counter().await,
            Err(PreconditionError::NoIdentity)
        );

        assert_eq!(
            notices(events.drain()),
            vec![
                "Transaction failed!".to_string(),
                "Transaction failed!".to_string(),
                "Please connect your wallet.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_declined_signature_sends_nothing() {
        let h = Harness::new();
        h.wallet.set_declining(true);

        let report = h.facade.create_counter().await.unwrap();

        assert_eq!(
            report.state,
            OperationState::Rejected {
                reason: RejectReason::Submission(ErrorKind::UserDeclinedSigning)
            }
        );
        assert_eq!(h.ledger.broadcasts(), 0);
    }

    #[tokio::test]
    async fn test_lost_confirmation_is_connection_lost() {
        let h = Harness::new();
        h.ledger.set_fail_confirms(true);

        let report = h.facade.create_counter().await.unwrap();

        assert_eq!(
            report.state,
            OperationState::Rejected {
                reason: RejectReason::Submission(ErrorKind::ConnectionLost)
            }
        );
        assert_eq!(h.facade.counter_key(), None);
    }

    #[tokio::test]
    async fn test_expired_freshness_rejected_by_ledger() {
        let h = Harness::new();
        let connection: Arc<dyn LedgerConnection> = h.ledger.clone();
        let counter = h.facade.create_counter().await.unwrap().target;

        let tx = TransactionBuilder::new()
            .build(
                Some(h.wallet.address()),
                vec![counter::increment(counter)],
                connection.as_ref(),
            )
            .await
            .unwrap();
        h.ledger.advance_slots(BLOCKHASH_VALIDITY + 1);

        let result = TransactionSubmitter::new(connection)
            .submit(tx, h.wallet.as_ref(), &[], SendOptions::default())
            .await
            .unwrap();

        assert_eq!(result.status, SubmissionStatus::Failed);
        assert_eq!(result.error, Some(ErrorKind::RejectedByLedger));
        assert_eq!(count(h.facade.counter_value_at(counter).await), Some(0));
    }

    #[tokio::test]
    async fn test_connection_swap_recomputes_views() {
        let h = Harness::new();
        let counter = h.facade.create_counter().await.unwrap().target;
        assert_eq!(count(h.facade.counter_value().await), Some(0));

        let other: Arc<dyn LedgerConnection> = Arc::new(SimulatedLedger::new("sim://other"));
        h.facade.set_connection(other).await;

        assert_eq!(
            h.facade.counter_value_at(counter).await,
            Some(Tracked::NotFound)
        );
    }
}
