//! # Integration Tests Crate
//!
//! This crate contains integration tests that drive the operation facade,
//! the transaction lifecycle and account sync together against an
//! in-process ledger.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! ├── src/
//! │   ├── lib.rs          # This file
//! │   ├── ledger_sim.rs   # SimulatedLedger: executes counter and system programs
//! │   ├── yielding.rs     # YieldingConnection: suspends at every ledger call
//! │   └── flows.rs        # End-to-end scenarios
//! ```
//!
//! ## Scenarios (flows.rs)
//!
//! 1. **Sequential counter**: create, increment three times, read `count == 3`
//! 2. **Transfer**: balance decreases after a confirmed transfer
//! 3. **Race**: two unawaited increments are in flight together and both
//!    reach a terminal state; with the advisory lock they run in turn
//! 4. **Stale over absent**: failed reads keep the last value
//! 5. **Notices**: one notice per precondition failure or rejection
//! 6. **Freshness**: an expired token is rejected by the ledger

pub mod flows;
pub mod ledger_sim;
pub mod yielding;

pub use ledger_sim::SimulatedLedger;
pub use yielding::{LedgerCall, YieldingConnection};

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`. Safe to call from every
/// test.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
