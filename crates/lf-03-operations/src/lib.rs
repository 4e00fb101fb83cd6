//! # LF-03 Operations
//!
//! The user-facing use cases: create a counter, increment it, transfer
//! native value.
//!
//! **Subsystem ID:** 3
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Flow
//!
//! ```text
//! OperationFacade ──→ TransactionBuilder (lf-01) ──→ TransactionSubmitter (lf-01)
//!        │                                                  │
//!        │                      signature as trigger ◄──────┘
//!        ▼
//! AccountStateSync (lf-02) ──→ subscribers
//! ```
//!
//! Every precondition failure and every rejection publishes exactly one
//! notice on the event bus.
//!
//! ## Module Structure
//!
//! ```text
//! lf-03-operations/
//! ├── domain/          # Operation state machine, reports, errors
//! ├── programs/        # Counter and system program clients
//! ├── application/     # OperationFacade
//! ├── explorer.rs      # Explorer links
//! └── config.rs        # ClientConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod application;
pub mod config;
pub mod domain;
pub mod explorer;
pub mod programs;

// Re-exports
pub use application::OperationFacade;
pub use config::ClientConfig;
pub use domain::{
    ConfigError, Operation, OperationReport, OperationState, PreconditionError, RejectReason,
    TransitionError,
};
pub use explorer::{explorer_tx_url, Cluster};
pub use programs::{Balance, CounterAccount};
pub use shared_bus::OperationKind;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
