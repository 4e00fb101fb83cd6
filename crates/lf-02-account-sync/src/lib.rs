//! # LF-02 Account State Sync
//!
//! Keeps a local view of remote account state consistent with the most
//! recent confirmed operation.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Caching Policy
//!
//! A fetch happens only when the 4-tuple key changes:
//!
//! ```text
//! CacheKey = (connection endpoint, caller identity, tracked address, trigger)
//! ```
//!
//! The cache is an LRU of bounded capacity. There is no time-based expiry.
//!
//! ## Failure Policy
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Account does not exist | `Tracked::NotFound` (cached like any value) |
//! | Fetch or decode failed | warning logged, previous value returned, nothing cached |
//! | Fetch completes after the slot's trigger moved on | value returned to the caller, not published |
//!
//! ## Module Structure
//!
//! ```text
//! lf-02-account-sync/
//! ├── domain/          # CacheKey, Tracked, TrackedAccountView, DecodeError
//! ├── ports/           # AccountDecoder
//! ├── application/     # AccountStateSync
//! └── config.rs        # SyncConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use application::AccountStateSync;
pub use config::SyncConfig;
pub use domain::{CacheKey, DecodeError, Tracked, TrackedAccountView};
pub use ports::AccountDecoder;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
