//! # Ports Module
//!
//! Outbound capabilities consumed by the lifecycle. The traits live in
//! `shared-types` so every facade crate is built against the same ports.

pub use shared_types::{CoSigner, LedgerConnection, SendOptions, SigningIdentity};
