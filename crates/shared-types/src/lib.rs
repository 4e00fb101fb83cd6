//! # Shared Types Crate
//!
//! This crate contains the ledger entities, the local Ed25519 keypair and
//! the capability traits that every facade crate is built against.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Address, Signature, Instruction and the
//!   transaction shapes are defined once, here.
//! - **Capabilities, not globals**: `LedgerConnection` and `SigningIdentity`
//!   are injected into each component; nothing reaches for ambient state.
//! - **Deterministic encoding**: the signed message is the bincode encoding
//!   of `UnsignedTransaction`, so a signature binds exactly one transaction.

pub mod capabilities;
pub mod entities;
pub mod errors;
pub mod keypair;

pub use capabilities::*;
pub use entities::*;
pub use errors::*;
pub use keypair::{verify_signature, Keypair};
