//! # Adapters Module
//!
//! Concrete signing identities.

pub mod local_wallet;

pub use local_wallet::LocalWallet;
