//! # Ports Module
//!
//! The decoder turning raw account contents into typed program state,
//! plus the connection capability re-exported from `shared-types`.

use shared_types::{AccountInfo, Address};

use crate::domain::DecodeError;

pub use shared_types::LedgerConnection;

/// Decodes raw account contents - outbound port.
pub trait AccountDecoder: Send + Sync + 'static {
    /// Typed state produced by this decoder.
    type Output: Clone + Send + Sync + 'static;

    /// Decode the account at `address`.
    fn decode(&self, address: &Address, info: &AccountInfo) -> Result<Self::Output, DecodeError>;
}
