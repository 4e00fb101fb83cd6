//! # Domain Entities

use serde::{Deserialize, Serialize};
use shared_types::{Address, Signature};

use super::value_objects::Tracked;

/// Client-local view of one tracked account.
///
/// Only as fresh as `last_recompute_trigger`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAccountView<T> {
    /// Tracked account.
    pub address: Address,
    /// Most recent value published for the slot.
    pub last_fetched_value: Tracked<T>,
    /// Trigger the value was fetched under.
    pub last_recompute_trigger: Option<Signature>,
}
