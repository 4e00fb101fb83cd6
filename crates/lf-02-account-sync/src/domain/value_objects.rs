//! # Domain Value Objects

use serde::{Deserialize, Serialize};
use shared_types::{Address, Signature};

/// Structural cache key. Two `track` calls with equal keys share one fetch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Endpoint of the connection used for the fetch.
    pub connection_id: String,
    /// Caller identity, if one is connected.
    pub identity: Option<Address>,
    /// Tracked account.
    pub address: Address,
    /// Recompute trigger (the latest relevant signature).
    pub trigger: Option<Signature>,
}

/// Result of tracking an account: decoded state, or absence on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tracked<T> {
    /// Account exists and decoded.
    Found(T),
    /// Account does not exist yet.
    NotFound,
}

impl<T> Tracked<T> {
    /// Whether the account exists.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Borrow the decoded value.
    pub fn found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    /// Take the decoded value.
    pub fn into_found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    /// Map the decoded value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Tracked<U> {
        match self {
            Self::Found(value) => Tracked::Found(f(value)),
            Self::NotFound => Tracked::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_differ_by_trigger() {
        let base = CacheKey {
            connection_id: "mock://ledger".to_string(),
            identity: None,
            address: Address::new([1u8; 32]),
            trigger: None,
        };
        let triggered = CacheKey {
            trigger: Some(Signature::new([2u8; 64])),
            ..base.clone()
        };

        let set: HashSet<CacheKey> = [base.clone(), triggered, base].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_tracked_accessors() {
        let found = Tracked::Found(3u64);
        assert!(found.is_found());
        assert_eq!(found.found(), Some(&3));
        assert_eq!(found.map(|v| v * 2), Tracked::Found(6));
        assert_eq!(Tracked::<u64>::NotFound.into_found(), None);
    }
}
