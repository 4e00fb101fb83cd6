//! # Shared Bus - Event Bus for Client Notifications
//!
//! Carries the outcome of every operation and the single user-visible
//! notice each failure produces.
//!
//! ```text
//! ┌────────────────┐                    ┌──────────────┐
//! │ OperationFacade│    publish()       │ UI / embedder│
//! │                │ ──────┐            │              │
//! └────────────────┘       │            └──────────────┘
//!                          ▼                    ↑
//!                    ┌──────────────┐          │
//!                    │  Event Bus   │ ─────────┘
//!                    └──────────────┘  subscribe()
//! ```
//!
//! Publishing never blocks and never fails: with no subscribers the event
//! is dropped and logged.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{ClientEvent, EventFilter, EventTopic, NoticeLevel, OperationKind, UserNotice};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 256);
    }
}
