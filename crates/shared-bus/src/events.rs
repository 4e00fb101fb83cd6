//! # Client Events
//!
//! Defines all event types that flow through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::Signature;
use std::fmt;
use uuid::Uuid;

/// The three user-facing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Create a new counter account.
    CreateCounter,
    /// Increment an existing counter.
    IncrementCounter,
    /// Transfer native value to another address.
    TransferValue,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateCounter => write!(f, "create-counter"),
            Self::IncrementCounter => write!(f, "increment-counter"),
            Self::TransferValue => write!(f, "transfer-value"),
        }
    }
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something the user must act on or know failed.
    Error,
}

/// A message meant to be shown to the user once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNotice {
    /// Severity.
    pub level: NoticeLevel,
    /// Display text.
    pub message: String,
}

impl UserNotice {
    /// An error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientEvent {
    /// An operation reached `Settled`.
    OperationSettled {
        /// Operation instance.
        operation_id: Uuid,
        /// Which use case.
        kind: OperationKind,
        /// Confirmed transaction signature.
        signature: Signature,
    },

    /// An operation reached `Rejected`.
    OperationRejected {
        /// Operation instance.
        operation_id: Uuid,
        /// Which use case.
        kind: OperationKind,
        /// Human-readable reason.
        reason: String,
    },

    /// A notice for the user.
    Notice(UserNotice),
}

impl ClientEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::OperationSettled { .. } | Self::OperationRejected { .. } => {
                EventTopic::Operations
            }
            Self::Notice(_) => EventTopic::Notices,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Operation outcomes.
    Operations,
    /// User-facing notices.
    Notices,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ClientEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
