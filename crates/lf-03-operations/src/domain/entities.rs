//! # Domain Entities

use shared_bus::OperationKind;
use shared_types::{Address, Signature};
use uuid::Uuid;

use super::errors::TransitionError;
use super::value_objects::OperationState;

/// One invocation of a use case and the states it went through.
#[derive(Debug, Clone)]
pub struct Operation {
    id: Uuid,
    kind: OperationKind,
    state: OperationState,
    history: Vec<OperationState>,
}

impl Operation {
    /// A fresh machine in `Idle`.
    pub fn new(kind: OperationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            state: OperationState::Idle,
            history: vec![OperationState::Idle],
        }
    }

    /// Instance identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Use case.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Current state.
    pub fn state(&self) -> &OperationState {
        &self.state
    }

    /// Every state entered, in order.
    pub fn history(&self) -> &[OperationState] {
        &self.history
    }

    /// Move to `next` if legal.
    pub fn transition(&mut self, next: OperationState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(&next) {
            return Err(TransitionError {
                from: self.state.clone(),
                to: next,
            });
        }
        self.history.push(next.clone());
        self.state = next;
        Ok(())
    }

    /// Confirmed signature, once settled.
    pub fn signature(&self) -> Option<Signature> {
        match self.state {
            OperationState::Settled { signature } => Some(signature),
            _ => None,
        }
    }
}

/// What the caller gets back from a started operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport {
    /// Instance identifier.
    pub id: Uuid,
    /// Use case.
    pub kind: OperationKind,
    /// Terminal state.
    pub state: OperationState,
    /// Account the operation wrote (the counter, or the transfer recipient).
    pub target: Address,
    /// Confirmed signature.
    pub signature: Option<Signature>,
    /// Explorer link for the confirmed signature.
    pub explorer_url: Option<String>,
    /// States entered, in order.
    pub history: Vec<OperationState>,
}

impl OperationReport {
    /// Whether the operation settled.
    pub fn is_settled(&self) -> bool {
        matches!(self.state, OperationState::Settled { .. })
    }
}
