//! State machine for tracking a single publish call
//!
//! `Idle → Resolving → {Failed | Resolved} → Uploading(N) → Done`

use crate::core::error::{PublishError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Publication state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationState {
    Idle,
    Resolving,
    Failed,
    Resolved,
    Uploading,
    Done,
}

impl PublicationState {
    /// Check whether `self → to` is a legal step
    pub fn can_transition_to(self, to: PublicationState) -> bool {
        use PublicationState::*;

        matches!(
            (self, to),
            (Idle, Resolving)
                | (Resolving, Failed)
                | (Resolving, Resolved)
                | (Resolved, Uploading)
                | (Uploading, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PublicationState::Failed | PublicationState::Done)
    }
}

impl fmt::Display for PublicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublicationState::Idle => "IDLE",
            PublicationState::Resolving => "RESOLVING",
            PublicationState::Failed => "FAILED",
            PublicationState::Resolved => "RESOLVED",
            PublicationState::Uploading => "UPLOADING",
            PublicationState::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    pub from: PublicationState,
    pub to: PublicationState,
    pub timestamp: DateTime<Utc>,

    /// Uploads still running when entering `Uploading`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outstanding: Option<usize>,
}

/// State machine for one publish call
#[derive(Debug)]
pub struct PublicationStateMachine {
    current_state: PublicationState,
    transitions: Vec<StateTransition>,
}

impl Default for PublicationStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PublicationStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: PublicationState::Idle,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new state
    ///
    /// Illegal steps leave the machine untouched and return
    /// [`PublishError::InvalidTransition`].
    pub fn transition(&mut self, to: PublicationState) -> Result<()> {
        self.record(to, None)
    }

    /// Enter `Uploading` with `outstanding` tasks in flight
    pub fn start_uploads(&mut self, outstanding: usize) -> Result<()> {
        self.record(PublicationState::Uploading, Some(outstanding))
    }

    fn record(&mut self, to: PublicationState, outstanding: Option<usize>) -> Result<()> {
        if !self.current_state.can_transition_to(to) {
            return Err(PublishError::InvalidTransition {
                from: self.current_state.to_string(),
                to: to.to_string(),
            });
        }

        log::debug!("publication state {} -> {}", self.current_state, to);

        self.transitions.push(StateTransition {
            from: self.current_state,
            to,
            timestamp: Utc::now(),
            outstanding,
        });
        self.current_state = to;

        Ok(())
    }

    pub fn state(&self) -> PublicationState {
        self.current_state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<StateTransition> {
        self.transitions
    }

    /// Transition history as human-readable string
    pub fn history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let outstanding = t
                    .outstanding
                    .map(|n| format!(" ({} outstanding)", n))
                    .unwrap_or_default();
                format!("{}: {} → {}{}", t.timestamp.to_rfc3339(), t.from, t.to, outstanding)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
