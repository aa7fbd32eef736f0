use std::fmt;
use thiserror::Error;

use crate::models::Marker;

/// ModerationState
///
/// Lifecycle of a report. `Pending` is the state every marker is created in;
/// there is no `Deleted` variant because removed markers are physically gone
/// from the store and can never be observed or re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationState {
    Pending,
    Approved,
}

impl ModerationState {
    pub fn of(marker: &Marker) -> Self {
        if marker.approved {
            ModerationState::Approved
        } else {
            ModerationState::Pending
        }
    }

    /// apply
    ///
    /// Transition table:
    ///
    /// | from     | approve   | reject  | withdraw |
    /// |----------|-----------|---------|----------|
    /// | Pending  | Approved  | removed | removed  |
    /// | Approved | no-op     | invalid | removed  |
    pub fn apply(self, transition: Transition) -> Result<Effect, InvalidTransition> {
        match (self, transition) {
            (ModerationState::Pending, Transition::Approve) => Ok(Effect::MarkApproved),
            (ModerationState::Approved, Transition::Approve) => Ok(Effect::Unchanged),
            (ModerationState::Pending, Transition::Reject) => Ok(Effect::Remove),
            (ModerationState::Approved, Transition::Reject) => Err(InvalidTransition {
                from: self,
                transition,
            }),
            (_, Transition::Withdraw) => Ok(Effect::Remove),
        }
    }
}

impl fmt::Display for ModerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModerationState::Pending => f.write_str("pending"),
            ModerationState::Approved => f.write_str("approved"),
        }
    }
}

/// Transition
///
/// `Approve` and `Reject` are the admin moderation actions; `Withdraw` is the
/// general delete (owner, or admin override).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
    Withdraw,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Approve => f.write_str("approve"),
            Transition::Reject => f.write_str("reject"),
            Transition::Withdraw => f.write_str("delete"),
        }
    }
}

/// What the store has to do to realise a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    MarkApproved,
    Unchanged,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {transition} a marker that is already {from}")]
pub struct InvalidTransition {
    pub from: ModerationState,
    pub transition: Transition,
}
