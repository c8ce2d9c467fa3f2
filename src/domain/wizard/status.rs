//! WizardStatus enum for the lifecycle of a migration wizard session.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle status of a wizard session.
///
/// `Active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WizardStatus {
    #[default]
    Active,
    Completed,
    Expired,
    Cancelled,
}

impl WizardStatus {
    /// Returns true if decisions can still be recorded.
    pub fn is_active(&self) -> bool {
        matches!(self, WizardStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStatus::Active => "active",
            WizardStatus::Completed => "completed",
            WizardStatus::Expired => "expired",
            WizardStatus::Cancelled => "cancelled",
        }
    }
}

impl StateMachine for WizardStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use WizardStatus::*;
        matches!(
            (self, target),
            (Active, Completed) | (Active, Expired) | (Active, Cancelled)
        )
    }

    fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for WizardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_active() {
        assert_eq!(WizardStatus::default(), WizardStatus::Active);
    }

    #[test]
    fn active_reaches_every_terminal_state() {
        for target in [
            WizardStatus::Completed,
            WizardStatus::Expired,
            WizardStatus::Cancelled,
        ] {
            assert!(WizardStatus::Active.can_transition_to(&target));
            assert!(target.is_terminal());
        }
    }

    #[test]
    fn terminal_states_never_leave() {
        for from in [
            WizardStatus::Completed,
            WizardStatus::Expired,
            WizardStatus::Cancelled,
        ] {
            assert!(from.transition_to(WizardStatus::Active).is_err());
            assert!(from.transition_to(WizardStatus::Completed).is_err());
        }
    }

    #[test]
    fn active_cannot_transition_to_itself() {
        assert!(!WizardStatus::Active.can_transition_to(&WizardStatus::Active));
    }

    #[test]
    fn serializes_to_snake_case_json() {
        assert_eq!(
            serde_json::to_string(&WizardStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        let status: WizardStatus = serde_json::from_str("\"expired\"").unwrap();
        assert_eq!(status, WizardStatus::Expired);
    }
}
