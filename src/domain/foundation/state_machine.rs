//! Guarded status transitions.

use super::ValidationError;

/// A status enum whose legal moves are declared in one place.
///
/// ```ignore
/// session.status = session.status.transition_to(WizardStatus::Completed)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    fn can_transition_to(&self, target: &Self) -> bool;

    /// No transition leaves this state.
    fn is_terminal(&self) -> bool;

    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if !self.can_transition_to(&target) {
            return Err(ValidationError::invalid_format(
                "status",
                format!("{:?} cannot move to {:?}", self, target),
            ));
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Delivery {
        Pending,
        Sent,
        Dropped,
    }

    impl StateMachine for Delivery {
        fn can_transition_to(&self, target: &Self) -> bool {
            *self == Delivery::Pending && *target != Delivery::Pending
        }

        fn is_terminal(&self) -> bool {
            *self != Delivery::Pending
        }
    }

    #[test]
    fn legal_move_returns_the_target() {
        assert_eq!(Delivery::Pending.transition_to(Delivery::Sent), Ok(Delivery::Sent));
    }

    #[test]
    fn illegal_move_names_both_states() {
        let err = Delivery::Dropped.transition_to(Delivery::Sent).unwrap_err();
        assert_eq!(err.field(), "status");
        assert!(err.to_string().contains("Dropped cannot move to Sent"));
    }
}
