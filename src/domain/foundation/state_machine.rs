//! State machine trait for lifecycle enums.
//!
//! Gives every lifecycle enum the same validated transition surface so that
//! an illegal move is reported as a defect instead of being applied.

use super::{DomainError, ErrorCode};

/// Trait for status enums that represent state machines.
///
/// Implementors declare their edges once; `transition_to` and
/// `is_terminal` are derived from that declaration.
///
/// ```ignore
/// let next = session.detection_state.transition_to(DetectionState::Engaged)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Off,
        Blinking,
        On,
        Burnt,
    }

    impl StateMachine for Light {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Light::*;
            match self {
                Off => vec![Blinking, On],
                Blinking => vec![On, Off],
                On => vec![Off, Burnt],
                Burnt => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_declared_edge() {
        assert_eq!(Light::Off.transition_to(Light::On).unwrap(), Light::On);
    }

    #[test]
    fn transition_to_reports_invalid_state_transition() {
        let err = Light::Burnt.transition_to(Light::On).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert!(err.message.contains("Burnt"));
    }

    #[test]
    fn is_terminal_follows_valid_transitions() {
        assert!(Light::Burnt.is_terminal());
        assert!(!Light::Off.is_terminal());
    }
}
