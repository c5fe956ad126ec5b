//! Detection lifecycle of a session.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Where a session stands in the detect-then-engage lifecycle.
///
/// - `New`: no inbound turns yet
/// - `Detecting`: the current inbound turn is being scored
/// - `Declined`: last turn scored below the scam threshold
/// - `Engaged`: a persona is talking to the sender
/// - `Terminated`: budget exhausted or extraction complete; read-only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionState {
    #[default]
    New,
    Detecting,
    Declined,
    Engaged,
    Terminated,
}

impl DetectionState {
    /// True while a persona is (or will keep) talking to the sender.
    pub fn is_engaged(&self) -> bool {
        matches!(self, Self::Engaged)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionState::New => "new",
            DetectionState::Detecting => "detecting",
            DetectionState::Declined => "declined",
            DetectionState::Engaged => "engaged",
            DetectionState::Terminated => "terminated",
        }
    }
}

impl StateMachine for DetectionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use DetectionState::*;
        matches!(
            (self, target),
            // First inbound turn
            (New, Detecting) |
            // Scoring outcome
            (Detecting, Engaged) |
            (Detecting, Declined) |
            // Budget exhausted before engagement
            (Detecting, Terminated) |
            // Next inbound turn is scored again
            (Declined, Detecting) |
            (Declined, Terminated) |
            // Engagement continues turn after turn
            (Engaged, Engaged) |
            (Engaged, Terminated)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use DetectionState::*;
        match self {
            New => vec![Detecting],
            Detecting => vec![Engaged, Declined, Terminated],
            Declined => vec![Detecting, Terminated],
            Engaged => vec![Engaged, Terminated],
            Terminated => vec![],
        }
    }
}

impl fmt::Display for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Steers what the persona prioritises while engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngagementMode {
    #[default]
    RapportBuilding,
    ExtractionFocused,
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    TurnBudgetExhausted,
    TimeBudgetExhausted,
    ExtractionComplete,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::TurnBudgetExhausted => "turn_budget_exhausted",
            TerminationReason::TimeBudgetExhausted => "time_budget_exhausted",
            TerminationReason::ExtractionComplete => "extraction_complete",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod transitions {
        use super::*;

        #[test]
        fn new_only_moves_to_detecting() {
            assert_eq!(
                DetectionState::New.valid_transitions(),
                vec![DetectionState::Detecting]
            );
            assert!(!DetectionState::New.can_transition_to(&DetectionState::Engaged));
        }

        #[test]
        fn declined_re_enters_detection() {
            assert!(DetectionState::Declined.can_transition_to(&DetectionState::Detecting));
            assert!(!DetectionState::Declined.can_transition_to(&DetectionState::Engaged));
        }

        #[test]
        fn engaged_loops_until_terminated() {
            assert!(DetectionState::Engaged.can_transition_to(&DetectionState::Engaged));
            assert!(DetectionState::Engaged.can_transition_to(&DetectionState::Terminated));
            assert!(!DetectionState::Engaged.can_transition_to(&DetectionState::Declined));
        }

        #[test]
        fn terminated_is_terminal() {
            assert!(DetectionState::Terminated.is_terminal());
            for target in [
                DetectionState::New,
                DetectionState::Detecting,
                DetectionState::Declined,
                DetectionState::Engaged,
                DetectionState::Terminated,
            ] {
                assert!(DetectionState::Terminated.transition_to(target).is_err());
            }
        }

        #[test]
        fn valid_transitions_agree_with_can_transition_to() {
            use DetectionState::*;
            let all = [New, Detecting, Declined, Engaged, Terminated];
            for from in all {
                for to in all {
                    assert_eq!(
                        from.valid_transitions().contains(&to),
                        from.can_transition_to(&to),
                        "{from} -> {to}"
                    );
                }
            }
        }
    }

    #[test]
    fn default_state_is_new() {
        assert_eq!(DetectionState::default(), DetectionState::New);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&TerminationReason::TurnBudgetExhausted).unwrap();
        assert_eq!(json, "\"turn_budget_exhausted\"");
    }
}
