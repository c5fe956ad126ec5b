//! Artifacts and the per-session artifact set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::foundation::{Confidence, TurnSequence};

/// Kind of identifying artifact the engine extracts.
///
/// Declaration order is the priority used when asking for missing types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    BankAccount,
    PaymentHandle,
    Url,
    PhoneNumber,
}

impl ArtifactType {
    pub fn all() -> &'static [ArtifactType] {
        &[
            ArtifactType::BankAccount,
            ArtifactType::PaymentHandle,
            ArtifactType::Url,
            ArtifactType::PhoneNumber,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::BankAccount => "bank_account",
            ArtifactType::PaymentHandle => "payment_handle",
            ArtifactType::Url => "url",
            ArtifactType::PhoneNumber => "phone_number",
        }
    }

    /// Human phrasing used in prompts and agent notes.
    pub fn describe(&self) -> &'static str {
        match self {
            ArtifactType::BankAccount => "bank account details",
            ArtifactType::PaymentHandle => "UPI ID or payment handle",
            ArtifactType::Url => "website or link",
            ArtifactType::PhoneNumber => "phone number",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific enrichment recorded alongside an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifsc_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub suspected_phishing: bool,
}

impl ArtifactDetails {
    /// Fills fields missing on `self` from `other`.
    fn merge(&mut self, other: &ArtifactDetails) {
        if self.ifsc_code.is_none() {
            self.ifsc_code = other.ifsc_code.clone();
        }
        if self.bank_name.is_none() {
            self.bank_name = other.bank_name.clone();
        }
        if self.provider.is_none() {
            self.provider = other.provider.clone();
        }
        if self.domain.is_none() {
            self.domain = other.domain.clone();
        }
        self.suspected_phishing |= other.suspected_phishing;
    }
}

/// A typed, scored piece of intelligence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_type: ArtifactType,
    /// Normalized value; together with the type this is the identity.
    pub value: String,
    pub confidence: Confidence,
    pub first_seen: TurnSequence,
    pub verified: bool,
    #[serde(default)]
    pub details: ArtifactDetails,
}

impl Artifact {
    pub fn new(
        artifact_type: ArtifactType,
        value: impl Into<String>,
        confidence: Confidence,
        first_seen: TurnSequence,
    ) -> Self {
        Self {
            artifact_type,
            value: value.into(),
            confidence,
            first_seen,
            verified: false,
            details: ArtifactDetails::default(),
        }
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    pub fn with_details(mut self, details: ArtifactDetails) -> Self {
        self.details = details;
        self
    }

    pub fn key(&self) -> (ArtifactType, String) {
        (self.artifact_type, self.value.clone())
    }
}

/// What a merge did to the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Existing artifact gained confidence or verification.
    Raised,
    Unchanged,
}

impl UpsertOutcome {
    /// True when the artifact belongs in this turn's delta.
    pub fn changed(&self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged)
    }
}

/// Deduplicated artifacts of one session, keyed by (type, normalized value).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactSet {
    artifacts: BTreeMap<(ArtifactType, String), Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn get(&self, artifact_type: ArtifactType, value: &str) -> Option<&Artifact> {
        self.artifacts.get(&(artifact_type, value.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    /// Merges an observation.
    ///
    /// A repeat keeps the earliest first-seen turn, raises confidence to the
    /// maximum of both observations and never clears the verified flag.
    pub fn upsert(&mut self, artifact: Artifact) -> UpsertOutcome {
        match self.artifacts.get_mut(&artifact.key()) {
            None => {
                self.artifacts.insert(artifact.key(), artifact);
                UpsertOutcome::Inserted
            }
            Some(existing) => {
                let mut changed = false;
                if artifact.confidence > existing.confidence {
                    existing.confidence = artifact.confidence;
                    changed = true;
                }
                if artifact.verified && !existing.verified {
                    existing.verified = true;
                    changed = true;
                }
                if artifact.first_seen < existing.first_seen {
                    existing.first_seen = artifact.first_seen;
                }
                existing.details.merge(&artifact.details);
                if changed {
                    UpsertOutcome::Raised
                } else {
                    UpsertOutcome::Unchanged
                }
            }
        }
    }

    /// Merges a batch and returns this turn's delta: the stored form of every
    /// artifact that was inserted or raised.
    pub fn merge_all(&mut self, artifacts: impl IntoIterator<Item = Artifact>) -> Vec<Artifact> {
        let mut delta = Vec::new();
        for artifact in artifacts {
            let key = artifact.key();
            if self.upsert(artifact).changed() {
                if let Some(stored) = self.artifacts.get(&key) {
                    delta.push(stored.clone());
                }
            }
        }
        delta
    }

    /// Artifacts grouped by type, each group ordered by value.
    pub fn grouped(&self) -> BTreeMap<ArtifactType, Vec<Artifact>> {
        let mut groups: BTreeMap<ArtifactType, Vec<Artifact>> = BTreeMap::new();
        for artifact in self.artifacts.values() {
            groups
                .entry(artifact.artifact_type)
                .or_default()
                .push(artifact.clone());
        }
        groups
    }

    /// Number of artifacts of one type.
    pub fn count_of(&self, artifact_type: ArtifactType) -> usize {
        self.artifacts
            .keys()
            .filter(|(t, _)| *t == artifact_type)
            .count()
    }

    /// True when every target type has an artifact at or above `threshold`.
    pub fn is_complete(&self, targets: &[ArtifactType], threshold: f64) -> bool {
        targets.iter().all(|target| {
            self.artifacts
                .values()
                .any(|a| a.artifact_type == *target && a.confidence.meets(threshold))
        })
    }

    /// Target types with no artifact at all, in priority order.
    pub fn missing_types(&self, targets: &[ArtifactType]) -> Vec<ArtifactType> {
        let mut missing: Vec<ArtifactType> = targets
            .iter()
            .copied()
            .filter(|t| self.count_of(*t) == 0)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

impl FromIterator<Artifact> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = Artifact>>(iter: I) -> Self {
        let mut set = ArtifactSet::new();
        for artifact in iter {
            set.upsert(artifact);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(value: &str, confidence: f64, turn: u32) -> Artifact {
        Artifact::new(
            ArtifactType::PaymentHandle,
            value,
            Confidence::clamped(confidence),
            TurnSequence::new(turn),
        )
    }

    mod upsert {
        use super::*;

        #[test]
        fn first_observation_is_inserted() {
            let mut set = ArtifactSet::new();
            assert_eq!(set.upsert(handle("a@ybl", 0.6, 1)), UpsertOutcome::Inserted);
            assert_eq!(set.len(), 1);
        }

        #[test]
        fn repeat_is_idempotent() {
            let mut set = ArtifactSet::new();
            set.upsert(handle("a@ybl", 0.6, 1));
            assert_eq!(set.upsert(handle("a@ybl", 0.6, 2)), UpsertOutcome::Unchanged);
            assert_eq!(set.len(), 1);
        }

        #[test]
        fn repeat_raises_to_max_confidence() {
            let mut set = ArtifactSet::new();
            set.upsert(handle("a@ybl", 0.6, 1));
            assert_eq!(set.upsert(handle("a@ybl", 0.9, 3)), UpsertOutcome::Raised);
            assert_eq!(set.upsert(handle("a@ybl", 0.4, 4)), UpsertOutcome::Unchanged);

            let stored = set.get(ArtifactType::PaymentHandle, "a@ybl").unwrap();
            assert_eq!(stored.confidence, Confidence::clamped(0.9));
            assert_eq!(stored.first_seen, TurnSequence::new(1));
        }

        #[test]
        fn verified_flag_is_sticky() {
            let mut set = ArtifactSet::new();
            set.upsert(handle("a@ybl", 0.6, 1).verified(true));
            set.upsert(handle("a@ybl", 0.6, 2));
            assert!(set.get(ArtifactType::PaymentHandle, "a@ybl").unwrap().verified);
        }

        #[test]
        fn same_value_different_type_is_distinct() {
            let mut set = ArtifactSet::new();
            set.upsert(Artifact::new(
                ArtifactType::BankAccount,
                "9876543210",
                Confidence::clamped(0.5),
                TurnSequence::FIRST,
            ));
            set.upsert(Artifact::new(
                ArtifactType::PhoneNumber,
                "9876543210",
                Confidence::clamped(0.5),
                TurnSequence::FIRST,
            ));
            assert_eq!(set.len(), 2);
        }

        #[test]
        fn details_are_filled_in_later() {
            let mut set = ArtifactSet::new();
            set.upsert(Artifact::new(
                ArtifactType::BankAccount,
                "123456789012",
                Confidence::clamped(0.5),
                TurnSequence::FIRST,
            ));
            set.upsert(
                Artifact::new(
                    ArtifactType::BankAccount,
                    "123456789012",
                    Confidence::clamped(0.5),
                    TurnSequence::new(2),
                )
                .with_details(ArtifactDetails {
                    ifsc_code: Some("SBIN0001234".into()),
                    ..Default::default()
                }),
            );
            let stored = set.get(ArtifactType::BankAccount, "123456789012").unwrap();
            assert_eq!(stored.details.ifsc_code.as_deref(), Some("SBIN0001234"));
        }
    }

    mod merge {
        use super::*;

        #[test]
        fn delta_holds_only_changed_artifacts() {
            let mut set = ArtifactSet::new();
            set.upsert(handle("a@ybl", 0.9, 1));
            let delta = set.merge_all(vec![
                handle("a@ybl", 0.5, 2),
                handle("b@ybl", 0.5, 2),
            ]);
            assert_eq!(delta.len(), 1);
            assert_eq!(delta[0].value, "b@ybl");
        }

        #[test]
        fn delta_reports_stored_confidence_after_raise() {
            let mut set = ArtifactSet::new();
            set.upsert(handle("a@ybl", 0.5, 1));
            let delta = set.merge_all(vec![handle("a@ybl", 0.8, 2)]);
            assert_eq!(delta[0].confidence, Confidence::clamped(0.8));
            assert_eq!(delta[0].first_seen, TurnSequence::new(1));
        }
    }

    mod completeness {
        use super::*;

        #[test]
        fn complete_requires_every_target_above_threshold() {
            let mut set = ArtifactSet::new();
            set.upsert(handle("a@ybl", 0.95, 1));
            assert!(set.is_complete(&[ArtifactType::PaymentHandle], 0.9));
            assert!(!set.is_complete(&[ArtifactType::PaymentHandle, ArtifactType::Url], 0.9));
            assert!(!set.is_complete(&[ArtifactType::PaymentHandle], 0.99));
        }

        #[test]
        fn missing_types_follow_priority_order() {
            let mut set = ArtifactSet::new();
            set.upsert(handle("a@ybl", 0.5, 1));
            let missing = set.missing_types(&[
                ArtifactType::PhoneNumber,
                ArtifactType::PaymentHandle,
                ArtifactType::BankAccount,
            ]);
            assert_eq!(
                missing,
                vec![ArtifactType::BankAccount, ArtifactType::PhoneNumber]
            );
        }

        #[test]
        fn grouped_partitions_by_type() {
            let set: ArtifactSet = vec![handle("b@ybl", 0.5, 1), handle("a@ybl", 0.5, 1)]
                .into_iter()
                .collect();
            let groups = set.grouped();
            let handles = &groups[&ArtifactType::PaymentHandle];
            assert_eq!(handles.len(), 2);
            assert_eq!(handles[0].value, "a@ybl");
        }
    }
}
