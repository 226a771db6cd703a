use crate::domain::profile::ClientProfile;
use crate::domain::recommendation::RecommendationRecord;
use crate::llm::json::parse_records;
use std::collections::BTreeSet;
use std::fmt;

/// How much of the model's answer is checked before it is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Any JSON list of objects is accepted as-is.
    #[default]
    Permissive,
    /// The list must also hold exactly one entry per batch client.
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileError {
    GenerationFailure(String),
    MalformedResponseFormat(String),
    CountMismatch {
        expected: Vec<i64>,
        got: Vec<Option<i64>>,
    },
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenerationFailure(detail) => write!(f, "generation failed: {detail}"),
            Self::MalformedResponseFormat(detail) => write!(f, "malformed response: {detail}"),
            Self::CountMismatch { expected, got } => write!(
                f,
                "answer does not cover the batch: expected client codes {expected:?}, got {got:?}"
            ),
        }
    }
}

impl std::error::Error for ReconcileError {}

/// Terminal state of one batch. Records of the two states are never mixed.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Done(Vec<RecommendationRecord>),
    Fallback {
        records: Vec<RecommendationRecord>,
        reason: ReconcileError,
    },
}

impl Reconciliation {
    pub fn records(&self) -> &[RecommendationRecord] {
        match self {
            Self::Done(records) | Self::Fallback { records, .. } => records,
        }
    }

    pub fn into_records(self) -> Vec<RecommendationRecord> {
        match self {
            Self::Done(records) | Self::Fallback { records, .. } => records,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// One placeholder record per profile, in batch order.
pub fn fallback_records(profiles: &[ClientProfile]) -> Vec<RecommendationRecord> {
    profiles
        .iter()
        .map(|p| RecommendationRecord::fallback(p.client_code))
        .collect()
}

/// Turns the gateway outcome for a batch into that batch's records.
pub fn reconcile(
    raw: anyhow::Result<String>,
    profiles: &[ClientProfile],
    mode: ReconcileMode,
) -> Reconciliation {
    let fallback = |reason: ReconcileError| Reconciliation::Fallback {
        records: fallback_records(profiles),
        reason,
    };

    let raw = match raw {
        Ok(raw) => raw,
        Err(err) => return fallback(ReconcileError::GenerationFailure(format!("{err:#}"))),
    };

    let records = match parse_records(&raw) {
        Ok(records) => records,
        Err(err) => return fallback(ReconcileError::MalformedResponseFormat(format!("{err:#}"))),
    };

    if mode == ReconcileMode::Strict {
        if let Err(reason) = check_coverage(&records, profiles) {
            return fallback(reason);
        }
    }

    Reconciliation::Done(records)
}

fn check_coverage(
    records: &[RecommendationRecord],
    profiles: &[ClientProfile],
) -> Result<(), ReconcileError> {
    let expected: BTreeSet<i64> = profiles.iter().map(|p| p.client_code).collect();
    let got: Vec<Option<i64>> = records.iter().map(RecommendationRecord::client_code).collect();

    let mut seen = BTreeSet::new();
    let covers = records.len() == profiles.len()
        && got
            .iter()
            .all(|code| matches!(code, Some(c) if expected.contains(c) && seen.insert(*c)));

    if covers {
        Ok(())
    } else {
        Err(ReconcileError::CountMismatch {
            expected: profiles.iter().map(|p| p.client_code).collect(),
            got,
        })
    }
}
