//! Deduplicator - Latest decision per (user, event) and resubmission statistics.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::records::{AnswerFingerprint, Decision, QuestionnaireAnswer, SurveyAnswer};
use crate::domain::foundation::{EventId, Timestamp, Username};

/// Records that can be ordered by submission time.
///
/// `sequence` breaks ties between records sharing a timestamp: the highest
/// sequence wins. Records without a timestamp sort before all timed ones.
pub trait Chronological {
    fn recorded_at(&self) -> Option<Timestamp>;
    fn sequence(&self) -> i64;
}

impl Chronological for Decision {
    fn recorded_at(&self) -> Option<Timestamp> {
        Some(self.timestamp)
    }

    fn sequence(&self) -> i64 {
        self.decision_id.value()
    }
}

impl Chronological for QuestionnaireAnswer {
    fn recorded_at(&self) -> Option<Timestamp> {
        self.timestamp
    }

    fn sequence(&self) -> i64 {
        self.id
    }
}

impl Chronological for SurveyAnswer {
    fn recorded_at(&self) -> Option<Timestamp> {
        self.timestamp
    }

    fn sequence(&self) -> i64 {
        self.id
    }
}

fn chronological_key<T: Chronological>(item: &T) -> (Option<Timestamp>, i64) {
    (item.recorded_at(), item.sequence())
}

/// Picks the most recent record: max timestamp, then max sequence.
pub fn select_latest<T: Chronological>(items: impl IntoIterator<Item = T>) -> Option<T> {
    items
        .into_iter()
        .max_by(|a, b| chronological_key(a).cmp(&chronological_key(b)))
}

/// Grouping key for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DecisionKey {
    pub user: Username,
    pub event_id: EventId,
}

impl DecisionKey {
    fn of(decision: &Decision) -> Self {
        Self {
            user: decision.user.clone(),
            event_id: decision.event_id,
        }
    }
}

/// A (user, event) whose resubmissions changed the answer or confidence.
#[derive(Debug, Clone, Serialize)]
pub struct ChangedAnswer {
    pub user: Username,
    pub event_id: EventId,
    /// Distinct submissions, oldest first. Repeats are represented by
    /// their chronologically earliest submission, not the first one in
    /// input order, so the result does not depend on how rows were fetched.
    pub distinct: Vec<Decision>,
}

/// Resubmission statistics for one batch of decisions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResubmissionReport {
    pub total_decisions: usize,
    pub unique_users: usize,
    /// Submissions beyond the first for each (user, event).
    pub resubmitted: usize,
    pub changed: Vec<ChangedAnswer>,
}

impl ResubmissionReport {
    /// Number of answer changes: distinct submissions minus one, summed.
    pub fn change_count(&self) -> usize {
        self.changed.iter().map(|c| c.distinct.len() - 1).sum()
    }

    /// Number of (user, event) pairs with at least one change.
    pub fn changed_event_count(&self) -> usize {
        self.changed.len()
    }

    /// Changed (user, event) pairs per user.
    pub fn changes_by_user(&self) -> BTreeMap<Username, usize> {
        let mut counts = BTreeMap::new();
        for change in &self.changed {
            *counts.entry(change.user.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Result of deduplicating a batch of decisions.
#[derive(Debug, Clone, Default)]
pub struct Deduplication {
    latest: BTreeMap<DecisionKey, Decision>,
    report: ResubmissionReport,
}

impl Deduplication {
    /// Latest decision for each (user, event).
    pub fn latest(&self) -> &BTreeMap<DecisionKey, Decision> {
        &self.latest
    }

    /// Latest decision for a specific user and event.
    pub fn get(&self, user: &Username, event_id: EventId) -> Option<&Decision> {
        self.latest.get(&DecisionKey {
            user: user.clone(),
            event_id,
        })
    }

    /// All latest decisions in (user, event) order.
    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.latest.values()
    }

    /// Latest decisions of one user, in event order.
    pub fn for_user<'a>(&'a self, user: &'a Username) -> impl Iterator<Item = &'a Decision> {
        self.latest
            .iter()
            .filter(move |(key, _)| &key.user == user)
            .map(|(_, decision)| decision)
    }

    /// Users with at least one decision.
    pub fn users(&self) -> BTreeSet<&Username> {
        self.latest.keys().map(|key| &key.user).collect()
    }

    pub fn report(&self) -> &ResubmissionReport {
        &self.report
    }
}

/// Reduces submitted decisions to the latest per (user, event).
pub struct Deduplicator;

impl Deduplicator {
    /// Deduplicates decisions, in any input order.
    ///
    /// # Algorithm
    /// Decisions are sorted by (timestamp, decision id) and grouped by
    /// (user, event). The last decision of each group is the latest, so equal
    /// timestamps resolve to the highest decision id. Distinct submissions are
    /// tracked by [`AnswerFingerprint`] to detect changed answers.
    pub fn deduplicate(decisions: impl IntoIterator<Item = Decision>) -> Deduplication {
        let mut sorted: Vec<Decision> = decisions.into_iter().collect();
        sorted.sort_by(|a, b| chronological_key(a).cmp(&chronological_key(b)));

        let total_decisions = sorted.len();
        let mut groups: BTreeMap<DecisionKey, Vec<Decision>> = BTreeMap::new();
        for decision in sorted {
            groups.entry(DecisionKey::of(&decision)).or_default().push(decision);
        }

        let mut latest = BTreeMap::new();
        let mut report = ResubmissionReport {
            total_decisions,
            ..Default::default()
        };
        let mut users = BTreeSet::new();

        for (key, group) in groups {
            report.resubmitted += group.len() - 1;
            users.insert(key.user.clone());

            let mut seen: HashSet<AnswerFingerprint> = HashSet::new();
            let distinct: Vec<Decision> = group
                .iter()
                .filter(|d| seen.insert(d.fingerprint()))
                .cloned()
                .collect();

            if distinct.len() > 1 {
                report.changed.push(ChangedAnswer {
                    user: key.user.clone(),
                    event_id: key.event_id,
                    distinct,
                });
            }

            if let Some(last) = group.into_iter().last() {
                latest.insert(key, last);
            }
        }

        report.unique_users = users.len();
        Deduplication { latest, report }
    }
}
