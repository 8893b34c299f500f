//! Aggregator - Per-user performance and per-event difficulty.
//!
//! Two zero-denominator conventions coexist here and both are intentional:
//! user-level rates fall back to `0.0`, event-level difficulty is `None`.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::classifier::{Classification, Classifier, GroundTruth};
use super::cohort::{Cohort, CohortAssigner};
use super::deduplicator::Deduplication;
use super::records::{Decision, Event};
use super::StudyError;
use crate::domain::foundation::{EventId, Username};

/// `numerator / denominator`, or 0 when the denominator is 0.
fn ratio_or_zero(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Confusion-matrix counts for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    #[serde(rename = "TP")]
    pub tp: usize,
    #[serde(rename = "FP")]
    pub fp: usize,
    #[serde(rename = "TN")]
    pub tn: usize,
    #[serde(rename = "FN")]
    pub fn_: usize,
}

impl ConfusionCounts {
    /// Adds one classified decision. Indeterminate answers are ignored.
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::TruePositive => self.tp += 1,
            Classification::FalsePositive => self.fp += 1,
            Classification::TrueNegative => self.tn += 1,
            Classification::FalseNegative => self.fn_ += 1,
            Classification::Indeterminate => {}
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// TP / (TP + FN), or 0.
    pub fn sensitivity(&self) -> f64 {
        ratio_or_zero(self.tp, self.tp + self.fn_)
    }

    /// TN / (TN + FP), or 0.
    pub fn specificity(&self) -> f64 {
        ratio_or_zero(self.tn, self.tn + self.fp)
    }

    /// TP / (TP + FP), or 0.
    pub fn precision(&self) -> f64 {
        ratio_or_zero(self.tp, self.tp + self.fp)
    }
}

/// Performance of one participant over their latest decisions.
///
/// Invariant: `confusion.total() + idk_count == decided_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAggregate {
    pub user: Username,
    pub decided_count: usize,
    pub percent_decided: f64,
    pub avg_confidence: f64,
    pub correct_count: usize,
    pub percent_correct: f64,
    pub idk_count: usize,
    pub confusion: ConfusionCounts,
    pub sensitivity: f64,
    pub specificity: f64,
    pub precision: f64,
}

impl UserAggregate {
    /// Aggregate of a user with no decisions.
    pub fn empty(user: Username) -> Self {
        Self {
            user,
            decided_count: 0,
            percent_decided: 0.0,
            avg_confidence: 0.0,
            correct_count: 0,
            percent_correct: 0.0,
            idk_count: 0,
            confusion: ConfusionCounts::default(),
            sensitivity: 0.0,
            specificity: 0.0,
            precision: 0.0,
        }
    }
}

/// Decisions and correct decisions of one cohort on one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CohortTally {
    pub count: usize,
    pub correct: usize,
}

impl CohortTally {
    /// correct / count, or `None` if nobody in the cohort decided.
    pub fn difficulty(&self) -> Option<f64> {
        (self.count > 0).then(|| self.correct as f64 / self.count as f64)
    }
}

/// Per-cohort correctness of one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventAggregate {
    pub id: EventId,
    pub should_escalate: bool,
    /// Tracked cohorts in reporting order, including empty ones.
    pub tallies: Vec<(Cohort, CohortTally)>,
}

impl EventAggregate {
    pub fn tally(&self, cohort: &Cohort) -> Option<&CohortTally> {
        self.tallies
            .iter()
            .find(|(c, _)| c == cohort)
            .map(|(_, tally)| tally)
    }

    /// Difficulty of one cohort; `None` if untracked or empty.
    pub fn difficulty(&self, cohort: &Cohort) -> Option<f64> {
        self.tally(cohort).and_then(CohortTally::difficulty)
    }

    /// Σcorrect / Σcount over cohorts that have decisions.
    ///
    /// Empty cohorts contribute to neither sum; `None` if all are empty.
    pub fn total_difficulty(&self) -> Option<f64> {
        let (correct, count) = self
            .tallies
            .iter()
            .filter(|(_, tally)| tally.count > 0)
            .fold((0, 0), |(correct, count), (_, tally)| {
                (correct + tally.correct, count + tally.count)
            });
        (count > 0).then(|| correct as f64 / count as f64)
    }
}

/// Folds classified decisions into user and event aggregates.
pub struct Aggregator;

impl Aggregator {
    /// Aggregates one user's latest decisions.
    ///
    /// Decisions on check events are skipped. `expected_total` is the number
    /// of events the user was expected to decide; a zero value yields a 0%
    /// decided rate.
    ///
    /// # Errors
    /// [`StudyError::UnknownEvent`] if a decision has no ground truth.
    pub fn aggregate_user<'a>(
        user: &Username,
        decisions: impl IntoIterator<Item = &'a Decision>,
        truth: &GroundTruth,
        check_events: &BTreeSet<EventId>,
        expected_total: usize,
    ) -> Result<UserAggregate, StudyError> {
        let mut confusion = ConfusionCounts::default();
        let mut decided = 0;
        let mut correct = 0;
        let mut idk = 0;
        let mut confidence_sum: i64 = 0;
        let mut with_confidence = 0;

        for decision in decisions {
            if check_events.contains(&decision.event_id) {
                continue;
            }
            let classification = Classifier::classify(decision, truth)?;

            decided += 1;
            if classification == Classification::Indeterminate {
                idk += 1;
            }
            if classification.is_correct() {
                correct += 1;
            }
            confusion.record(classification);

            if let Some(confidence) = decision.confidence {
                confidence_sum += i64::from(confidence);
                with_confidence += 1;
            }
        }

        let avg_confidence = if with_confidence == 0 {
            0.0
        } else {
            confidence_sum as f64 / with_confidence as f64
        };

        Ok(UserAggregate {
            user: user.clone(),
            decided_count: decided,
            percent_decided: ratio_or_zero(decided * 100, expected_total),
            avg_confidence,
            correct_count: correct,
            percent_correct: ratio_or_zero(correct * 100, decided),
            idk_count: idk,
            sensitivity: confusion.sensitivity(),
            specificity: confusion.specificity(),
            precision: confusion.precision(),
            confusion,
        })
    }

    /// Tallies one event's decisions per tracked cohort.
    ///
    /// Decisions for other events and users outside every tracked cohort are
    /// ignored. "I don't know" counts as decided but not correct.
    pub fn aggregate_event<'a>(
        event: &Event,
        decisions: impl IntoIterator<Item = &'a Decision>,
        cohorts: &dyn CohortAssigner,
    ) -> EventAggregate {
        let mut tallies: Vec<(Cohort, CohortTally)> = cohorts
            .cohorts()
            .into_iter()
            .map(|c| (c, CohortTally::default()))
            .collect();

        for decision in decisions.into_iter().filter(|d| d.event_id == event.id) {
            let Some(cohort) = cohorts.cohort_of(&decision.user) else {
                continue;
            };
            if let Some((_, tally)) = tallies.iter_mut().find(|(c, _)| *c == cohort) {
                tally.count += 1;
                if Classifier::classify_answer(decision.answer, event.should_escalate).is_correct() {
                    tally.correct += 1;
                }
            }
        }

        EventAggregate {
            id: event.id,
            should_escalate: event.should_escalate,
            tallies,
        }
    }

    /// Aggregates every non-check event, in id order.
    ///
    /// Every deduplicated decision is checked against the ground truth, from
    /// registered participants or not.
    ///
    /// # Errors
    /// [`StudyError::UnknownEvent`] if a non-check decision has no ground truth.
    pub fn aggregate_events(
        truth: &GroundTruth,
        deduplicated: &Deduplication,
        check_events: &BTreeSet<EventId>,
        cohorts: &dyn CohortAssigner,
    ) -> Result<Vec<EventAggregate>, StudyError> {
        let mut by_event: BTreeMap<EventId, Vec<&Decision>> = BTreeMap::new();
        for decision in deduplicated.decisions() {
            if check_events.contains(&decision.event_id) {
                continue;
            }
            truth.event_for(decision)?;
            by_event.entry(decision.event_id).or_default().push(decision);
        }

        Ok(truth
            .events()
            .filter(|event| !check_events.contains(&event.id))
            .map(|event| {
                let decisions = by_event.get(&event.id).map(Vec::as_slice).unwrap_or(&[]);
                Self::aggregate_event(event, decisions.iter().copied(), cohorts)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DecisionId, Timestamp};
    use crate::domain::study::{Answer, Deduplicator, TrailingCharCohorts};

    fn decision(id: i64, user: &str, event: i64, answer: Answer, conf: Option<i32>) -> Decision {
        Decision::new(
            DecisionId::new(id),
            Username::new(user).unwrap(),
            EventId::new(event),
            answer,
            conf,
            Timestamp::from_unix_secs(id),
        )
    }

    fn truth() -> GroundTruth {
        GroundTruth::new(vec![
            Event::new(EventId::new(1), true),
            Event::new(EventId::new(2), true),
            Event::new(EventId::new(3), false),
            Event::new(EventId::new(4), false),
            Event::new(EventId::new(74), true),
            Event::new(EventId::new(75), false),
        ])
    }

    fn check_events() -> BTreeSet<EventId> {
        [EventId::new(74), EventId::new(75)].into_iter().collect()
    }

    fn username(name: &str) -> Username {
        Username::new(name).unwrap()
    }

    #[test]
    fn user_aggregate_counts_confusion_and_rates() {
        let decisions = vec![
            decision(1, "abcd1", 1, Answer::Escalate, Some(80)),
            decision(2, "abcd1", 2, Answer::DontEscalate, Some(60)),
            decision(3, "abcd1", 3, Answer::DontEscalate, None),
            decision(4, "abcd1", 4, Answer::DontKnow, Some(10)),
        ];
        let agg = Aggregator::aggregate_user(&username("abcd1"), &decisions, &truth(), &check_events(), 8)
            .unwrap();

        assert_eq!(agg.confusion, ConfusionCounts { tp: 1, fp: 0, tn: 1, fn_: 1 });
        assert_eq!(agg.decided_count, 4);
        assert_eq!(agg.idk_count, 1);
        assert_eq!(agg.correct_count, 2);
        assert!((agg.percent_decided - 50.0).abs() < 1e-9);
        assert!((agg.percent_correct - 50.0).abs() < 1e-9);
        assert!((agg.avg_confidence - 50.0).abs() < 1e-9);
        assert!((agg.sensitivity - 0.5).abs() < 1e-9);
        assert!((agg.specificity - 1.0).abs() < 1e-9);
        assert!((agg.precision - 1.0).abs() < 1e-9);
    }

    #[test]
    fn confusion_plus_idk_equals_decided() {
        let decisions = vec![
            decision(1, "abcd1", 1, Answer::DontKnow, None),
            decision(2, "abcd1", 2, Answer::Escalate, None),
            decision(3, "abcd1", 3, Answer::Escalate, None),
            decision(4, "abcd1", 4, Answer::DontKnow, None),
        ];
        let agg = Aggregator::aggregate_user(&username("abcd1"), &decisions, &truth(), &check_events(), 4)
            .unwrap();
        assert_eq!(agg.confusion.total() + agg.idk_count, agg.decided_count);
    }

    #[test]
    fn check_events_are_excluded_from_user_aggregate() {
        let decisions = vec![
            decision(1, "abcd1", 74, Answer::Escalate, Some(100)),
            decision(2, "abcd1", 75, Answer::Escalate, Some(100)),
            decision(3, "abcd1", 3, Answer::DontEscalate, Some(20)),
        ];
        let agg = Aggregator::aggregate_user(&username("abcd1"), &decisions, &truth(), &check_events(), 5)
            .unwrap();
        assert_eq!(agg.decided_count, 1);
        assert_eq!(agg.confusion.tn, 1);
        assert!((agg.avg_confidence - 20.0).abs() < 1e-9);
    }

    #[test]
    fn zero_denominators_are_zero_at_user_level() {
        let decisions = vec![decision(1, "abcd1", 3, Answer::DontEscalate, None)];
        let agg = Aggregator::aggregate_user(&username("abcd1"), &decisions, &truth(), &check_events(), 0)
            .unwrap();

        assert_eq!(agg.sensitivity, 0.0);
        assert_eq!(agg.precision, 0.0);
        assert_eq!(agg.percent_decided, 0.0);
        assert_eq!(agg.avg_confidence, 0.0);
        assert!(!agg.sensitivity.is_nan());
    }

    #[test]
    fn user_without_decisions_is_all_zero() {
        let agg = Aggregator::aggregate_user(&username("abcd1"), &Vec::<Decision>::new(), &truth(), &check_events(), 10)
            .unwrap();
        assert_eq!(agg, UserAggregate::empty(username("abcd1")));
    }

    #[test]
    fn unknown_event_is_fatal() {
        let decisions = vec![decision(1, "abcd1", 99, Answer::Escalate, None)];
        let err = Aggregator::aggregate_user(&username("abcd1"), &decisions, &truth(), &check_events(), 1)
            .unwrap_err();
        assert_eq!(
            err,
            StudyError::UnknownEvent {
                user: username("abcd1"),
                event_id: EventId::new(99),
            }
        );
    }

    #[test]
    fn event_aggregate_tallies_per_cohort() {
        let event = Event::new(EventId::new(1), true);
        let decisions = vec![
            decision(1, "aaaa1", 1, Answer::Escalate, None),
            decision(2, "bbbb1", 1, Answer::DontEscalate, None),
            decision(3, "cccc3", 1, Answer::Escalate, None),
            decision(4, "dddd3", 1, Answer::DontKnow, None),
            decision(5, "eeee2", 1, Answer::Escalate, None),
            decision(6, "ffff1", 2, Answer::Escalate, None),
        ];
        let agg = Aggregator::aggregate_event(&event, &decisions, &TrailingCharCohorts::default());

        let one = Cohort::new("1");
        let three = Cohort::new("3");
        assert_eq!(agg.tally(&one), Some(&CohortTally { count: 2, correct: 1 }));
        assert_eq!(agg.tally(&three), Some(&CohortTally { count: 2, correct: 1 }));
        assert_eq!(agg.difficulty(&one), Some(0.5));
        assert_eq!(agg.total_difficulty(), Some(0.5));
    }

    #[test]
    fn empty_cohort_difficulty_is_missing_and_excluded_from_total() {
        let event = Event::new(EventId::new(3), false);
        let decisions = vec![
            decision(1, "aaaa1", 3, Answer::DontEscalate, None),
            decision(2, "bbbb1", 3, Answer::DontEscalate, None),
            decision(3, "cccc1", 3, Answer::Escalate, None),
        ];
        let agg = Aggregator::aggregate_event(&event, &decisions, &TrailingCharCohorts::default());

        assert_eq!(agg.difficulty(&Cohort::new("3")), None);
        let total = agg.total_difficulty().unwrap();
        assert!((total - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn event_without_decisions_has_no_total() {
        let event = Event::new(EventId::new(4), false);
        let agg = Aggregator::aggregate_event(&event, &Vec::<Decision>::new(), &TrailingCharCohorts::default());
        assert_eq!(agg.tallies.len(), 2);
        assert_eq!(agg.total_difficulty(), None);
    }

    #[test]
    fn aggregate_events_skips_check_events() {
        let deduplicated = Deduplicator::deduplicate(vec![
            decision(1, "aaaa1", 1, Answer::Escalate, None),
            decision(2, "aaaa1", 74, Answer::Escalate, None),
        ]);
        let events = Aggregator::aggregate_events(
            &truth(),
            &deduplicated,
            &check_events(),
            &TrailingCharCohorts::default(),
        )
        .unwrap();

        let ids: Vec<i64> = events.iter().map(|e| e.id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(events[0].difficulty(&Cohort::new("1")), Some(1.0));
    }

    #[test]
    fn aggregate_events_rejects_decision_without_ground_truth() {
        let deduplicated = Deduplicator::deduplicate(vec![
            decision(1, "aaaa1", 1, Answer::Escalate, None),
            decision(2, "zzzz9", 99, Answer::Escalate, None),
        ]);
        let err = Aggregator::aggregate_events(
            &truth(),
            &deduplicated,
            &check_events(),
            &TrailingCharCohorts::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            StudyError::UnknownEvent {
                user: username("zzzz9"),
                event_id: EventId::new(99),
            }
        );
    }
}
