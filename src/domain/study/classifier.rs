//! Classifier - Confusion-matrix category of a decision against ground truth.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::records::{Answer, Decision, Event};
use super::StudyError;
use crate::domain::foundation::EventId;

/// Ground-truth lookup table of events.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    events: BTreeMap<EventId, Event>,
}

impl GroundTruth {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: events.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    /// Looks up the event a decision refers to; a missing event is fatal.
    pub fn event_for(&self, decision: &Decision) -> Result<&Event, StudyError> {
        self.get(decision.event_id).ok_or_else(|| StudyError::UnknownEvent {
            user: decision.user.clone(),
            event_id: decision.event_id,
        })
    }

    /// Events in id order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Confusion-matrix category of a single decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    TruePositive,
    FalsePositive,
    TrueNegative,
    FalseNegative,
    /// "I don't know" answers; excluded from the confusion matrix.
    Indeterminate,
}

impl Classification {
    /// Short label, e.g. `TP`.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::TruePositive => "TP",
            Classification::FalsePositive => "FP",
            Classification::TrueNegative => "TN",
            Classification::FalseNegative => "FN",
            Classification::Indeterminate => "IDK",
        }
    }

    /// True for TP and TN.
    pub fn is_correct(&self) -> bool {
        matches!(
            self,
            Classification::TruePositive | Classification::TrueNegative
        )
    }
}

/// Maps decisions to confusion-matrix categories.
pub struct Classifier;

impl Classifier {
    /// Classifies an answer given the event's ground truth.
    pub fn classify_answer(answer: Answer, should_escalate: bool) -> Classification {
        match (answer, should_escalate) {
            (Answer::DontKnow, _) => Classification::Indeterminate,
            (Answer::Escalate, true) => Classification::TruePositive,
            (Answer::DontEscalate, true) => Classification::FalseNegative,
            (Answer::DontEscalate, false) => Classification::TrueNegative,
            (Answer::Escalate, false) => Classification::FalsePositive,
        }
    }

    /// Classifies a decision against the ground truth of the event it names.
    ///
    /// # Errors
    /// [`StudyError::UnknownEvent`] if the event is not in `truth`.
    pub fn classify(decision: &Decision, truth: &GroundTruth) -> Result<Classification, StudyError> {
        let event = truth.event_for(decision)?;
        Ok(Self::classify_answer(decision.answer, event.should_escalate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DecisionId, Timestamp, Username};

    #[test]
    fn truth_table_for_escalation_events() {
        assert_eq!(
            Classifier::classify_answer(Answer::Escalate, true),
            Classification::TruePositive
        );
        assert_eq!(
            Classifier::classify_answer(Answer::DontEscalate, true),
            Classification::FalseNegative
        );
    }

    #[test]
    fn truth_table_for_benign_events() {
        assert_eq!(
            Classifier::classify_answer(Answer::DontEscalate, false),
            Classification::TrueNegative
        );
        assert_eq!(
            Classifier::classify_answer(Answer::Escalate, false),
            Classification::FalsePositive
        );
    }

    #[test]
    fn dont_know_is_always_indeterminate() {
        assert_eq!(
            Classifier::classify_answer(Answer::DontKnow, true),
            Classification::Indeterminate
        );
        assert_eq!(
            Classifier::classify_answer(Answer::DontKnow, false),
            Classification::Indeterminate
        );
    }

    #[test]
    fn only_true_categories_are_correct() {
        assert!(Classification::TruePositive.is_correct());
        assert!(Classification::TrueNegative.is_correct());
        assert!(!Classification::FalsePositive.is_correct());
        assert!(!Classification::FalseNegative.is_correct());
        assert!(!Classification::Indeterminate.is_correct());
    }

    fn decision_on(event: i64) -> Decision {
        Decision::new(
            DecisionId::new(1),
            Username::new("abcd1").unwrap(),
            EventId::new(event),
            Answer::Escalate,
            Some(70),
            Timestamp::from_unix_secs(1),
        )
    }

    #[test]
    fn classify_looks_up_the_decision_event() {
        let truth = GroundTruth::new(vec![
            Event::new(EventId::new(9), true),
            Event::new(EventId::new(10), false),
        ]);

        assert_eq!(
            Classifier::classify(&decision_on(9), &truth),
            Ok(Classification::TruePositive)
        );
        assert_eq!(
            Classifier::classify(&decision_on(10), &truth),
            Ok(Classification::FalsePositive)
        );
    }

    #[test]
    fn classify_fails_for_event_without_ground_truth() {
        let truth = GroundTruth::new(vec![Event::new(EventId::new(9), true)]);

        assert_eq!(
            Classifier::classify(&decision_on(11), &truth),
            Err(StudyError::UnknownEvent {
                user: Username::new("abcd1").unwrap(),
                event_id: EventId::new(11),
            })
        );
    }

    #[test]
    fn labels_are_short_codes() {
        assert_eq!(Classification::TruePositive.label(), "TP");
        assert_eq!(Classification::FalseNegative.label(), "FN");
    }
}
