//! Record model - decisions, events, and participant metadata.
//!
//! Raw rows (as exported from the study database or a snapshot file) are
//! converted into validated domain records here. Any answer text outside the
//! three known spellings aborts the run.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::StudyError;
use crate::domain::foundation::{DecisionId, EventId, Timestamp, Username};

/// The three answers a participant can submit for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Answer {
    #[serde(rename = "Escalate")]
    Escalate,
    #[serde(rename = "Don't escalate")]
    DontEscalate,
    #[serde(rename = "I don't know")]
    DontKnow,
}

impl Answer {
    /// Returns the label stored by the study application.
    pub fn label(&self) -> &'static str {
        match self {
            Answer::Escalate => "Escalate",
            Answer::DontEscalate => "Don't escalate",
            Answer::DontKnow => "I don't know",
        }
    }

    /// Parses a stored label. Returns `None` for anything unrecognized.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Escalate" => Some(Answer::Escalate),
            "Don't escalate" => Some(Answer::DontEscalate),
            "I don't know" => Some(Answer::DontKnow),
            _ => None,
        }
    }
}

/// A single submitted decision. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub decision_id: DecisionId,
    pub user: Username,
    pub event_id: EventId,
    pub answer: Answer,
    pub confidence: Option<i32>,
    pub timestamp: Timestamp,
}

/// The fields that make two submissions "the same answer".
///
/// Timestamp and decision id are deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnswerFingerprint {
    pub user: Username,
    pub event_id: EventId,
    pub answer: Answer,
    pub confidence: Option<i32>,
}

impl Decision {
    /// Creates a decision record.
    pub fn new(
        decision_id: DecisionId,
        user: Username,
        event_id: EventId,
        answer: Answer,
        confidence: Option<i32>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            decision_id,
            user,
            event_id,
            answer,
            confidence,
            timestamp,
        }
    }

    /// Returns the equality key used for resubmission-change detection.
    pub fn fingerprint(&self) -> AnswerFingerprint {
        AnswerFingerprint {
            user: self.user.clone(),
            event_id: self.event_id,
            answer: self.answer,
            confidence: self.confidence,
        }
    }

    /// Returns true if both decisions carry the same answer and confidence
    /// for the same user and event.
    pub fn same_answer_as(&self, other: &Decision) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

/// Confidence as it appears in exports: a number, numeric text, or the
/// literal `None` written by the study app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawConfidence {
    Number(i64),
    Text(String),
}

/// An `event_decision` row before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDecision {
    pub id: i64,
    pub time_event_decision: Timestamp,
    pub escalate: String,
    pub user: String,
    #[serde(default)]
    pub confidence: Option<RawConfidence>,
    pub event_id: i64,
}

impl TryFrom<RawDecision> for Decision {
    type Error = StudyError;

    fn try_from(raw: RawDecision) -> Result<Self, Self::Error> {
        let decision_id = DecisionId::new(raw.id);
        let answer = Answer::from_label(&raw.escalate).ok_or_else(|| StudyError::UnknownAnswer {
            decision_id,
            value: raw.escalate.clone(),
        })?;
        let user = Username::new(raw.user)
            .map_err(|e| StudyError::invalid_record("event_decision", e.to_string()))?;
        let confidence = parse_confidence(decision_id, raw.confidence)?;

        Ok(Decision::new(
            decision_id,
            user,
            EventId::new(raw.event_id),
            answer,
            confidence,
            raw.time_event_decision,
        ))
    }
}

fn parse_confidence(
    decision_id: DecisionId,
    raw: Option<RawConfidence>,
) -> Result<Option<i32>, StudyError> {
    let out_of_range = || {
        StudyError::invalid_record(
            "event_decision",
            format!("decision {} confidence does not fit an integer", decision_id),
        )
    };
    match raw {
        None => Ok(None),
        Some(RawConfidence::Number(n)) => i32::try_from(n).map(Some).map_err(|_| out_of_range()),
        Some(RawConfidence::Text(text)) => {
            let text = text.trim();
            if text.is_empty() || text == "None" {
                return Ok(None);
            }
            text.parse::<i32>().map(Some).map_err(|_| {
                StudyError::invalid_record(
                    "event_decision",
                    format!("decision {} has non-numeric confidence '{}'", decision_id, text),
                )
            })
        }
    }
}

/// A study event with its ground-truth label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub should_escalate: bool,
}

impl Event {
    /// Creates an event.
    pub fn new(id: EventId, should_escalate: bool) -> Self {
        Self { id, should_escalate }
    }
}

/// An `event` row before validation. `should_escalate` is stored as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: i64,
    pub should_escalate: String,
}

impl TryFrom<RawEvent> for Event {
    type Error = StudyError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let should_escalate = match raw.should_escalate.trim() {
            "1" | "true" | "True" => true,
            "0" | "false" | "False" => false,
            other => {
                return Err(StudyError::invalid_record(
                    "event",
                    format!("event {} has should_escalate '{}'", raw.id, other),
                ))
            }
        };
        Ok(Event::new(EventId::new(raw.id), should_escalate))
    }
}

/// Participant metadata from the `user` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMetadata {
    pub id: i64,
    pub username: Username,
    pub group: Option<String>,
    pub time_begin: Option<Timestamp>,
    pub time_end: Option<Timestamp>,
    pub questionnaire_complete: bool,
    pub training_complete: bool,
    pub survey_complete: bool,
    pub assigned_events: Vec<EventId>,
}

impl UserMetadata {
    /// Time between starting and finishing the task, if both are recorded.
    pub fn time_on_task(&self) -> Option<Duration> {
        match (self.time_begin, self.time_end) {
            (Some(begin), Some(end)) => Some(end.duration_since(&begin)),
            _ => None,
        }
    }
}

/// A `user` row before validation. Assigned events are a comma-separated list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub time_begin: Option<Timestamp>,
    #[serde(default)]
    pub time_end: Option<Timestamp>,
    #[serde(default)]
    pub questionnaire_complete: bool,
    #[serde(default)]
    pub training_complete: bool,
    #[serde(default)]
    pub survey_complete: bool,
    #[serde(default)]
    pub events: Option<String>,
}

impl TryFrom<RawUser> for UserMetadata {
    type Error = StudyError;

    fn try_from(raw: RawUser) -> Result<Self, Self::Error> {
        let username = Username::new(raw.username)
            .map_err(|e| StudyError::invalid_record("user", e.to_string()))?;
        let assigned_events = parse_assigned_events(raw.events.as_deref().unwrap_or(""))?;

        Ok(UserMetadata {
            id: raw.id,
            username,
            group: raw.group,
            time_begin: raw.time_begin,
            time_end: raw.time_end,
            questionnaire_complete: raw.questionnaire_complete,
            training_complete: raw.training_complete,
            survey_complete: raw.survey_complete,
            assigned_events,
        })
    }
}

/// Parses the comma-separated assigned event list, e.g. `"3,17,42"`.
pub fn parse_assigned_events(list: &str) -> Result<Vec<EventId>, StudyError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map(EventId::new).map_err(|_| {
                StudyError::invalid_record("user", format!("assigned event '{}' is not an id", s))
            })
        })
        .collect()
}

/// Most recent pre-questionnaire submission of a participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireAnswer {
    pub id: i64,
    pub user: String,
    pub timestamp: Option<Timestamp>,
    pub role: Option<String>,
    pub exp_researcher: Option<String>,
    pub exp_admin: Option<String>,
    pub exp_software: Option<String>,
    pub exp_security: Option<String>,
    pub familiarity_none: Option<String>,
    pub familiarity_read: Option<String>,
    pub familiarity_controlled: Option<String>,
    pub familiarity_public: Option<String>,
    pub familiarity_engineered: Option<String>,
    pub subnet_mask: Option<String>,
    pub network_address: Option<String>,
    pub tcp_faster: Option<String>,
    pub http_port: Option<String>,
    pub firewall: Option<String>,
    pub socket: Option<String>,
    pub which_model: Option<String>,
}

/// Post-task survey (NASA-TLX workload scales plus free text).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyAnswer {
    pub id: i64,
    pub user: String,
    pub timestamp: Option<Timestamp>,
    pub mental: Option<i32>,
    pub physical: Option<i32>,
    pub temporal: Option<i32>,
    pub performance: Option<i32>,
    pub effort: Option<i32>,
    pub frustration: Option<i32>,
    pub useful_info: Option<String>,
    pub feedback: Option<String>,
}
