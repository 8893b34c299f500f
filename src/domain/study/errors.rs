//! Errors raised by the study analytics core.

use thiserror::Error;

use crate::domain::foundation::{DecisionId, DomainError, ErrorCode, EventId, Username};

/// Fatal input problems that abort a batch run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StudyError {
    #[error("Decision {decision_id} has unrecognized answer '{value}'")]
    UnknownAnswer { decision_id: DecisionId, value: String },

    #[error("Decision by '{user}' references event {event_id} with no ground truth")]
    UnknownEvent { user: Username, event_id: EventId },

    #[error("Invalid {entity} record: {reason}")]
    InvalidRecord { entity: &'static str, reason: String },
}

impl StudyError {
    /// Creates an invalid record error.
    pub fn invalid_record(entity: &'static str, reason: impl Into<String>) -> Self {
        StudyError::InvalidRecord {
            entity,
            reason: reason.into(),
        }
    }
}

impl From<StudyError> for DomainError {
    fn from(err: StudyError) -> Self {
        match &err {
            StudyError::UnknownAnswer { decision_id, value } => {
                DomainError::new(ErrorCode::UnknownAnswer, err.to_string())
                    .with_detail("decision_id", decision_id.to_string())
                    .with_detail("value", value.clone())
            }
            StudyError::UnknownEvent { user, event_id } => {
                DomainError::new(ErrorCode::EventNotFound, err.to_string())
                    .with_detail("user", user.to_string())
                    .with_detail("event_id", event_id.to_string())
            }
            StudyError::InvalidRecord { entity, .. } => {
                DomainError::new(ErrorCode::InvalidRecord, err.to_string())
                    .with_detail("entity", *entity)
            }
        }
    }
}
