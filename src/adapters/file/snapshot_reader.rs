//! Snapshot StudyReader Adapter
//!
//! Loads a JSON export of the study database. Sheets are keyed by table
//! name, matching the spreadsheet exports of the study app.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::adapters::memory::InMemoryStudyReader;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::study::{
    Decision, Event, QuestionnaireAnswer, RawDecision, RawEvent, RawUser, StudyError,
    SurveyAnswer, UserMetadata,
};

/// Raw tables of one study export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudySnapshot {
    #[serde(rename = "Event", default)]
    pub events: Vec<RawEvent>,
    #[serde(rename = "EventDecision", default)]
    pub decisions: Vec<RawDecision>,
    #[serde(rename = "User", default)]
    pub users: Vec<RawUser>,
    #[serde(rename = "PrequestionnaireAnswer", default)]
    pub questionnaires: Vec<QuestionnaireAnswer>,
    #[serde(rename = "SurveyAnswer", default)]
    pub surveys: Vec<SurveyAnswer>,
}

impl StudySnapshot {
    /// Validates every raw row and builds an in-memory reader.
    ///
    /// The first invalid row aborts the conversion.
    pub fn into_reader(self) -> Result<InMemoryStudyReader, StudyError> {
        let events = self
            .events
            .into_iter()
            .map(Event::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let decisions = self
            .decisions
            .into_iter()
            .map(Decision::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let users = self
            .users
            .into_iter()
            .map(UserMetadata::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InMemoryStudyReader::new()
            .with_events(events)
            .with_decisions(decisions)
            .with_users(users)
            .with_questionnaires(self.questionnaires)
            .with_surveys(self.surveys))
    }
}

/// Reads and validates a snapshot file.
pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<InMemoryStudyReader, DomainError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await.map_err(|e| {
        DomainError::new(
            ErrorCode::SnapshotError,
            format!("Failed to read snapshot {}: {}", path.display(), e),
        )
    })?;

    let snapshot: StudySnapshot = serde_json::from_str(&content).map_err(|e| {
        DomainError::new(
            ErrorCode::SnapshotError,
            format!("Failed to parse snapshot {}: {}", path.display(), e),
        )
    })?;

    let reader = snapshot.into_reader()?;
    tracing::debug!(
        path = %path.display(),
        decisions = reader.decision_count(),
        "Loaded study snapshot"
    );
    Ok(reader)
}
