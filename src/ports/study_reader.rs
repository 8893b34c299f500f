//! StudyReader port - read access to the exported study data.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Username};
use crate::domain::study::{Decision, Event, QuestionnaireAnswer, SurveyAnswer, UserMetadata};

/// Read-only port over one study dataset.
///
/// Implementations validate raw rows into domain records; an unrecognized
/// answer value surfaces as an error rather than being skipped.
#[async_trait]
pub trait StudyReader: Send + Sync {
    /// All events with their ground truth.
    async fn get_events(&self) -> Result<Vec<Event>, DomainError>;

    /// Every submitted decision, including resubmissions.
    async fn get_decisions(&self) -> Result<Vec<Decision>, DomainError>;

    /// All registered participants, ordered by id.
    async fn get_users(&self) -> Result<Vec<UserMetadata>, DomainError>;

    /// Metadata of one participant.
    async fn get_user_metadata(&self, user: &Username) -> Result<Option<UserMetadata>, DomainError>;

    /// Most recent pre-questionnaire of a participant.
    async fn get_latest_questionnaire(
        &self,
        user: &Username,
    ) -> Result<Option<QuestionnaireAnswer>, DomainError>;

    /// Most recent post-task survey of a participant.
    async fn get_latest_survey(&self, user: &Username) -> Result<Option<SurveyAnswer>, DomainError>;
}
