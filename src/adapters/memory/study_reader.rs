//! In-Memory StudyReader Adapter
//!
//! Holds a fully loaded dataset. Backs the snapshot loader and tests.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Username};
use crate::domain::study::{
    select_latest, Decision, Event, QuestionnaireAnswer, SurveyAnswer, UserMetadata,
};
use crate::ports::StudyReader;

/// Study dataset kept in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStudyReader {
    events: Vec<Event>,
    decisions: Vec<Decision>,
    users: Vec<UserMetadata>,
    questionnaires: Vec<QuestionnaireAnswer>,
    surveys: Vec<SurveyAnswer>,
}

impl InMemoryStudyReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn with_decisions(mut self, decisions: impl IntoIterator<Item = Decision>) -> Self {
        self.decisions.extend(decisions);
        self
    }

    pub fn with_users(mut self, users: impl IntoIterator<Item = UserMetadata>) -> Self {
        self.users.extend(users);
        self
    }

    pub fn with_questionnaires(
        mut self,
        answers: impl IntoIterator<Item = QuestionnaireAnswer>,
    ) -> Self {
        self.questionnaires.extend(answers);
        self
    }

    pub fn with_surveys(mut self, answers: impl IntoIterator<Item = SurveyAnswer>) -> Self {
        self.surveys.extend(answers);
        self
    }

    /// Number of decision rows held.
    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }
}

#[async_trait]
impl StudyReader for InMemoryStudyReader {
    async fn get_events(&self) -> Result<Vec<Event>, DomainError> {
        Ok(self.events.clone())
    }

    async fn get_decisions(&self) -> Result<Vec<Decision>, DomainError> {
        Ok(self.decisions.clone())
    }

    async fn get_users(&self) -> Result<Vec<UserMetadata>, DomainError> {
        let mut users = self.users.clone();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn get_user_metadata(&self, user: &Username) -> Result<Option<UserMetadata>, DomainError> {
        Ok(self.users.iter().find(|u| &u.username == user).cloned())
    }

    async fn get_latest_questionnaire(
        &self,
        user: &Username,
    ) -> Result<Option<QuestionnaireAnswer>, DomainError> {
        Ok(select_latest(
            self.questionnaires
                .iter()
                .filter(|q| q.user == user.as_str())
                .cloned(),
        ))
    }

    async fn get_latest_survey(&self, user: &Username) -> Result<Option<SurveyAnswer>, DomainError> {
        Ok(select_latest(
            self.surveys
                .iter()
                .filter(|s| s.user == user.as_str())
                .cloned(),
        ))
    }
}
