//! PostgreSQL implementation of StudyReader.
//!
//! Reads the study app's tables directly. Loosely typed columns are cast to
//! text and validated through the raw-row conversions of the study module.
//! Integer keys are `INTEGER` in the study schema and are widened to `BIGINT`
//! in SQL so they decode as `i64`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, Username};
use crate::domain::study::{
    Decision, Event, QuestionnaireAnswer, RawConfidence, RawDecision, RawEvent, RawUser,
    SurveyAnswer, UserMetadata,
};
use crate::ports::StudyReader;

/// PostgreSQL implementation of StudyReader.
#[derive(Clone)]
pub struct PostgresStudyReader {
    pool: PgPool,
}

impl PostgresStudyReader {
    /// Creates a new PostgresStudyReader.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = r#"
    CAST(id AS BIGINT) AS id,
    CAST(username AS TEXT) AS username,
    CAST("group" AS TEXT) AS "group",
    CAST(time_begin AS TIMESTAMPTZ) AS time_begin,
    CAST(time_end AS TIMESTAMPTZ) AS time_end,
    COALESCE(questionnaire_complete, FALSE) AS questionnaire_complete,
    COALESCE(training_complete, FALSE) AS training_complete,
    COALESCE(survey_complete, FALSE) AS survey_complete,
    CAST(events AS TEXT) AS events
"#;

const EVENTS_QUERY: &str = r#"
    SELECT CAST(id AS BIGINT) AS id,
           CAST(should_escalate AS TEXT) AS should_escalate
    FROM event
    ORDER BY id
"#;

const DECISIONS_QUERY: &str = r#"
    SELECT CAST(id AS BIGINT) AS id,
           CAST(time_event_decision AS TIMESTAMPTZ) AS time_event_decision,
           CAST(escalate AS TEXT) AS escalate,
           CAST("user" AS TEXT) AS "user",
           CAST(confidence AS TEXT) AS confidence,
           CAST(event_id AS BIGINT) AS event_id
    FROM event_decision
    ORDER BY id
"#;

const QUESTIONNAIRE_QUERY: &str = r#"
    SELECT CAST(id AS BIGINT) AS id, CAST("user" AS TEXT) AS "user",
           CAST("timestamp" AS TIMESTAMPTZ) AS "timestamp",
           CAST(role AS TEXT) AS role,
           CAST(exp_researcher AS TEXT) AS exp_researcher,
           CAST(exp_admin AS TEXT) AS exp_admin,
           CAST(exp_software AS TEXT) AS exp_software,
           CAST(exp_security AS TEXT) AS exp_security,
           CAST(familiarity_none AS TEXT) AS familiarity_none,
           CAST(familiarity_read AS TEXT) AS familiarity_read,
           CAST(familiarity_controlled AS TEXT) AS familiarity_controlled,
           CAST(familiarity_public AS TEXT) AS familiarity_public,
           CAST(familiarity_engineered AS TEXT) AS familiarity_engineered,
           CAST(subnet_mask AS TEXT) AS subnet_mask,
           CAST(network_address AS TEXT) AS network_address,
           CAST(tcp_faster AS TEXT) AS tcp_faster,
           CAST(http_port AS TEXT) AS http_port,
           CAST(firewall AS TEXT) AS firewall,
           CAST(socket AS TEXT) AS socket,
           CAST(which_model AS TEXT) AS which_model
    FROM prequestionnaire_answer
    WHERE "user" = $1
    ORDER BY "timestamp" DESC NULLS LAST, id DESC
    LIMIT 1
"#;

const SURVEY_QUERY: &str = r#"
    SELECT CAST(id AS BIGINT) AS id, CAST("user" AS TEXT) AS "user",
           CAST("timestamp" AS TIMESTAMPTZ) AS "timestamp",
           CAST(NULLIF(CAST(mental AS TEXT), '') AS INTEGER) AS mental,
           CAST(NULLIF(CAST(physical AS TEXT), '') AS INTEGER) AS physical,
           CAST(NULLIF(CAST(temporal AS TEXT), '') AS INTEGER) AS temporal,
           CAST(NULLIF(CAST(performance AS TEXT), '') AS INTEGER) AS performance,
           CAST(NULLIF(CAST(effort AS TEXT), '') AS INTEGER) AS effort,
           CAST(NULLIF(CAST(frustration AS TEXT), '') AS INTEGER) AS frustration,
           CAST(useful_info AS TEXT) AS useful_info,
           CAST(feedback AS TEXT) AS feedback
    FROM survey_answer
    WHERE "user" = $1
    ORDER BY "timestamp" DESC NULLS LAST, id DESC
    LIMIT 1
"#;

#[async_trait]
impl StudyReader for PostgresStudyReader {
    async fn get_events(&self) -> Result<Vec<Event>, DomainError> {
        let rows = sqlx::query(EVENTS_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch events", e))?;

        rows.iter()
            .map(|row| -> Result<Event, DomainError> {
                let raw = RawEvent {
                    id: column(row, "id")?,
                    should_escalate: column(row, "should_escalate")?,
                };
                Ok(Event::try_from(raw)?)
            })
            .collect()
    }

    async fn get_decisions(&self) -> Result<Vec<Decision>, DomainError> {
        let rows = sqlx::query(DECISIONS_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch decisions", e))?;

        rows.iter().map(row_to_decision).collect()
    }

    async fn get_users(&self) -> Result<Vec<UserMetadata>, DomainError> {
        let sql = format!(r#"SELECT {} FROM "user" ORDER BY id"#, USER_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch users", e))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn get_user_metadata(&self, user: &Username) -> Result<Option<UserMetadata>, DomainError> {
        let sql = format!(r#"SELECT {} FROM "user" WHERE username = $1"#, USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch user", e))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_latest_questionnaire(
        &self,
        user: &Username,
    ) -> Result<Option<QuestionnaireAnswer>, DomainError> {
        let row = sqlx::query(QUESTIONNAIRE_QUERY)
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch questionnaire", e))?;

        row.as_ref().map(row_to_questionnaire).transpose()
    }

    async fn get_latest_survey(&self, user: &Username) -> Result<Option<SurveyAnswer>, DomainError> {
        let row = sqlx::query(SURVEY_QUERY)
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to fetch survey", e))?;

        row.as_ref().map(row_to_survey).transpose()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to get {}: {}", name, e),
        )
    })
}

fn timestamp_column(row: &PgRow, name: &str) -> Result<Option<Timestamp>, DomainError> {
    let value: Option<chrono::DateTime<chrono::Utc>> = column(row, name)?;
    Ok(value.map(Timestamp::from_datetime))
}

fn confidence_from_text(text: Option<String>) -> Option<RawConfidence> {
    text.map(RawConfidence::Text)
}

fn row_to_decision(row: &PgRow) -> Result<Decision, DomainError> {
    let time_event_decision = timestamp_column(row, "time_event_decision")?.ok_or_else(|| {
        DomainError::new(
            ErrorCode::InvalidRecord,
            "Decision without time_event_decision",
        )
    })?;

    let raw = RawDecision {
        id: column(row, "id")?,
        time_event_decision,
        escalate: column(row, "escalate")?,
        user: column(row, "user")?,
        confidence: confidence_from_text(column(row, "confidence")?),
        event_id: column(row, "event_id")?,
    };
    Ok(Decision::try_from(raw)?)
}

fn row_to_user(row: &PgRow) -> Result<UserMetadata, DomainError> {
    let raw = RawUser {
        id: column(row, "id")?,
        username: column(row, "username")?,
        group: column(row, "group")?,
        time_begin: timestamp_column(row, "time_begin")?,
        time_end: timestamp_column(row, "time_end")?,
        questionnaire_complete: column(row, "questionnaire_complete")?,
        training_complete: column(row, "training_complete")?,
        survey_complete: column(row, "survey_complete")?,
        events: column(row, "events")?,
    };
    Ok(UserMetadata::try_from(raw)?)
}

fn row_to_questionnaire(row: &PgRow) -> Result<QuestionnaireAnswer, DomainError> {
    Ok(QuestionnaireAnswer {
        id: column(row, "id")?,
        user: column(row, "user")?,
        timestamp: timestamp_column(row, "timestamp")?,
        role: column(row, "role")?,
        exp_researcher: column(row, "exp_researcher")?,
        exp_admin: column(row, "exp_admin")?,
        exp_software: column(row, "exp_software")?,
        exp_security: column(row, "exp_security")?,
        familiarity_none: column(row, "familiarity_none")?,
        familiarity_read: column(row, "familiarity_read")?,
        familiarity_controlled: column(row, "familiarity_controlled")?,
        familiarity_public: column(row, "familiarity_public")?,
        familiarity_engineered: column(row, "familiarity_engineered")?,
        subnet_mask: column(row, "subnet_mask")?,
        network_address: column(row, "network_address")?,
        tcp_faster: column(row, "tcp_faster")?,
        http_port: column(row, "http_port")?,
        firewall: column(row, "firewall")?,
        socket: column(row, "socket")?,
        which_model: column(row, "which_model")?,
    })
}

fn row_to_survey(row: &PgRow) -> Result<SurveyAnswer, DomainError> {
    Ok(SurveyAnswer {
        id: column(row, "id")?,
        user: column(row, "user")?,
        timestamp: timestamp_column(row, "timestamp")?,
        mental: column(row, "mental")?,
        physical: column(row, "physical")?,
        temporal: column(row, "temporal")?,
        performance: column(row, "performance")?,
        effort: column(row, "effort")?,
        frustration: column(row, "frustration")?,
        useful_info: column(row, "useful_info")?,
        feedback: column(row, "feedback")?,
    })
}
