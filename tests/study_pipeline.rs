//! Integration tests for a full results run.
//!
//! These tests drive the `ComputeResultsHandler` end to end:
//! 1. Study data is served by the in-memory reader (or a snapshot file)
//! 2. Decisions are deduplicated, classified and aggregated
//! 3. The workbook is captured by an in-memory or JSON file writer
//!
//! No database is required.

use std::sync::Arc;

use tempfile::TempDir;

use crywolf_analytics::adapters::{
    load_snapshot, InMemoryReportWriter, InMemoryStudyReader, JsonReportWriter,
};
use crywolf_analytics::application::ComputeResultsHandler;
use crywolf_analytics::domain::foundation::{DecisionId, EventId, Timestamp, Username};
use crywolf_analytics::domain::study::{
    Answer, Cell, Decision, Event, ExclusionPolicy, QuestionnaireAnswer, StudyParameters,
    SurveyAnswer, Table, UserMetadata, Workbook, DIFFICULTY_TABLE, MASTER_COLUMNS, MASTER_TABLE,
    PERFORMANCE_TABLE, RESUBMISSION_TABLE,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn name(s: &str) -> Username {
    Username::new(s).unwrap()
}

fn participant(id: i64, username: &str, events: &[i64]) -> UserMetadata {
    UserMetadata {
        id,
        username: name(username),
        group: Some("pilot".to_string()),
        time_begin: Some(Timestamp::from_unix_secs(1_000)),
        time_end: Some(Timestamp::from_unix_secs(1_900)),
        questionnaire_complete: true,
        training_complete: true,
        survey_complete: true,
        assigned_events: events.iter().copied().map(EventId::new).collect(),
    }
}

fn decision(
    id: i64,
    user: &str,
    event: i64,
    answer: Answer,
    confidence: Option<i32>,
    at: i64,
) -> Decision {
    Decision::new(
        DecisionId::new(id),
        name(user),
        EventId::new(event),
        answer,
        confidence,
        Timestamp::from_unix_secs(at),
    )
}

/// Three analysed participants, one idle participant and two check events.
///
/// - abcd1 (cohort 1): FN after resubmission, TN, IDK
/// - efgh3 (cohort 3): TP, FP, TP, TN
/// - ijkl2 (untracked cohort): TP
fn study() -> InMemoryStudyReader {
    InMemoryStudyReader::new()
        .with_events(vec![
            Event::new(EventId::new(1), true),
            Event::new(EventId::new(2), false),
            Event::new(EventId::new(3), true),
            Event::new(EventId::new(4), false),
            Event::new(EventId::new(5), true),
            Event::new(EventId::new(74), true),
            Event::new(EventId::new(75), false),
        ])
        .with_users(vec![
            participant(1, "abcd1", &[1, 2, 3]),
            participant(2, "efgh3", &[1, 2, 3, 4]),
            participant(3, "ijkl2", &[1]),
            participant(4, "idle1", &[1, 2]),
        ])
        .with_decisions(vec![
            decision(1, "abcd1", 1, Answer::Escalate, Some(80), 10),
            decision(2, "abcd1", 1, Answer::DontEscalate, Some(60), 20),
            decision(3, "abcd1", 2, Answer::DontEscalate, Some(90), 30),
            decision(4, "abcd1", 3, Answer::DontKnow, None, 40),
            decision(5, "abcd1", 74, Answer::Escalate, Some(100), 50),
            decision(6, "efgh3", 1, Answer::Escalate, Some(70), 10),
            decision(7, "efgh3", 2, Answer::Escalate, Some(50), 20),
            decision(8, "efgh3", 3, Answer::Escalate, Some(70), 30),
            decision(9, "efgh3", 4, Answer::DontEscalate, Some(70), 40),
            decision(10, "ijkl2", 1, Answer::Escalate, Some(90), 10),
        ])
        .with_questionnaires(vec![QuestionnaireAnswer {
            id: 1,
            user: "abcd1".to_string(),
            timestamp: Some(Timestamp::from_unix_secs(900)),
            role: Some("analyst".to_string()),
            exp_security: Some("5".to_string()),
            ..Default::default()
        }])
        .with_surveys(vec![SurveyAnswer {
            id: 1,
            user: "efgh3".to_string(),
            timestamp: Some(Timestamp::from_unix_secs(2_000)),
            mental: Some(40),
            ..Default::default()
        }])
}

async fn run(params: StudyParameters) -> Workbook {
    let writer = Arc::new(InMemoryReportWriter::new());
    ComputeResultsHandler::new(Arc::new(study()), writer.clone(), params)
        .handle()
        .await
        .unwrap();
    writer.last().await.unwrap()
}

fn row_of(table: &Table, user_column: &str, user: &str) -> usize {
    (0..table.len())
        .find(|&row| table.cell(row, user_column) == Some(&Cell::from(user)))
        .unwrap_or_else(|| panic!("{} missing from {}", user, table.name))
}

fn float(cell: Option<&Cell>) -> f64 {
    match cell {
        Some(Cell::Float(value)) => *value,
        other => panic!("expected float, got {:?}", other),
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

// =============================================================================
// Master sheet
// =============================================================================

#[tokio::test]
async fn master_sheet_has_fixed_columns_and_skips_idle_participants() {
    let workbook = run(StudyParameters::default()).await;
    let master = workbook.table(MASTER_TABLE).unwrap();

    assert_eq!(master.headers.len(), 46);
    assert_eq!(master.headers, MASTER_COLUMNS.to_vec());
    assert_eq!(master.headers[23], "preq_exp_security");
    assert_eq!(master.headers[24], "preq_exp_security");

    assert_eq!(master.len(), 3);
    assert!((0..master.len()).all(|row| master.cell(row, "username") != Some(&Cell::from("idle1"))));
}

#[tokio::test]
async fn resubmitted_answer_uses_latest_decision() {
    let workbook = run(StudyParameters::default()).await;
    let master = workbook.table(MASTER_TABLE).unwrap();
    let row = row_of(master, "username", "abcd1");

    // Escalate then Don't escalate on a should-escalate event is one FN.
    assert_eq!(master.cell(row, "FN"), Some(&Cell::Int(1)));
    assert_eq!(master.cell(row, "TP"), Some(&Cell::Int(0)));
    assert_eq!(master.cell(row, "TN"), Some(&Cell::Int(1)));
    assert_eq!(master.cell(row, "i_dont_knows"), Some(&Cell::Int(1)));
    // Check event 74 is not counted.
    assert_eq!(master.cell(row, "decided"), Some(&Cell::Int(3)));
    assert_eq!(master.cell(row, "correct"), Some(&Cell::Int(1)));

    assert_close(float(master.cell(row, "perc_decided")), 60.0);
    assert_close(float(master.cell(row, "perc_correct")), 100.0 / 3.0);
    assert_close(float(master.cell(row, "avg_confidence")), 75.0);
}

#[tokio::test]
async fn questionnaire_and_survey_fields_are_merged() {
    let workbook = run(StudyParameters::default()).await;
    let master = workbook.table(MASTER_TABLE).unwrap();

    let abcd1 = row_of(master, "username", "abcd1");
    let row = &master.rows[abcd1];
    assert_eq!(row[23], Cell::from("5"));
    assert_eq!(row[24], Cell::from("5"));
    assert_eq!(master.cell(abcd1, "preq_role"), Some(&Cell::from("analyst")));
    assert_eq!(master.cell(abcd1, "surv_mental"), Some(&Cell::Null));

    let efgh3 = row_of(master, "username", "efgh3");
    assert_eq!(master.cell(efgh3, "surv_mental"), Some(&Cell::Int(40)));
    assert_eq!(master.cell(efgh3, "preq_role"), Some(&Cell::Null));
}

// =============================================================================
// Performance sheet
// =============================================================================

#[tokio::test]
async fn zero_denominators_report_zero_rates() {
    let workbook = run(StudyParameters::default()).await;
    let performance = workbook.table(PERFORMANCE_TABLE).unwrap();
    let row = row_of(performance, "user", "abcd1");

    // No TP and no FP: precision has a zero denominator.
    assert_close(float(performance.cell(row, "precision")), 0.0);
    assert_close(float(performance.cell(row, "sensitivity")), 0.0);
    assert_close(float(performance.cell(row, "specificity")), 1.0);
    assert_eq!(performance.cell(row, "time_on_task"), Some(&Cell::Int(900)));
}

#[tokio::test]
async fn median_split_groups_participants() {
    let workbook = run(StudyParameters::default()).await;
    let performance = workbook.table(PERFORMANCE_TABLE).unwrap();

    // Sensitivities 0, 1, 1: median 1.
    let group = |user: &str| {
        let row = row_of(performance, "user", user);
        performance.cell(row, "sensitivity_group").cloned()
    };
    assert_eq!(group("abcd1"), Some(Cell::from("Low")));
    assert_eq!(group("efgh3"), Some(Cell::from("High")));
    assert_eq!(group("ijkl2"), Some(Cell::from("High")));
}

#[tokio::test]
async fn excluded_participants_leave_performance_but_stay_in_master() {
    let params = StudyParameters {
        exclusions: ExclusionPolicy {
            excluded: ["ijkl2".to_string()].into_iter().collect(),
            ..Default::default()
        },
        ..Default::default()
    };
    let workbook = run(params).await;

    assert_eq!(workbook.table(MASTER_TABLE).unwrap().len(), 3);
    let performance = workbook.table(PERFORMANCE_TABLE).unwrap();
    assert_eq!(performance.len(), 2);

    // Sensitivities 0, 1: median 0.5.
    let row = row_of(performance, "user", "abcd1");
    assert_eq!(
        performance.cell(row, "sensitivity_group"),
        Some(&Cell::from("Low"))
    );
}

// =============================================================================
// Difficulty and resubmission sheets
// =============================================================================

#[tokio::test]
async fn difficulty_excludes_check_events_and_untracked_users() {
    let workbook = run(StudyParameters::default()).await;
    let difficulty = workbook.table(DIFFICULTY_TABLE).unwrap();

    assert_eq!(
        difficulty.headers,
        vec![
            "id",
            "should_escalate",
            "group1_count",
            "group1_correct",
            "group1_difficulty",
            "group3_count",
            "group3_correct",
            "group3_difficulty",
            "total_difficulty",
        ]
    );
    let ids: Vec<&Cell> = difficulty.rows.iter().map(|r| &r[0]).collect();
    assert_eq!(
        ids,
        vec![&Cell::Int(1), &Cell::Int(2), &Cell::Int(3), &Cell::Int(4), &Cell::Int(5)]
    );

    // Event 1: abcd1 wrong, efgh3 right, ijkl2 not tracked.
    assert_eq!(difficulty.cell(0, "group1_count"), Some(&Cell::Int(1)));
    assert_close(float(difficulty.cell(0, "group1_difficulty")), 0.0);
    assert_close(float(difficulty.cell(0, "group3_difficulty")), 1.0);
    assert_close(float(difficulty.cell(0, "total_difficulty")), 0.5);

    // Event 3: "I don't know" counts but is never correct.
    assert_eq!(difficulty.cell(2, "group1_count"), Some(&Cell::Int(1)));
    assert_eq!(difficulty.cell(2, "group1_correct"), Some(&Cell::Int(0)));
}

#[tokio::test]
async fn empty_cohorts_have_missing_difficulty() {
    let workbook = run(StudyParameters::default()).await;
    let difficulty = workbook.table(DIFFICULTY_TABLE).unwrap();

    // Event 4: only cohort 3 decided.
    assert_eq!(difficulty.cell(3, "group1_count"), Some(&Cell::Int(0)));
    assert_eq!(difficulty.cell(3, "group1_difficulty"), Some(&Cell::Null));
    assert_close(float(difficulty.cell(3, "total_difficulty")), 1.0);

    // Event 5: nobody decided.
    assert_eq!(difficulty.cell(4, "total_difficulty"), Some(&Cell::Null));
}

#[tokio::test]
async fn resubmission_sheet_lists_changed_answers() {
    let workbook = run(StudyParameters::default()).await;
    let resubmissions = workbook.table(RESUBMISSION_TABLE).unwrap();

    assert_eq!(resubmissions.len(), 1);
    assert_eq!(resubmissions.cell(0, "user"), Some(&Cell::from("abcd1")));
    assert_eq!(resubmissions.cell(0, "event_id"), Some(&Cell::Int(1)));
    assert_eq!(
        resubmissions.cell(0, "answers"),
        Some(&Cell::from("Escalate (80) -> Don't escalate (60)"))
    );
}

// =============================================================================
// File adapters
// =============================================================================

#[tokio::test]
async fn json_writer_persists_all_tables_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let writer = Arc::new(JsonReportWriter::new(temp_dir.path(), "cry-wolf"));

    let result = ComputeResultsHandler::new(Arc::new(study()), writer, StudyParameters::default())
        .handle()
        .await
        .unwrap();

    assert_eq!(result.report.tables, 4);
    let content = tokio::fs::read_to_string(&result.report.location)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    let names: Vec<&str> = value["tables"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![MASTER_TABLE, PERFORMANCE_TABLE, DIFFICULTY_TABLE, RESUBMISSION_TABLE]
    );
}

#[tokio::test]
async fn snapshot_file_runs_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("export.json");
    let snapshot = r#"{
        "Event": [{"id": 1, "should_escalate": "1"}],
        "EventDecision": [
            {"id": 1, "time_event_decision": "2019-10-21T13:00:00Z", "escalate": "Escalate",
             "user": "abcd1", "confidence": 80, "event_id": 1},
            {"id": 2, "time_event_decision": "2019-10-21T13:01:00Z", "escalate": "Don't escalate",
             "user": "abcd1", "confidence": "None", "event_id": 1}
        ],
        "User": [{"id": 1, "username": "abcd1", "events": "1"}]
    }"#;
    tokio::fs::write(&path, snapshot).await.unwrap();

    let reader = load_snapshot(&path).await.unwrap();
    let writer = Arc::new(InMemoryReportWriter::new());
    ComputeResultsHandler::new(Arc::new(reader), writer.clone(), StudyParameters::default())
        .handle()
        .await
        .unwrap();

    let workbook = writer.last().await.unwrap();
    let master = workbook.table(MASTER_TABLE).unwrap();
    assert_eq!(master.cell(0, "FN"), Some(&Cell::Int(1)));
    assert_eq!(master.cell(0, "decided"), Some(&Cell::Int(1)));

    let performance = workbook.table(PERFORMANCE_TABLE).unwrap();
    assert_close(float(performance.cell(0, "sensitivity")), 0.0);
}
