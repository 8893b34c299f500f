//! Report assembly - Flat output rows with a fixed column layout.
//!
//! Downstream spreadsheets address columns by position and name, so the
//! master column list is fixed. `preq_exp_security` appears twice on purpose.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::aggregator::{EventAggregate, UserAggregate};
use super::cohort::{Cohort, Metric, MetricSplit};
use super::deduplicator::ResubmissionReport;
use super::records::{QuestionnaireAnswer, SurveyAnswer, UserMetadata};
use super::table::{Cell, Table};
use crate::domain::foundation::Username;

pub const MASTER_TABLE: &str = "master";
pub const PERFORMANCE_TABLE: &str = "performance";
pub const DIFFICULTY_TABLE: &str = "difficulty";
pub const RESUBMISSION_TABLE: &str = "resubmissions";

/// Columns of the master sheet, in output order.
pub const MASTER_COLUMNS: &[&str] = &[
    "id",
    "username",
    "group",
    "time_begin",
    "time_end",
    "questionnaire_complete",
    "training_complete",
    "survey_complete",
    "decided",
    "perc_decided",
    "avg_confidence",
    "correct",
    "perc_correct",
    "i_dont_knows",
    "TP",
    "FP",
    "TN",
    "FN",
    "preq_timestamp",
    "preq_role",
    "preq_exp_researcher",
    "preq_exp_admin",
    "preq_exp_software",
    "preq_exp_security",
    "preq_exp_security",
    "preq_familiarity_none",
    "preq_familiarity_read",
    "preq_familiarity_controlled",
    "preq_familiarity_public",
    "preq_familiarity_engineered",
    "preq_subnet_mask",
    "preq_network_address",
    "preq_tcp_faster",
    "preq_http_port",
    "preq_firewall",
    "preq_socket",
    "preq_which_model",
    "surv_timestamp",
    "surv_mental",
    "surv_physical",
    "surv_temporal",
    "surv_performance",
    "surv_effort",
    "surv_frustration",
    "surv_useful_info",
    "surv_feedback",
];

/// Columns of the performance sheet.
pub const PERFORMANCE_COLUMNS: &[&str] = &[
    "user",
    "TP",
    "FP",
    "TN",
    "FN",
    "sensitivity",
    "specificity",
    "precision",
    "time_on_task",
    "sensitivity_group",
    "specificity_group",
    "precision_group",
];

/// One participant's merged metadata, performance, and questionnaire data.
#[derive(Debug, Clone)]
pub struct MasterRow {
    pub metadata: UserMetadata,
    pub aggregate: UserAggregate,
    pub questionnaire: Option<QuestionnaireAnswer>,
    pub survey: Option<SurveyAnswer>,
}

impl MasterRow {
    /// Value of a named column; unknown columns and absent sources are null.
    pub fn cell(&self, column: &str) -> Cell {
        if let Some(field) = column.strip_prefix("preq_") {
            return self
                .questionnaire
                .as_ref()
                .map(|q| questionnaire_cell(q, field))
                .unwrap_or(Cell::Null);
        }
        if let Some(field) = column.strip_prefix("surv_") {
            return self
                .survey
                .as_ref()
                .map(|s| survey_cell(s, field))
                .unwrap_or(Cell::Null);
        }

        let m = &self.metadata;
        let a = &self.aggregate;
        match column {
            "id" => m.id.into(),
            "username" => m.username.as_str().into(),
            "group" => m.group.clone().into(),
            "time_begin" => m.time_begin.into(),
            "time_end" => m.time_end.into(),
            "questionnaire_complete" => m.questionnaire_complete.into(),
            "training_complete" => m.training_complete.into(),
            "survey_complete" => m.survey_complete.into(),
            "decided" => Cell::count(a.decided_count),
            "perc_decided" => a.percent_decided.into(),
            "avg_confidence" => a.avg_confidence.into(),
            "correct" => Cell::count(a.correct_count),
            "perc_correct" => a.percent_correct.into(),
            "i_dont_knows" => Cell::count(a.idk_count),
            "TP" => Cell::count(a.confusion.tp),
            "FP" => Cell::count(a.confusion.fp),
            "TN" => Cell::count(a.confusion.tn),
            "FN" => Cell::count(a.confusion.fn_),
            "sensitivity" => a.sensitivity.into(),
            "specificity" => a.specificity.into(),
            "precision" => a.precision.into(),
            _ => Cell::Null,
        }
    }

    /// Cells for the given column list, in order.
    pub fn cells(&self, columns: &[&str]) -> Vec<Cell> {
        columns.iter().map(|c| self.cell(c)).collect()
    }
}

fn questionnaire_cell(q: &QuestionnaireAnswer, field: &str) -> Cell {
    let text = |value: &Option<String>| Cell::from(value.clone());
    match field {
        "id" => q.id.into(),
        "user" => q.user.as_str().into(),
        "timestamp" => q.timestamp.into(),
        "role" => text(&q.role),
        "exp_researcher" => text(&q.exp_researcher),
        "exp_admin" => text(&q.exp_admin),
        "exp_software" => text(&q.exp_software),
        "exp_security" => text(&q.exp_security),
        "familiarity_none" => text(&q.familiarity_none),
        "familiarity_read" => text(&q.familiarity_read),
        "familiarity_controlled" => text(&q.familiarity_controlled),
        "familiarity_public" => text(&q.familiarity_public),
        "familiarity_engineered" => text(&q.familiarity_engineered),
        "subnet_mask" => text(&q.subnet_mask),
        "network_address" => text(&q.network_address),
        "tcp_faster" => text(&q.tcp_faster),
        "http_port" => text(&q.http_port),
        "firewall" => text(&q.firewall),
        "socket" => text(&q.socket),
        "which_model" => text(&q.which_model),
        _ => Cell::Null,
    }
}

fn survey_cell(s: &SurveyAnswer, field: &str) -> Cell {
    match field {
        "id" => s.id.into(),
        "user" => s.user.as_str().into(),
        "timestamp" => s.timestamp.into(),
        "mental" => s.mental.into(),
        "physical" => s.physical.into(),
        "temporal" => s.temporal.into(),
        "performance" => s.performance.into(),
        "effort" => s.effort.into(),
        "frustration" => s.frustration.into(),
        "useful_info" => s.useful_info.clone().into(),
        "feedback" => s.feedback.clone().into(),
        _ => Cell::Null,
    }
}

/// Why a participant flagged by the attention checks is still analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionReason {
    /// The check score deviation was explained by a data-entry typo.
    ExplainedTypo,
    /// The participant deliberately answered wrongly to test the system.
    IntentionalWrongAnswers,
}

/// Manual inclusion decisions made during analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExclusionPolicy {
    /// Participants removed from analysis, e.g. for failing validation.
    #[serde(default)]
    pub excluded: BTreeSet<String>,
    /// Participants kept despite a suspicious check score.
    #[serde(default)]
    pub retained: BTreeMap<String, RetentionReason>,
}

impl ExclusionPolicy {
    pub fn is_manually_excluded(&self, user: &Username) -> bool {
        self.excluded.contains(user.as_str())
    }

    pub fn is_retained_typo(&self, user: &Username) -> bool {
        self.retention_reason(user) == Some(RetentionReason::ExplainedTypo)
    }

    pub fn is_retained_self_test(&self, user: &Username) -> bool {
        self.retention_reason(user) == Some(RetentionReason::IntentionalWrongAnswers)
    }

    pub fn retention_reason(&self, user: &Username) -> Option<RetentionReason> {
        self.retained.get(user.as_str()).copied()
    }

    pub fn includes(&self, user: &Username) -> bool {
        !self.is_manually_excluded(user)
    }
}

/// Builds output tables from aggregates.
pub struct ReportAssembler;

impl ReportAssembler {
    /// Master sheet: one row per participant, fixed columns.
    pub fn master_table(rows: &[MasterRow], columns: &[&str]) -> Table {
        let mut table = Table::new(MASTER_TABLE, columns.iter().copied());
        for row in rows {
            table.push_row(row.cells(columns));
        }
        table
    }

    /// Performance sheet with High/Low groups per metric.
    ///
    /// Users missing from a split get a null group.
    pub fn performance_table(rows: &[MasterRow], splits: &[MetricSplit]) -> Table {
        let mut table = Table::new(PERFORMANCE_TABLE, PERFORMANCE_COLUMNS.iter().copied());
        for row in rows {
            let user = &row.aggregate.user;
            let mut cells: Vec<Cell> = vec![
                user.as_str().into(),
                row.cell("TP"),
                row.cell("FP"),
                row.cell("TN"),
                row.cell("FN"),
                row.cell("sensitivity"),
                row.cell("specificity"),
                row.cell("precision"),
                row.metadata.time_on_task().map(|d| d.num_seconds()).into(),
            ];
            for metric in Metric::ALL {
                let group = splits
                    .iter()
                    .find(|s| s.metric == metric)
                    .and_then(|s| s.group_of(user))
                    .map(|g| g.label());
                cells.push(group.into());
            }
            table.push_row(cells);
        }
        table
    }

    /// Difficulty sheet: per-cohort counts and difficulty for each event.
    pub fn difficulty_table(events: &[EventAggregate], cohorts: &[Cohort]) -> Table {
        let mut headers = vec!["id".to_string(), "should_escalate".to_string()];
        for cohort in cohorts {
            headers.push(format!("group{}_count", cohort));
            headers.push(format!("group{}_correct", cohort));
            headers.push(format!("group{}_difficulty", cohort));
        }
        headers.push("total_difficulty".to_string());

        let mut table = Table::new(DIFFICULTY_TABLE, headers);
        for event in events {
            let mut cells: Vec<Cell> = vec![event.id.value().into(), event.should_escalate.into()];
            for cohort in cohorts {
                let tally = event.tally(cohort).copied().unwrap_or_default();
                cells.push(Cell::count(tally.count));
                cells.push(Cell::count(tally.correct));
                cells.push(tally.difficulty().into());
            }
            cells.push(event.total_difficulty().into());
            table.push_row(cells);
        }
        table
    }

    /// Resubmission sheet: every (user, event) whose answer changed.
    pub fn resubmission_table(report: &ResubmissionReport) -> Table {
        let mut table = Table::new(RESUBMISSION_TABLE, ["user", "event_id", "submissions", "answers"]);
        for change in &report.changed {
            let answers = change
                .distinct
                .iter()
                .map(|d| match d.confidence {
                    Some(c) => format!("{} ({})", d.answer.label(), c),
                    None => d.answer.label().to_string(),
                })
                .collect::<Vec<_>>()
                .join(" -> ");
            table.push_row(vec![
                change.user.as_str().into(),
                change.event_id.value().into(),
                Cell::count(change.distinct.len()),
                answers.into(),
            ]);
        }
        table
    }
}
