//! Batch pipeline - dedup, classify, aggregate, split, assemble.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::aggregator::{Aggregator, EventAggregate, UserAggregate};
use super::classifier::GroundTruth;
use super::cohort::{Cohort, CohortAssigner, CohortSplitter, MetricSplit, TrailingCharCohorts};
use super::deduplicator::{Deduplicator, ResubmissionReport};
use super::records::{Decision, Event, QuestionnaireAnswer, SurveyAnswer, UserMetadata};
use super::report::{ExclusionPolicy, MasterRow, ReportAssembler, MASTER_COLUMNS};
use super::table::Workbook;
use super::StudyError;
use crate::domain::foundation::{EventId, Username};

/// Analysis settings for one run.
#[derive(Clone)]
pub struct StudyParameters {
    /// Attention-check events excluded from correctness and difficulty.
    pub check_events: BTreeSet<EventId>,
    /// Events every participant saw in addition to their assignment.
    pub shared_event_count: usize,
    pub cohorts: Arc<dyn CohortAssigner + Send + Sync>,
    pub exclusions: ExclusionPolicy,
    /// Drop participants without any decision from the master sheet.
    pub decided_only: bool,
}

impl StudyParameters {
    /// Number of events a participant was expected to decide.
    pub fn expected_total(&self, user: &UserMetadata) -> usize {
        user.assigned_events.len() + self.check_events.len() + self.shared_event_count
    }
}

impl Default for StudyParameters {
    fn default() -> Self {
        Self {
            check_events: [EventId::new(74), EventId::new(75)].into_iter().collect(),
            shared_event_count: 0,
            cohorts: Arc::new(TrailingCharCohorts::default()),
            exclusions: ExclusionPolicy::default(),
            decided_only: true,
        }
    }
}

/// A participant with the latest questionnaire and survey on file.
#[derive(Debug, Clone)]
pub struct Participant {
    pub metadata: UserMetadata,
    pub questionnaire: Option<QuestionnaireAnswer>,
    pub survey: Option<SurveyAnswer>,
}

/// Fully materialized inputs of one run.
#[derive(Debug, Clone, Default)]
pub struct StudyInputs {
    pub events: Vec<Event>,
    pub decisions: Vec<Decision>,
    pub participants: Vec<Participant>,
}

/// Everything computed by one run.
#[derive(Debug, Clone)]
pub struct StudyAnalysis {
    pub master_rows: Vec<MasterRow>,
    /// Master rows minus manually excluded participants.
    pub analysed_rows: Vec<MasterRow>,
    pub splits: Vec<MetricSplit>,
    pub events: Vec<EventAggregate>,
    pub cohorts: Vec<Cohort>,
    pub resubmissions: ResubmissionReport,
    /// Users with decisions but no participant record.
    pub unregistered_users: Vec<Username>,
}

impl StudyAnalysis {
    /// Renders all output tables.
    pub fn to_workbook(&self) -> Workbook {
        Workbook {
            tables: vec![
                ReportAssembler::master_table(&self.master_rows, MASTER_COLUMNS),
                ReportAssembler::performance_table(&self.analysed_rows, &self.splits),
                ReportAssembler::difficulty_table(&self.events, &self.cohorts),
                ReportAssembler::resubmission_table(&self.resubmissions),
            ],
        }
    }
}

/// Runs the full analysis over materialized inputs.
///
/// # Errors
/// [`StudyError::UnknownEvent`] if any non-check decision refers to an event
/// without ground truth, whether or not its user is a registered participant.
pub fn analyze(inputs: StudyInputs, params: &StudyParameters) -> Result<StudyAnalysis, StudyError> {
    let truth = GroundTruth::new(inputs.events);
    let deduplicated = Deduplicator::deduplicate(inputs.decisions);

    let mut master_rows = Vec::with_capacity(inputs.participants.len());
    let mut registered = BTreeSet::new();
    for participant in inputs.participants {
        let user = participant.metadata.username.clone();
        let aggregate: UserAggregate = Aggregator::aggregate_user(
            &user,
            deduplicated.for_user(&user),
            &truth,
            &params.check_events,
            params.expected_total(&participant.metadata),
        )?;
        registered.insert(user);

        if params.decided_only && aggregate.decided_count == 0 {
            continue;
        }
        master_rows.push(MasterRow {
            metadata: participant.metadata,
            aggregate,
            questionnaire: participant.questionnaire,
            survey: participant.survey,
        });
    }

    let unregistered_users = deduplicated
        .users()
        .into_iter()
        .filter(|u| !registered.contains(*u))
        .cloned()
        .collect();

    let analysed_rows: Vec<MasterRow> = master_rows
        .iter()
        .filter(|row| params.exclusions.includes(&row.aggregate.user))
        .cloned()
        .collect();
    let aggregates: Vec<UserAggregate> = analysed_rows.iter().map(|r| r.aggregate.clone()).collect();
    let splits = CohortSplitter::split_all(&aggregates);

    let events = Aggregator::aggregate_events(
        &truth,
        &deduplicated,
        &params.check_events,
        params.cohorts.as_ref(),
    )?;

    Ok(StudyAnalysis {
        master_rows,
        analysed_rows,
        splits,
        events,
        cohorts: params.cohorts.cohorts(),
        resubmissions: deduplicated.report().clone(),
        unregistered_users,
    })
}
