//! ComputeResultsHandler - Batch handler producing the study results workbook.
//!
//! Materializes every input through the `StudyReader`, runs the pure
//! analysis, and hands the rendered tables to the `ReportWriter`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::foundation::DomainError;
use crate::domain::study::{
    analyze, Participant, StudyAnalysis, StudyInputs, StudyParameters, Workbook,
};
use crate::ports::{ReportWriter, StudyReader, WrittenReport};

/// Outcome of one results run.
#[derive(Debug, Clone)]
pub struct ComputeResultsResult {
    /// Where the workbook was written.
    pub report: WrittenReport,
    /// Participants enumerated by the reader.
    pub participants: usize,
    /// Rows in the master table.
    pub master_rows: usize,
    /// Submissions superseded by a later one.
    pub resubmitted: usize,
    /// (user, event) pairs whose answer changed on resubmission.
    pub changed_events: usize,
    /// Users with decisions but no participant record.
    pub unregistered_users: usize,
}

/// Handler for computing and writing the study results.
pub struct ComputeResultsHandler {
    reader: Arc<dyn StudyReader>,
    writer: Arc<dyn ReportWriter>,
    params: StudyParameters,
}

impl ComputeResultsHandler {
    pub fn new(
        reader: Arc<dyn StudyReader>,
        writer: Arc<dyn ReportWriter>,
        params: StudyParameters,
    ) -> Self {
        Self {
            reader,
            writer,
            params,
        }
    }

    /// Runs the analysis without writing anything.
    pub async fn analyze(&self) -> Result<StudyAnalysis, DomainError> {
        let inputs = self.load_inputs().await?;
        self.analyze_inputs(inputs)
    }

    /// Runs the analysis and writes the workbook.
    pub async fn handle(&self) -> Result<ComputeResultsResult, DomainError> {
        let inputs = self.load_inputs().await?;
        let participants = inputs.participants.len();
        let analysis = self.analyze_inputs(inputs)?;
        let workbook: Workbook = analysis.to_workbook();

        let report = self.writer.write(&workbook).await?;
        info!(
            location = %report.location.display(),
            tables = report.tables,
            rows = report.rows,
            "Results written"
        );

        Ok(ComputeResultsResult {
            report,
            participants,
            master_rows: analysis.master_rows.len(),
            resubmitted: analysis.resubmissions.resubmitted,
            changed_events: analysis.resubmissions.changed_event_count(),
            unregistered_users: analysis.unregistered_users.len(),
        })
    }

    fn analyze_inputs(&self, inputs: StudyInputs) -> Result<StudyAnalysis, DomainError> {
        debug!(
            events = inputs.events.len(),
            decisions = inputs.decisions.len(),
            participants = inputs.participants.len(),
            "Study inputs loaded"
        );

        let analysis = analyze(inputs, &self.params)?;
        self.log_summary(&analysis);
        Ok(analysis)
    }

    async fn load_inputs(&self) -> Result<StudyInputs, DomainError> {
        let events = self.reader.get_events().await?;
        let decisions = self.reader.get_decisions().await?;

        let users = self.reader.get_users().await?;
        let mut participants = Vec::with_capacity(users.len());
        for metadata in users {
            let questionnaire = self
                .reader
                .get_latest_questionnaire(&metadata.username)
                .await?;
            let survey = self.reader.get_latest_survey(&metadata.username).await?;
            participants.push(Participant {
                metadata,
                questionnaire,
                survey,
            });
        }

        Ok(StudyInputs {
            events,
            decisions,
            participants,
        })
    }

    fn log_summary(&self, analysis: &StudyAnalysis) {
        let report = &analysis.resubmissions;
        info!(
            total_decisions = report.total_decisions,
            unique_users = report.unique_users,
            resubmitted = report.resubmitted,
            changed_answers = report.change_count(),
            changed_events = report.changed_event_count(),
            "Resubmission summary"
        );
        for (user, changes) in report.changes_by_user() {
            debug!(user = %user, changes, "Participant changed answers");
        }

        for user in &analysis.unregistered_users {
            warn!(user = %user, "Decisions recorded for unknown participant");
        }

        let excluded = analysis.master_rows.len() - analysis.analysed_rows.len();
        info!(
            master_rows = analysis.master_rows.len(),
            analysed_rows = analysis.analysed_rows.len(),
            excluded,
            "Performance analysis complete"
        );
    }
}
