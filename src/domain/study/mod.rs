//! Study Module - Decision classification and performance analytics.
//!
//! Pure, synchronous domain services for one batch run over the study data.
//!
//! # Components
//!
//! - `records` - Decisions, events, participant metadata, raw-row validation
//! - `Deduplicator` - Latest decision per (user, event), resubmission report
//! - `Classifier` - TP / FP / TN / FN / Indeterminate
//! - `Aggregator` - Per-user performance and per-event difficulty
//! - `CohortSplitter` - Cohort assignment and median High/Low groups
//! - `ReportAssembler` - Fixed-column output tables
//!
//! All I/O happens behind ports before [`analyze`] is called.

mod aggregator;
mod classifier;
mod cohort;
mod deduplicator;
mod errors;
mod pipeline;
mod records;
mod report;
mod table;

pub use aggregator::{Aggregator, CohortTally, ConfusionCounts, EventAggregate, UserAggregate};
pub use classifier::{Classification, Classifier, GroundTruth};
pub use cohort::{
    Cohort, CohortAssigner, CohortSplitter, Metric, MetricSplit, PerformanceGroup,
    TrailingCharCohorts,
};
pub use deduplicator::{
    select_latest, ChangedAnswer, Chronological, DecisionKey, Deduplication, Deduplicator,
    ResubmissionReport,
};
pub use errors::StudyError;
pub use pipeline::{analyze, Participant, StudyAnalysis, StudyInputs, StudyParameters};
pub use records::{
    parse_assigned_events, Answer, AnswerFingerprint, Decision, Event, QuestionnaireAnswer,
    RawConfidence, RawDecision, RawEvent, RawUser, SurveyAnswer, UserMetadata,
};
pub use report::{
    ExclusionPolicy, MasterRow, ReportAssembler, RetentionReason, DIFFICULTY_TABLE, MASTER_COLUMNS,
    MASTER_TABLE, PERFORMANCE_COLUMNS, PERFORMANCE_TABLE, RESUBMISSION_TABLE,
};
pub use table::{Cell, Table, Workbook};
