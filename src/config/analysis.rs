//! Analysis configuration
//!
//! List values are comma-separated strings so they can be set from a single
//! environment variable, e.g. `CRYWOLF__ANALYSIS__CHECK_EVENTS=74,75`.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::error::ValidationError;
use crate::domain::foundation::EventId;
use crate::domain::study::{
    ExclusionPolicy, RetentionReason, StudyParameters, TrailingCharCohorts,
};

/// Analysis settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Attention-check event ids
    #[serde(default = "default_check_events")]
    pub check_events: String,

    /// Events every participant saw besides their assignment
    #[serde(default)]
    pub shared_event_count: usize,

    /// Username suffixes of the tracked cohorts
    #[serde(default = "default_cohort_suffixes")]
    pub cohort_suffixes: String,

    /// Participants removed from the performance analysis
    #[serde(default)]
    pub excluded_users: String,

    /// Participants kept despite a check-score typo
    #[serde(default)]
    pub retained_typo_users: String,

    /// Participants kept despite deliberately wrong answers
    #[serde(default)]
    pub retained_self_test_users: String,

    /// Drop participants without decisions from the master sheet
    #[serde(default = "default_decided_only")]
    pub decided_only: bool,
}

impl AnalysisConfig {
    /// Parsed attention-check event ids.
    pub fn check_event_ids(&self) -> Result<BTreeSet<EventId>, ValidationError> {
        split_list(&self.check_events)
            .map(|id| {
                id.parse::<i64>()
                    .map(EventId::new)
                    .map_err(|_| ValidationError::InvalidEventList(id.to_string()))
            })
            .collect()
    }

    /// Parsed cohort suffix characters.
    pub fn cohort_chars(&self) -> Result<Vec<char>, ValidationError> {
        split_list(&self.cohort_suffixes)
            .map(|suffix| {
                let mut chars = suffix.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(ValidationError::InvalidCohortSuffix(suffix.to_string())),
                }
            })
            .collect()
    }

    /// Manual exclusion and retention decisions.
    pub fn exclusion_policy(&self) -> Result<ExclusionPolicy, ValidationError> {
        let excluded: BTreeSet<String> = split_list(&self.excluded_users)
            .map(str::to_string)
            .collect();

        let mut retained = BTreeMap::new();
        let reasons = [
            (&self.retained_typo_users, RetentionReason::ExplainedTypo),
            (
                &self.retained_self_test_users,
                RetentionReason::IntentionalWrongAnswers,
            ),
        ];
        for (list, reason) in reasons {
            for user in split_list(list) {
                if excluded.contains(user) {
                    return Err(ValidationError::ConflictingExclusion(user.to_string()));
                }
                retained.insert(user.to_string(), reason);
            }
        }

        Ok(ExclusionPolicy { excluded, retained })
    }

    /// Validate analysis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.check_event_ids()?;
        if self.cohort_chars()?.is_empty() {
            return Err(ValidationError::MissingRequired(
                "CRYWOLF__ANALYSIS__COHORT_SUFFIXES",
            ));
        }
        self.exclusion_policy()?;
        Ok(())
    }

    /// Builds the parameters for one analysis run.
    pub fn to_parameters(&self) -> Result<StudyParameters, ValidationError> {
        Ok(StudyParameters {
            check_events: self.check_event_ids()?,
            shared_event_count: self.shared_event_count,
            cohorts: Arc::new(TrailingCharCohorts::new(self.cohort_chars()?)),
            exclusions: self.exclusion_policy()?,
            decided_only: self.decided_only,
        })
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            check_events: default_check_events(),
            shared_event_count: 0,
            cohort_suffixes: default_cohort_suffixes(),
            excluded_users: String::new(),
            retained_typo_users: String::new(),
            retained_self_test_users: String::new(),
            decided_only: default_decided_only(),
        }
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn default_check_events() -> String {
    "74,75".to_string()
}

fn default_cohort_suffixes() -> String {
    "1,3".to_string()
}

fn default_decided_only() -> bool {
    true
}
