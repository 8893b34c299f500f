//! Cohort assignment and median-based performance grouping.
//!
//! Participants are enrolled with usernames whose trailing character encodes
//! their study condition. That convention lives only in
//! [`TrailingCharCohorts`]; aggregation depends on the [`CohortAssigner`] trait.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::aggregator::UserAggregate;
use crate::domain::foundation::Username;

/// A study condition, e.g. cohort `1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cohort(String);

impl Cohort {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps participants to cohorts.
pub trait CohortAssigner {
    /// The cohort of a user, or `None` if the user belongs to no tracked cohort.
    fn cohort_of(&self, user: &Username) -> Option<Cohort>;

    /// All tracked cohorts, in reporting order.
    fn cohorts(&self) -> Vec<Cohort>;
}

/// Assigns cohorts by the last character of the username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingCharCohorts {
    tracked: Vec<char>,
}

impl TrailingCharCohorts {
    pub fn new(tracked: impl IntoIterator<Item = char>) -> Self {
        Self {
            tracked: tracked.into_iter().collect(),
        }
    }
}

impl Default for TrailingCharCohorts {
    fn default() -> Self {
        Self::new(['1', '3'])
    }
}

impl CohortAssigner for TrailingCharCohorts {
    fn cohort_of(&self, user: &Username) -> Option<Cohort> {
        let last = user.as_str().chars().last()?;
        self.tracked
            .contains(&last)
            .then(|| Cohort::new(last.to_string()))
    }

    fn cohorts(&self) -> Vec<Cohort> {
        self.tracked.iter().map(|c| Cohort::new(c.to_string())).collect()
    }
}

/// Per-user rate used for High/Low grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Sensitivity,
    Specificity,
    Precision,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Sensitivity, Metric::Specificity, Metric::Precision];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Sensitivity => "sensitivity",
            Metric::Specificity => "specificity",
            Metric::Precision => "precision",
        }
    }

    /// Reads this metric from a user aggregate.
    pub fn value_of(&self, user: &UserAggregate) -> f64 {
        match self {
            Metric::Sensitivity => user.sensitivity,
            Metric::Specificity => user.specificity,
            Metric::Precision => user.precision,
        }
    }
}

/// Position of a user relative to the median of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceGroup {
    High,
    Low,
}

impl PerformanceGroup {
    pub fn label(&self) -> &'static str {
        match self {
            PerformanceGroup::High => "High",
            PerformanceGroup::Low => "Low",
        }
    }
}

/// High/Low grouping of users for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSplit {
    pub metric: Metric,
    pub median: f64,
    pub groups: BTreeMap<Username, PerformanceGroup>,
}

impl MetricSplit {
    pub fn group_of(&self, user: &Username) -> Option<PerformanceGroup> {
        self.groups.get(user).copied()
    }
}

/// Median-based splitting of users per metric.
pub struct CohortSplitter;

impl CohortSplitter {
    /// Median of the values; mean of the middle pair for even counts.
    ///
    /// Returns `None` for an empty slice.
    pub fn median(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Splits users into High (value >= median) and Low for one metric.
    ///
    /// Returns `None` when there are no users.
    pub fn split(users: &[UserAggregate], metric: Metric) -> Option<MetricSplit> {
        let values: Vec<f64> = users.iter().map(|u| metric.value_of(u)).collect();
        let median = Self::median(&values)?;

        let groups = users
            .iter()
            .map(|u| {
                let group = if metric.value_of(u) >= median {
                    PerformanceGroup::High
                } else {
                    PerformanceGroup::Low
                };
                (u.user.clone(), group)
            })
            .collect();

        Some(MetricSplit {
            metric,
            median,
            groups,
        })
    }

    /// Runs an independent split for every metric.
    pub fn split_all(users: &[UserAggregate]) -> Vec<MetricSplit> {
        Metric::ALL
            .iter()
            .filter_map(|metric| Self::split(users, *metric))
            .collect()
    }
}
