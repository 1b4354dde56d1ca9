//! Submission analytics
//!
//! Aggregates stored submission records into completion and completeness
//! statistics, optionally narrowed to one manufacturer and a creation date
//! range.

use crate::adapters::storage::{SubmissionFilter, SubmissionStore};
use crate::config::ManufacturerCatalog;
use crate::core::transform::numeric::round_to;
use crate::domain::errors::IvrError;
use crate::domain::ids::ManufacturerId;
use crate::domain::submission::{SubmissionEpisode, SubmissionStatus};
use crate::domain::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const ALL_STATUSES: [SubmissionStatus; 7] = [
    SubmissionStatus::Pending,
    SubmissionStatus::Sent,
    SubmissionStatus::Viewed,
    SubmissionStatus::InProgress,
    SubmissionStatus::Completed,
    SubmissionStatus::Expired,
    SubmissionStatus::Failed,
];

/// Selection for a report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsQuery {
    /// Manufacturer id or display name
    pub manufacturer: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl AnalyticsQuery {
    /// Builds a query from raw text parameters
    ///
    /// Blank values are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::MalformedInput`] for a date that is not
    /// `YYYY-MM-DD` or a start date after the end date.
    pub fn parse(
        manufacturer: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Self> {
        let query = Self {
            manufacturer: manufacturer
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            start_date: parse_date_param("start_date", start_date)?,
            end_date: parse_date_param("end_date", end_date)?,
        };
        query.check_range()?;
        Ok(query)
    }

    fn check_range(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(IvrError::MalformedInput(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_date_param(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                IvrError::MalformedInput(format!("{name} '{raw}' is invalid (YYYY-MM-DD expected)"))
            }),
    }
}

/// Aggregated submission statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub total_submissions: usize,
    /// Count per status, every status listed
    pub status_breakdown: BTreeMap<String, usize>,
    /// Completed share of all submissions, in percent
    pub completion_rate: f64,
    pub average_field_completeness: f64,
    pub average_required_field_completeness: f64,
    /// `None` when no submission has been completed
    pub average_time_to_complete_minutes: Option<i64>,
}

/// Aggregates a set of records
pub fn summarize(records: &[SubmissionEpisode]) -> AnalyticsReport {
    let total = records.len();

    let mut status_breakdown: BTreeMap<String, usize> = ALL_STATUSES
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for record in records {
        *status_breakdown
            .entry(record.status.as_str().to_string())
            .or_default() += 1;
    }

    let completed = records
        .iter()
        .filter(|r| r.status == SubmissionStatus::Completed)
        .count();

    let average = |values: Vec<f64>| -> f64 {
        if values.is_empty() {
            0.0
        } else {
            round_to(values.iter().sum::<f64>() / values.len() as f64, 2)
        }
    };

    let durations: Vec<f64> = records
        .iter()
        .filter_map(SubmissionEpisode::time_to_complete_minutes)
        .collect();
    let average_time_to_complete_minutes = (!durations.is_empty())
        .then(|| (durations.iter().sum::<f64>() / durations.len() as f64).round() as i64);

    AnalyticsReport {
        total_submissions: total,
        status_breakdown,
        completion_rate: if total == 0 {
            0.0
        } else {
            round_to(completed as f64 / total as f64 * 100.0, 2)
        },
        average_field_completeness: average(
            records.iter().map(|r| r.field_completeness).collect(),
        ),
        average_required_field_completeness: average(
            records.iter().map(|r| r.required_completeness).collect(),
        ),
        average_time_to_complete_minutes,
    }
}

/// Produces reports from the submission store
#[derive(Clone)]
pub struct AnalyticsAggregator {
    submissions: Arc<dyn SubmissionStore>,
    catalog: Arc<ManufacturerCatalog>,
}

impl AnalyticsAggregator {
    pub fn new(submissions: Arc<dyn SubmissionStore>, catalog: Arc<ManufacturerCatalog>) -> Self {
        Self {
            submissions,
            catalog,
        }
    }

    /// Report over the records selected by `query`
    ///
    /// A manufacturer the catalog does not know is matched by id, so
    /// history of retired manufacturers stays reportable.
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::MalformedInput`] for an inverted date range or an
    /// invalid manufacturer id, or a storage error.
    pub async fn generate(&self, query: &AnalyticsQuery) -> Result<AnalyticsReport> {
        query.check_range()?;

        let manufacturer_id = match query.manufacturer.as_deref() {
            None => None,
            Some(raw) => Some(self.resolve_manufacturer(raw)?),
        };

        let filter = SubmissionFilter {
            manufacturer_id,
            start_date: query.start_date,
            end_date: query.end_date,
        };
        let records = self.submissions.list(&filter).await?;
        let report = summarize(&records);

        tracing::info!(
            manufacturer = query.manufacturer.as_deref().unwrap_or("all"),
            total = report.total_submissions,
            completion_rate = report.completion_rate,
            "Analytics generated"
        );
        Ok(report)
    }

    fn resolve_manufacturer(&self, raw: &str) -> Result<ManufacturerId> {
        match self.catalog.get(raw) {
            Ok(profile) => Ok(profile.id.clone()),
            Err(e) if e.is_not_found() => ManufacturerId::new(raw).map_err(IvrError::MalformedInput),
            Err(e) => Err(e),
        }
    }
}
