//! Trip aggregation: counts, daily buckets, financial sums and the insights
//! digest shown on the dashboards.
//!
//! Everything here is a pure function over a borrowed record snapshot.

pub mod aggregator;
pub mod insights;
pub mod summary;

use thiserror::Error;

pub use aggregator::{
    audit_summary, count_by_day, count_by_status, filter_trips, financial_summary, sum_field,
    top_entity, AuditSummary, FinancialSummary, GroupField, TripField, TripFilter, FULL_MONTH,
};
pub use insights::{insights_digest, Insights, NO_DATA_MESSAGE};
pub use summary::DashboardSummary;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("no trip data to aggregate")]
    NoData,
}

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
