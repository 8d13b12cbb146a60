use serde::Serialize;

use crate::{
    error::AppError,
    models::trip::{TripRecord, TripStatus},
};

use super::{
    aggregator::{audit_summary, count_by_status, financial_summary, AuditSummary, FinancialSummary},
    round_to,
};

/// Headline figures of the owner dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_trips: usize,
    pub ongoing: usize,
    pub completed: usize,
    pub financials: FinancialSummary,
    pub audit: AuditSummary,
    pub sample_trip_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SummaryExportRow {
    #[serde(rename = "Total Trips")]
    total_trips: usize,
    #[serde(rename = "Ongoing Trips")]
    ongoing_trips: usize,
    #[serde(rename = "Closed Trips")]
    closed_trips: usize,
    #[serde(rename = "Profit %")]
    profit_percent: f64,
    #[serde(rename = "Revenue (M)")]
    revenue_m: f64,
    #[serde(rename = "Expense (M)")]
    expense_m: f64,
    #[serde(rename = "Profit (M)")]
    profit_m: f64,
    #[serde(rename = "KMs (K)")]
    kms_k: f64,
    #[serde(rename = "Cost per KM")]
    cost_per_km: f64,
    #[serde(rename = "Flags")]
    flags: usize,
    #[serde(rename = "Resolved Audits")]
    resolved_audits: usize,
}

impl DashboardSummary {
    pub fn from_records(records: &[TripRecord]) -> Self {
        Self {
            total_trips: records.len(),
            ongoing: count_by_status(records, &TripStatus::PendingClosure),
            completed: count_by_status(records, &TripStatus::Completed),
            financials: financial_summary(records),
            audit: audit_summary(records),
            sample_trip_id: records.first().map(|record| record.trip_id.clone()),
        }
    }

    pub fn sample_trip_text(&self) -> &str {
        self.sample_trip_id.as_deref().unwrap_or("–")
    }

    fn export_row(&self) -> SummaryExportRow {
        let fin = &self.financials;
        SummaryExportRow {
            total_trips: self.total_trips,
            ongoing_trips: self.ongoing,
            closed_trips: self.completed,
            profit_percent: round_to(fin.profit_percent, 1),
            revenue_m: round_to(fin.revenue_millions(), 2),
            expense_m: round_to(fin.expense_millions(), 2),
            profit_m: round_to(fin.profit_millions(), 2),
            kms_k: round_to(fin.distance_thousands(), 1),
            cost_per_km: round_to(fin.cost_per_km, 2),
            flags: self.audit.flagged,
            resolved_audits: self.audit.resolved,
        }
    }

    /// One header row plus one value row.
    pub fn to_csv(&self) -> Result<Vec<u8>, AppError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(self.export_row())?;
        writer
            .into_inner()
            .map_err(|err| AppError::Other(anyhow::anyhow!("flush summary csv: {err}")))
    }
}
