use std::fmt;

use crate::models::trip::{TripRecord, TripStatus};

use super::{
    aggregator::{
        average_field, count_by_status, financial_summary, top_entity, top_values,
        FinancialSummary, GroupField, TripField,
    },
    AggregateError,
};

pub const NO_DATA_MESSAGE: &str = "No data available for AI report.";

const TOP_ROUTE_COUNT: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Insights {
    pub total: usize,
    pub ongoing: usize,
    pub completed: usize,
    pub financials: FinancialSummary,
    pub top_vehicle: Option<String>,
    pub average_profit: f64,
    pub top_routes: Vec<String>,
}

impl Insights {
    pub fn from_records(records: &[TripRecord]) -> Result<Self, AggregateError> {
        if records.is_empty() {
            return Err(AggregateError::NoData);
        }

        Ok(Self {
            total: records.len(),
            ongoing: count_by_status(records, &TripStatus::PendingClosure),
            completed: count_by_status(records, &TripStatus::Completed),
            financials: financial_summary(records),
            top_vehicle: top_entity(records, GroupField::Vehicle, TripField::NetProfit).ok(),
            average_profit: average_field(records, TripField::NetProfit),
            top_routes: top_values(records, GroupField::Route, TOP_ROUTE_COUNT),
        })
    }

    pub fn top_routes_text(&self) -> String {
        if self.top_routes.is_empty() {
            "N/A".to_string()
        } else {
            self.top_routes.join(", ")
        }
    }
}

impl fmt::Display for Insights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fin = &self.financials;
        writeln!(f, "📊 AI Report Highlights:")?;
        writeln!(f)?;
        writeln!(f, "Total Trips: {}", self.total)?;
        writeln!(f, "On-going Trips: {}", self.ongoing)?;
        writeln!(f, "Completed Trips: {}", self.completed)?;
        writeln!(f, "Profit Percentage: {:.1}%", fin.profit_percent)?;
        writeln!(f)?;
        writeln!(f, "Financials:")?;
        writeln!(f, "- Revenue: ₹{:.2}M", fin.revenue_millions())?;
        writeln!(f, "- Expense: ₹{:.2}M", fin.expense_millions())?;
        writeln!(f, "- Profit: ₹{:.2}M", fin.profit_millions())?;
        writeln!(f, "- KMs Travelled: {:.1}K", fin.distance_thousands())?;
        writeln!(f, "- Cost per KM: ₹{:.2}", fin.cost_per_km)?;
        writeln!(f)?;
        writeln!(f, "AI Insights:")?;
        writeln!(
            f,
            "- Top Vehicle: {}",
            self.top_vehicle.as_deref().unwrap_or("N/A")
        )?;
        writeln!(f, "- Average Profit per Trip: ₹{:.2}", self.average_profit)?;
        write!(f, "- Top Routes: {}", self.top_routes_text())
    }
}

/// Multi-line digest for the dashboard and the text download.
pub fn insights_digest(records: &[TripRecord]) -> String {
    match Insights::from_records(records) {
        Ok(insights) => insights.to_string(),
        Err(AggregateError::NoData) => NO_DATA_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::aggregator::{filter_trips, TripFilter};

    fn record(id: &str, vehicle: &str, route: &str, status: &str, profit: f64) -> TripRecord {
        let mut record = TripRecord::new(id);
        record.vehicle_id = Some(vehicle.into());
        record.route = Some(route.into());
        record.trip_status = Some(TripStatus::from(status));
        record.freight_amount = Some(profit * 4.0);
        record.total_trip_expense = Some(profit * 3.0);
        record.net_profit = Some(profit);
        record.actual_distance_km = Some(500.0);
        record
    }

    fn fleet() -> Vec<TripRecord> {
        vec![
            record("T1", "V1", "A", "Completed", 100_000.0),
            record("T2", "V2", "C", "Pending Closure", 250_000.0),
            record("T3", "V1", "A", "Under Audit", 200_000.0),
        ]
    }

    #[test]
    fn empty_input_yields_fixed_message() {
        assert_eq!(insights_digest(&[]), NO_DATA_MESSAGE);
    }

    #[test]
    fn unknown_vehicle_filter_yields_fixed_message() {
        let filtered = filter_trips(&fleet(), &TripFilter::by_vehicle("V404"));
        assert_eq!(insights_digest(&filtered), NO_DATA_MESSAGE);
    }

    #[test]
    fn digest_lists_headline_figures() {
        let digest = insights_digest(&fleet());
        assert!(digest.starts_with("📊 AI Report Highlights:"));
        assert!(digest.contains("Total Trips: 3"));
        assert!(digest.contains("On-going Trips: 1"));
        assert!(digest.contains("Completed Trips: 1"));
        assert!(digest.contains("Profit Percentage: 25.0%"));
        assert!(digest.contains("- Revenue: ₹2.20M"));
        assert!(digest.contains("- Expense: ₹1.65M"));
        assert!(digest.contains("- Profit: ₹0.55M"));
        assert!(digest.contains("- KMs Travelled: 1.5K"));
        assert!(digest.contains("- Top Vehicle: V1"));
        assert!(digest.contains("- Average Profit per Trip: ₹183333.33"));
        assert!(digest.contains("- Top Routes: A, C"));
    }

    #[test]
    fn missing_labels_fall_back_to_na() {
        let insights = Insights::from_records(&[TripRecord::new("T1")]).unwrap();
        assert_eq!(insights.top_vehicle, None);
        assert_eq!(insights.top_routes_text(), "N/A");
        assert!(insights.to_string().contains("- Top Vehicle: N/A"));
    }
}
