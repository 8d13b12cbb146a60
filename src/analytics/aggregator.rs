use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    ops::RangeInclusive,
};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::models::trip::{TripRecord, TripStatus};

use super::AggregateError;

/// Day-of-month buckets used by the daily charts.
pub const FULL_MONTH: RangeInclusive<u32> = 1..=31;

/// Numeric columns that can be summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripField {
    FreightAmount,
    TotalTripExpense,
    NetProfit,
    ActualDistanceKm,
}

impl TripField {
    /// Missing and non-finite cells read as zero.
    pub fn value(&self, record: &TripRecord) -> f64 {
        let raw = match self {
            TripField::FreightAmount => record.freight_amount,
            TripField::TotalTripExpense => record.total_trip_expense,
            TripField::NetProfit => record.net_profit,
            TripField::ActualDistanceKm => record.actual_distance_km,
        };
        raw.filter(|value| value.is_finite()).unwrap_or(0.0)
    }
}

/// Label columns that records can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Vehicle,
    Route,
}

impl GroupField {
    pub fn key<'a>(&self, record: &'a TripRecord) -> Option<&'a str> {
        let raw = match self {
            GroupField::Vehicle => record.vehicle_id.as_deref(),
            GroupField::Route => record.route.as_deref(),
        };
        raw.filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TripFilter {
    pub vehicle: Option<String>,
    pub route: Option<String>,
}

impl TripFilter {
    /// Blank values mean "no filter", matching the "All" dropdown entries.
    pub fn new(vehicle: Option<String>, route: Option<String>) -> Self {
        Self {
            vehicle: normalize(vehicle),
            route: normalize(route),
        }
    }

    pub fn by_vehicle(vehicle: impl Into<String>) -> Self {
        Self::new(Some(vehicle.into()), None)
    }

    pub fn by_route(route: impl Into<String>) -> Self {
        Self::new(None, Some(route.into()))
    }

    pub fn matches(&self, record: &TripRecord) -> bool {
        field_matches(self.vehicle.as_deref(), record.vehicle_id.as_deref())
            && field_matches(self.route.as_deref(), record.route.as_deref())
    }
}

fn field_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => actual == Some(wanted),
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub fn filter_trips(records: &[TripRecord], filter: &TripFilter) -> Vec<TripRecord> {
    records
        .iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect()
}

pub fn count_by_status(records: &[TripRecord], status: &TripStatus) -> usize {
    records
        .iter()
        .filter(|record| record.has_status(status))
        .count()
}

/// Counts records per day of month, one entry per day in `days`.
///
/// Only the day number is used; month and year are ignored. Undated records
/// and days outside the range are not counted.
pub fn count_by_day<'a, I>(records: I, days: RangeInclusive<u32>) -> Vec<usize>
where
    I: IntoIterator<Item = &'a TripRecord>,
{
    let start = *days.start();
    let mut buckets = vec![0usize; days.clone().count()];
    for record in records {
        let Some(date) = record.trip_date else {
            continue;
        };
        let day = date.day();
        if days.contains(&day) {
            buckets[(day - start) as usize] += 1;
        }
    }
    buckets
}

/// Per-day share of audited trips, in percent rounded to one decimal.
pub fn audit_rate_by_day(audited: &[usize], total: &[usize]) -> Vec<f64> {
    audited
        .iter()
        .zip(total)
        .map(|(&audited, &total)| {
            if total == 0 {
                0.0
            } else {
                super::round_to(audited as f64 / total as f64 * 100.0, 1)
            }
        })
        .collect()
}

pub fn sum_field(records: &[TripRecord], field: TripField) -> f64 {
    records.iter().map(|record| field.value(record)).sum()
}

pub fn average_field(records: &[TripRecord], field: TripField) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    sum_field(records, field) / records.len() as f64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub revenue: f64,
    pub expense: f64,
    pub profit: f64,
    pub distance_km: f64,
    pub profit_percent: f64,
    /// Net profit per kilometre, shown as "Cost per KM" on the dashboards.
    pub cost_per_km: f64,
}

impl FinancialSummary {
    pub fn revenue_millions(&self) -> f64 {
        self.revenue / 1e6
    }

    pub fn expense_millions(&self) -> f64 {
        self.expense / 1e6
    }

    pub fn profit_millions(&self) -> f64 {
        self.profit / 1e6
    }

    pub fn distance_thousands(&self) -> f64 {
        self.distance_km / 1e3
    }
}

pub fn financial_summary(records: &[TripRecord]) -> FinancialSummary {
    let revenue = sum_field(records, TripField::FreightAmount);
    let expense = sum_field(records, TripField::TotalTripExpense);
    let profit = sum_field(records, TripField::NetProfit);
    let distance_km = sum_field(records, TripField::ActualDistanceKm);

    let profit_percent = if revenue != 0.0 {
        profit / revenue * 100.0
    } else {
        0.0
    };
    let cost_per_km = if distance_km != 0.0 {
        profit / distance_km
    } else {
        0.0
    };

    FinancialSummary {
        revenue,
        expense,
        profit,
        distance_km,
        profit_percent,
        cost_per_km,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub flagged: usize,
    pub resolved: usize,
}

pub fn audit_summary(records: &[TripRecord]) -> AuditSummary {
    let (flagged, resolved) = records
        .iter()
        .filter(|record| record.has_status(&TripStatus::UnderAudit))
        .fold((0, 0), |(flagged, resolved), record| {
            (flagged + 1, resolved + usize::from(record.pod_confirmed()))
        });
    AuditSummary { flagged, resolved }
}

/// Group key with the largest summed `value`.
///
/// Records without a key are skipped. Ties go to the smallest key.
pub fn top_entity(
    records: &[TripRecord],
    group: GroupField,
    value: TripField,
) -> Result<String, AggregateError> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        if let Some(key) = group.key(record) {
            *totals.entry(key).or_default() += value.value(record);
        }
    }

    let mut best: Option<(&str, f64)> = None;
    for (key, total) in totals {
        match best {
            Some((_, current)) if total <= current => {}
            _ => best = Some((key, total)),
        }
    }
    best.map(|(key, _)| key.to_string())
        .ok_or(AggregateError::NoData)
}

/// Up to `n` most frequent labels. Ties keep first-seen order.
pub fn top_values(records: &[TripRecord], group: GroupField, n: usize) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        if let Some(key) = group.key(record) {
            counts.entry(key).or_insert((0, index)).0 += 1;
        }
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(key, (count, first_seen))| (key, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(n)
        .map(|(key, _, _)| key.to_string())
        .collect()
}

/// Sorted distinct keys, for filter dropdowns.
pub fn distinct_values(records: &[TripRecord], group: GroupField) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| group.key(record))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn trip(id: &str, status: &str, day: Option<u32>) -> TripRecord {
        let mut record = TripRecord::new(id);
        record.trip_status = Some(TripStatus::from(status));
        record.trip_date = day.and_then(|d| NaiveDate::from_ymd_opt(2024, 5, d));
        record
    }

    fn scenario() -> Vec<TripRecord> {
        let mut audited = trip("T3", "Under Audit", Some(6));
        audited.pod_status = Some("Yes".into());
        vec![
            trip("T1", "Completed", Some(5)),
            trip("T2", "Pending Closure", Some(5)),
            audited,
        ]
    }

    #[test]
    fn scenario_counts_by_day_and_status() {
        let records = scenario();
        let daily = count_by_day(&records, FULL_MONTH);
        assert_eq!(daily.len(), 31);
        assert_eq!(daily[4], 2);
        assert_eq!(daily[5], 1);
        assert_eq!(daily.iter().sum::<usize>(), 3);
        assert_eq!(count_by_status(&records, &TripStatus::Completed), 1);
        assert_eq!(
            audit_summary(&records),
            AuditSummary {
                flagged: 1,
                resolved: 1
            }
        );
    }

    #[test]
    fn undated_records_are_left_out_of_daily_buckets() {
        let mut records = scenario();
        records.push(trip("T4", "Completed", None));
        let daily = count_by_day(&records, FULL_MONTH);
        assert_eq!(daily.iter().sum::<usize>(), 3);
        assert_eq!(count_by_status(&records, &TripStatus::Completed), 2);
    }

    #[test]
    fn short_range_drops_day_31() {
        let records = vec![trip("T1", "Completed", Some(31)), trip("T2", "Completed", Some(1))];
        let daily = count_by_day(&records, 1..=30);
        assert_eq!(daily.len(), 30);
        assert_eq!(daily.iter().sum::<usize>(), 1);
    }

    #[test]
    fn status_counts_never_exceed_total() {
        let mut records = scenario();
        records.push(trip("T5", "Cancelled", Some(2)));
        let known = count_by_status(&records, &TripStatus::Completed)
            + count_by_status(&records, &TripStatus::PendingClosure)
            + count_by_status(&records, &TripStatus::UnderAudit);
        assert_eq!(known, 3);
        assert!(known <= records.len());
    }

    #[test]
    fn empty_financials_are_zero_guarded() {
        let summary = financial_summary(&[]);
        assert_eq!(summary.profit_percent, 0.0);
        assert_eq!(summary.cost_per_km, 0.0);
        assert_eq!(summary, FinancialSummary::default());
    }

    #[test]
    fn financials_use_stored_profit() {
        let mut a = TripRecord::new("A");
        a.freight_amount = Some(200_000.0);
        a.total_trip_expense = Some(150_000.0);
        a.net_profit = Some(40_000.0);
        a.actual_distance_km = Some(400.0);
        let mut b = TripRecord::new("B");
        b.freight_amount = Some(f64::NAN);
        b.net_profit = Some(10_000.0);
        b.actual_distance_km = None;

        let summary = financial_summary(&[a, b]);
        assert_eq!(summary.revenue, 200_000.0);
        assert_eq!(summary.profit, 50_000.0);
        assert_eq!(summary.profit_percent, 25.0);
        assert_eq!(summary.cost_per_km, 125.0);
        assert_eq!(summary.revenue_millions(), 0.2);
    }

    #[test]
    fn filter_by_missing_vehicle_is_empty() {
        let mut records = scenario();
        records[0].vehicle_id = Some("V1".into());
        records[1].route = Some("A".into());
        assert!(filter_trips(&records, &TripFilter::by_vehicle("V9")).is_empty());
        assert_eq!(filter_trips(&records, &TripFilter::by_vehicle("V1")).len(), 1);
        assert_eq!(filter_trips(&records, &TripFilter::by_route("A")).len(), 1);
        assert_eq!(
            filter_trips(&records, &TripFilter::new(Some(" ".into()), None)).len(),
            3
        );
    }

    #[test]
    fn top_entity_picks_highest_sum_and_signals_empty() {
        let mut records = Vec::new();
        for (id, vehicle, profit) in [("1", "V2", 10.0), ("2", "V1", 30.0), ("3", "V2", 25.0)] {
            let mut record = TripRecord::new(id);
            record.vehicle_id = Some(vehicle.into());
            record.net_profit = Some(profit);
            records.push(record);
        }
        assert_eq!(
            top_entity(&records, GroupField::Vehicle, TripField::NetProfit).as_deref(),
            Ok("V2")
        );
        assert_eq!(
            top_entity(&[], GroupField::Vehicle, TripField::NetProfit),
            Err(AggregateError::NoData)
        );
        assert_eq!(
            top_entity(&scenario(), GroupField::Vehicle, TripField::NetProfit),
            Err(AggregateError::NoData)
        );
    }

    #[test]
    fn top_entity_ties_go_to_smallest_key() {
        let mut records = Vec::new();
        for (id, vehicle) in [("1", "V9"), ("2", "V3")] {
            let mut record = TripRecord::new(id);
            record.vehicle_id = Some(vehicle.into());
            record.net_profit = Some(5.0);
            records.push(record);
        }
        assert_eq!(
            top_entity(&records, GroupField::Vehicle, TripField::NetProfit).as_deref(),
            Ok("V3")
        );
    }

    #[test]
    fn top_values_ranks_by_frequency() {
        let records: Vec<TripRecord> = ["C", "A", "B", "A", "C", "A"]
            .into_iter()
            .enumerate()
            .map(|(i, route)| {
                let mut record = TripRecord::new(i.to_string());
                record.route = Some(route.into());
                record
            })
            .collect();
        assert_eq!(top_values(&records, GroupField::Route, 2), vec!["A", "C"]);
        assert_eq!(
            distinct_values(&records, GroupField::Route),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn audit_rate_guards_empty_days() {
        assert_eq!(audit_rate_by_day(&[1, 0, 2], &[3, 0, 2]), vec![33.3, 0.0, 100.0]);
    }
}
