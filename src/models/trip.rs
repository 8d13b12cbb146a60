use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_with::{serde_as, DeserializeAs};
use tracing::warn;

// Slash dates are month-first; day-first only when the month-first read is invalid.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum TripStatus {
    PendingClosure,
    Completed,
    UnderAudit,
    Other(String),
}

impl TripStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TripStatus::PendingClosure => "Pending Closure",
            TripStatus::Completed => "Completed",
            TripStatus::UnderAudit => "Under Audit",
            TripStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for TripStatus {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "Pending Closure" => TripStatus::PendingClosure,
            "Completed" => TripStatus::Completed,
            "Under Audit" => TripStatus::UnderAudit,
            other => TripStatus::Other(other.to_string()),
        }
    }
}

impl From<&str> for TripStatus {
    fn from(raw: &str) -> Self {
        TripStatus::from(raw.to_string())
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One spreadsheet row. Column names follow the fleet workbook headers.
///
/// Numeric cells that fail to parse are kept as `None` and count as zero in
/// sums. Grouped amounts such as `1,200` are read as numbers. `net_profit` is stored as given and never derived from the other
/// amounts.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripRecord {
    #[serde(rename = "Trip ID")]
    pub trip_id: String,
    #[serde(rename = "Vehicle ID", default)]
    pub vehicle_id: Option<String>,
    #[serde(rename = "Route", default)]
    pub route: Option<String>,
    #[serde(rename = "Trip Date", default, deserialize_with = "lenient_date")]
    pub trip_date: Option<NaiveDate>,
    #[serde(rename = "Trip Status", default)]
    pub trip_status: Option<TripStatus>,
    #[serde(rename = "POD Status", default)]
    pub pod_status: Option<String>,
    #[serde_as(as = "LenientAmount")]
    #[serde(rename = "Freight Amount", default)]
    pub freight_amount: Option<f64>,
    #[serde_as(as = "LenientAmount")]
    #[serde(rename = "Total Trip Expense", default)]
    pub total_trip_expense: Option<f64>,
    #[serde_as(as = "LenientAmount")]
    #[serde(rename = "Net Profit", default)]
    pub net_profit: Option<f64>,
    #[serde_as(as = "LenientAmount")]
    #[serde(rename = "Actual Distance (KM)", default)]
    pub actual_distance_km: Option<f64>,
}

impl TripRecord {
    pub fn new(trip_id: impl Into<String>) -> Self {
        Self {
            trip_id: trip_id.into(),
            ..Self::default()
        }
    }

    pub fn has_status(&self, status: &TripStatus) -> bool {
        self.trip_status.as_ref() == Some(status)
    }

    pub fn pod_confirmed(&self) -> bool {
        self.pod_status.as_deref().map(str::trim) == Some("Yes")
    }

    pub fn status_text(&self) -> &str {
        self.trip_status.as_ref().map(TripStatus::as_str).unwrap_or("")
    }

    pub fn vehicle_text(&self) -> &str {
        self.vehicle_id.as_deref().unwrap_or("")
    }

    pub fn route_text(&self) -> &str {
        self.route.as_deref().unwrap_or("")
    }

    pub fn pod_text(&self) -> &str {
        self.pod_status.as_deref().unwrap_or("")
    }
}

/// Parses the date formats seen in workbook exports. Anything else is `None`.
pub fn parse_trip_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|format| {
                NaiveDateTime::parse_from_str(raw, format)
                    .ok()
                    .map(|dt| dt.date())
            })
        })
}

/// Reads amount cells such as `1,200` or `₹ 95,000.50`.
pub struct LenientAmount;

impl<'de> DeserializeAs<'de, Option<f64>> for LenientAmount {
    fn deserialize_as<D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_amount))
    }
}

/// Strips grouping separators and the rupee sign. Blank cells are `None`
/// silently; anything else unreadable is logged.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | '₹') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!("unreadable amount {raw:?}, counted as zero");
            None
        }
    }
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_trip_date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_export_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6);
        assert_eq!(parse_trip_date("2024-05-06"), expected);
        assert_eq!(parse_trip_date("05/06/2024"), expected);
        assert_eq!(parse_trip_date("2024-05-06 00:00:00"), expected);
        assert_eq!(parse_trip_date(" 2024-05-06T13:45:00 "), expected);
    }

    #[test]
    fn slash_dates_are_month_first_with_day_first_fallback() {
        assert_eq!(
            parse_trip_date("5/13/2024"),
            NaiveDate::from_ymd_opt(2024, 5, 13)
        );
        assert_eq!(
            parse_trip_date("05/06/2024"),
            NaiveDate::from_ymd_opt(2024, 5, 6)
        );
        assert_eq!(
            parse_trip_date("5/6/2024 0:00"),
            NaiveDate::from_ymd_opt(2024, 5, 6)
        );
        assert_eq!(
            parse_trip_date("13/05/2024"),
            NaiveDate::from_ymd_opt(2024, 5, 13)
        );
        assert_eq!(
            parse_trip_date("25/12/2024 18:30"),
            NaiveDate::from_ymd_opt(2024, 12, 25)
        );
    }

    #[test]
    fn amounts_accept_grouping_separators() {
        assert_eq!(parse_amount("1,200"), Some(1200.0));
        assert_eq!(parse_amount(" ₹ 95,000.50 "), Some(95000.5));
        assert_eq!(parse_amount("-3,000"), Some(-3000.0));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn garbage_dates_are_none() {
        assert_eq!(parse_trip_date(""), None);
        assert_eq!(parse_trip_date("tomorrow"), None);
        assert_eq!(parse_trip_date("2024-13-45"), None);
    }

    #[test]
    fn status_maps_known_labels() {
        assert_eq!(TripStatus::from(" Under Audit "), TripStatus::UnderAudit);
        assert_eq!(
            TripStatus::from("Cancelled"),
            TripStatus::Other("Cancelled".into())
        );
        assert_eq!(TripStatus::PendingClosure.to_string(), "Pending Closure");
    }

    #[test]
    fn pod_requires_exact_yes() {
        let mut trip = TripRecord::new("T1");
        assert!(!trip.pod_confirmed());
        trip.pod_status = Some("yes".into());
        assert!(!trip.pod_confirmed());
        trip.pod_status = Some("Yes ".into());
        assert!(trip.pod_confirmed());
    }
}
