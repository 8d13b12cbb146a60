use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;

use crate::{
    analytics::{
        aggregator::{audit_rate_by_day, distinct_values},
        count_by_day, filter_trips, insights_digest, round_to, DashboardSummary, GroupField,
        TripFilter, FULL_MONTH,
    },
    auth::CurrentUser,
    error::AppError,
    models::{trip::TripStatus, user::Right},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(overview))
        .route("/dashboard/daily", get(daily))
        .route("/reports/summary.csv", get(summary_csv))
        .route("/reports/insights.txt", get(insights_txt))
}

#[derive(Clone)]
struct SelectOption {
    value: String,
    selected: bool,
}

fn select_options(values: Vec<String>, selected: Option<&str>) -> Vec<SelectOption> {
    values
        .into_iter()
        .map(|value| SelectOption {
            selected: selected == Some(value.as_str()),
            value,
        })
        .collect()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|err| AppError::Other(err.into()))
}

#[derive(Template)]
#[template(path = "dashboard/overview.html")]
struct OverviewTemplate {
    user_name: String,
    user_role: String,
    vehicles: Vec<SelectOption>,
    routes: Vec<SelectOption>,
    selected_vehicle: String,
    selected_route: String,
    summary: DashboardSummary,
    digest: String,
    day_labels_json: String,
    daily_json: String,
    audited_json: String,
    audit_rate_json: String,
    finance_json: String,
}

async fn overview(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<TripFilter>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_right(Right::View)?;
    let filter = TripFilter::new(query.vehicle, query.route);
    let all = state.trips.load().await?;
    let trips = filter_trips(&all, &filter);

    let summary = DashboardSummary::from_records(&trips);
    let daily = count_by_day(&trips, FULL_MONTH);
    let audited = count_by_day(
        trips
            .iter()
            .filter(|trip| trip.has_status(&TripStatus::UnderAudit)),
        FULL_MONTH,
    );
    let audit_rate = audit_rate_by_day(&audited, &daily);
    let fin = &summary.financials;
    let finance = [
        round_to(fin.revenue_millions(), 2),
        round_to(fin.expense_millions(), 2),
        round_to(fin.profit_millions(), 2),
    ];
    let day_labels: Vec<u32> = FULL_MONTH.collect();

    Ok(AskamaTemplateResponse::into_response(OverviewTemplate {
        user_name: user.name.clone(),
        user_role: user.role.clone(),
        vehicles: select_options(
            distinct_values(&all, GroupField::Vehicle),
            filter.vehicle.as_deref(),
        ),
        routes: select_options(
            distinct_values(&all, GroupField::Route),
            filter.route.as_deref(),
        ),
        selected_vehicle: filter.vehicle.clone().unwrap_or_default(),
        selected_route: filter.route.clone().unwrap_or_default(),
        digest: insights_digest(&trips),
        day_labels_json: to_json(&day_labels)?,
        daily_json: to_json(&daily)?,
        audited_json: to_json(&audited)?,
        audit_rate_json: to_json(&audit_rate)?,
        finance_json: to_json(&finance)?,
        summary,
    }))
}

#[derive(Template)]
#[template(path = "dashboard/daily.html")]
struct DailyTemplate {
    total_sum: usize,
    ongoing_sum: usize,
    closed_sum: usize,
    day_labels_json: String,
    total_json: String,
    ongoing_json: String,
    closed_json: String,
}

async fn daily(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    current.require_right(Right::View)?;
    let trips = state.trips.load().await?;

    let with_status = |status: TripStatus| {
        count_by_day(
            trips.iter().filter(move |trip| trip.has_status(&status)),
            FULL_MONTH,
        )
    };
    let total = count_by_day(&trips, FULL_MONTH);
    let ongoing = with_status(TripStatus::PendingClosure);
    let closed = with_status(TripStatus::Completed);
    let day_labels: Vec<u32> = FULL_MONTH.collect();

    Ok(AskamaTemplateResponse::into_response(DailyTemplate {
        total_sum: total.iter().sum(),
        ongoing_sum: ongoing.iter().sum(),
        closed_sum: closed.iter().sum(),
        day_labels_json: to_json(&day_labels)?,
        total_json: to_json(&total)?,
        ongoing_json: to_json(&ongoing)?,
        closed_json: to_json(&closed)?,
    }))
}

async fn summary_csv(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<TripFilter>,
) -> Result<impl IntoResponse, AppError> {
    current.require_right(Right::View)?;
    let filter = TripFilter::new(query.vehicle, query.route);
    let trips = filter_trips(&state.trips.load().await?, &filter);
    let body = DashboardSummary::from_records(&trips).to_csv()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"fleet_summary_report.csv\"",
            ),
        ],
        body,
    ))
}

async fn insights_txt(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<TripFilter>,
) -> Result<impl IntoResponse, AppError> {
    current.require_right(Right::View)?;
    let filter = TripFilter::new(query.vehicle, query.route);
    let trips = filter_trips(&state.trips.load().await?, &filter);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"AI_Report_Summary.txt\"",
            ),
        ],
        insights_digest(&trips),
    ))
}
