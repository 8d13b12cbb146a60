use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{extract::State, response::IntoResponse, routing::get, Router};

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        trip::{TripRecord, TripStatus},
        user::Right,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generator", get(generator))
        .route("/closure", get(closure))
        .route("/ongoing", get(ongoing))
        .route("/auditor", get(auditor))
}

#[derive(Clone)]
struct TripRow {
    trip_id: String,
    vehicle: String,
    route: String,
    status: String,
    pod: String,
}

impl From<&TripRecord> for TripRow {
    fn from(trip: &TripRecord) -> Self {
        Self {
            trip_id: trip.trip_id.clone(),
            vehicle: trip.vehicle_text().to_string(),
            route: trip.route_text().to_string(),
            status: trip.status_text().to_string(),
            pod: trip.pod_text().to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "trips/table.html")]
struct TripTableTemplate {
    title: String,
    show_pod: bool,
    rows: Vec<TripRow>,
}

async fn render_table(
    state: &AppState,
    current: &CurrentUser,
    title: &str,
    status: Option<TripStatus>,
) -> Result<impl IntoResponse, AppError> {
    current.require_right(Right::View)?;
    let trips = state.trips.load().await?;
    let show_pod = status == Some(TripStatus::UnderAudit);
    let rows = trips
        .iter()
        .filter(|trip| match &status {
            Some(status) => trip.has_status(status),
            None => true,
        })
        .map(TripRow::from)
        .collect();
    Ok(AskamaTemplateResponse::into_response(TripTableTemplate {
        title: title.to_string(),
        show_pod,
        rows,
    }))
}

async fn generator(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    render_table(&state, &current, "Trip Generator", None).await
}

async fn closure(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    render_table(
        &state,
        &current,
        "Trip Closure",
        Some(TripStatus::PendingClosure),
    )
    .await
}

async fn ongoing(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    render_table(
        &state,
        &current,
        "Ongoing Trips",
        Some(TripStatus::PendingClosure),
    )
    .await
}

async fn auditor(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    render_table(
        &state,
        &current,
        "Trip Auditor",
        Some(TripStatus::UnderAudit),
    )
    .await
}
