use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregate::Mood;
use crate::config::{find_location, Location, LOCATIONS};
use crate::engine::{DayReport, Engine};
use crate::history::HistoryEntry;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/score", get(get_score))
        .route("/refresh", post(post_refresh))
        .route("/mood", post(post_mood))
        .route("/locations", get(get_locations))
        .route("/location", post(post_location))
        .route("/history", get(get_history))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Alias kept for callers that build the router as `api::router(state)`.
pub fn router(state: AppState) -> Router {
    create_router(state)
}

#[derive(Serialize)]
struct ErrorOut {
    error: String,
}

fn error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorOut { error: msg.into() })).into_response()
}

fn report_or_conflict(report: Option<DayReport>) -> Response {
    match report {
        Some(r) => Json(r).into_response(),
        None => error(StatusCode::CONFLICT, "refresh superseded by a newer one"),
    }
}

/// Latest report; concurrent first readers share one refresh.
async fn get_score(State(state): State<AppState>) -> Response {
    match state.engine.current_report().await {
        Some(r) => Json(r).into_response(),
        None => error(StatusCode::SERVICE_UNAVAILABLE, "refresh failed"),
    }
}

async fn post_refresh(State(state): State<AppState>) -> Response {
    report_or_conflict(state.engine.refresh().await)
}

#[derive(Deserialize)]
struct MoodReq {
    mood: Mood,
}

#[derive(Serialize)]
struct MoodPending {
    mood: Mood,
    pending: bool,
}

async fn post_mood(State(state): State<AppState>, Json(body): Json<MoodReq>) -> Response {
    match state.engine.set_mood(body.mood) {
        Some(r) => Json(r).into_response(),
        // Stored; the total is computed when the running cycle settles.
        None => (
            StatusCode::ACCEPTED,
            Json(MoodPending {
                mood: body.mood,
                pending: true,
            }),
        )
            .into_response(),
    }
}

#[derive(Serialize)]
struct LocationsOut {
    selected: &'static str,
    locations: Vec<Location>,
}

async fn get_locations(State(state): State<AppState>) -> Json<LocationsOut> {
    Json(LocationsOut {
        selected: state.engine.location().id,
        locations: LOCATIONS.to_vec(),
    })
}

#[derive(Deserialize)]
struct LocationReq {
    id: String,
}

async fn post_location(State(state): State<AppState>, Json(body): Json<LocationReq>) -> Response {
    if find_location(&body.id).is_none() {
        return error(
            StatusCode::BAD_REQUEST,
            format!("unknown location id {:?}", body.id),
        );
    }
    match state.engine.change_location(&body.id).await {
        Ok(report) => report_or_conflict(report),
        Err(e) => {
            tracing::warn!(error = ?e, "location change failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn get_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.engine.history())
}
