use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::analysis::stats::Statistics;
use crate::api::error::ApiError;
use crate::api::state::AppState;

fn record_request(endpoint: &'static str) {
    metrics::counter!("brent_api_requests_total", "endpoint" => endpoint).increment(1);
}

fn record_error(endpoint: &'static str, err: &ApiError) {
    metrics::counter!("brent_api_request_errors_total", "endpoint" => endpoint, "kind" => err.kind()).increment(1);
    warn!(endpoint, kind = err.kind(), error = %err, "Request rejected");
}

pub async fn index() -> Json<Value> {
    record_request("index");
    Json(json!({
        "message": "Brent Oil Price Analysis API",
        "endpoints": {
            "/api/prices": "Get historical prices",
            "/api/prices/<start_date>/<end_date>": "Get prices in date range",
            "/api/events": "Get historical events",
            "/api/changepoints": "Get detected change points",
            "/api/impact/<event_id>": "Get impact analysis for specific event",
            "/api/statistics": "Get summary statistics"
        }
    }))
}

// Responses borrow from the shared dataset, so they are serialized before the state is dropped.

pub async fn list_prices(State(state): State<AppState>) -> Response {
    record_request("prices");
    Json(state.dataset.prices()).into_response()
}

pub async fn list_prices_in_range(
    State(state): State<AppState>,
    Path((start_date, end_date)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    record_request("prices_range");
    match state.dataset.prices_in_range(&start_date, &end_date) {
        Ok(prices) => {
            debug!(%start_date, %end_date, rows = prices.len(), "Served price range");
            Ok(Json(prices).into_response())
        }
        Err(e) => {
            let err = ApiError::from(e);
            record_error("prices_range", &err);
            Err(err)
        }
    }
}

pub async fn list_events(State(state): State<AppState>) -> Response {
    record_request("events");
    Json(state.dataset.events()).into_response()
}

pub async fn list_changepoints(State(state): State<AppState>) -> Response {
    record_request("changepoints");
    Json(state.dataset.change_points()).into_response()
}

pub async fn get_impact(State(state): State<AppState>, Path(event_id): Path<String>) -> Result<Response, ApiError> {
    record_request("impact");
    match state.dataset.impact(&event_id) {
        Ok(report) => Ok(Json(report).into_response()),
        Err(e) => {
            let err = ApiError::from(e);
            record_error("impact", &err);
            Err(err)
        }
    }
}

pub async fn get_statistics(State(state): State<AppState>) -> Json<Statistics> {
    record_request("statistics");
    Json(state.dataset.statistics())
}
