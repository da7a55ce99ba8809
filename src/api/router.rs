use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/prices", get(handlers::list_prices))
        .route("/prices/:start_date/:end_date", get(handlers::list_prices_in_range))
        .route("/events", get(handlers::list_events))
        .route("/changepoints", get(handlers::list_changepoints))
        .route("/impact/:event_id", get(handlers::get_impact))
        .route("/statistics", get(handlers::get_statistics));

    Router::new()
        .route("/", get(handlers::index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
