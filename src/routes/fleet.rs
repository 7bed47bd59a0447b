use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Fleet Router Module
pub fn fleet_routes() -> Router<AppState> {
    Router::new()
        // GET /api/trailers: any role. POST /api/trailers: manager or admin, audited.
        .route(
            "/api/trailers",
            get(handlers::list_trailers).post(handlers::create_trailer),
        )
        // GET /api/tracking/{code}
        // Device codes such as `TRK-88A-01` canonicalize to `:trailerId`.
        .route("/api/tracking/{code}", get(handlers::get_tracking))
}
