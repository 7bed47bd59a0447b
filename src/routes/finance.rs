use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Finance Router Module
///
/// Admin only. The month segment canonicalizes to `:month`.
pub fn finance_routes() -> Router<AppState> {
    Router::new().route(
        "/api/financial/generate/{month}",
        post(handlers::generate_month),
    )
}
