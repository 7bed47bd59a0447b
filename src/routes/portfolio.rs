use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Portfolio Router Module
///
/// Both routes are ownership routes: an investor only gets past the interceptor for a
/// share they own, or a payment whose parent share they own.
pub fn portfolio_routes() -> Router<AppState> {
    Router::new()
        // GET /api/shares/{id}
        .route("/api/shares/{id}", get(handlers::get_share))
        // GET /api/payments/{id}
        // Canonicalizes to `/api/payments/:shareId`; ownership resolves payment -> share -> owner.
        .route("/api/payments/{id}", get(handlers::get_payment))
}
