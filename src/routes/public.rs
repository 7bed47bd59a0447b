use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Gateway Router Module
///
/// `GET /api/health` is explicitly public in the policy table; `GET /api/auth/me` needs any
/// verified role.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        // Liveness probe for load balancers.
        .route("/api/health", get(handlers::health))
        // GET /api/auth/me
        // Echoes the identity the interceptor resolved.
        .route("/api/auth/me", get(handlers::get_me))
}
