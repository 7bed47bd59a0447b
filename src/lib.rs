use axum::{
    Json, Router,
    extract::FromRef,
    http::{HeaderName, StatusCode},
    middleware,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authorization subsystem.
pub mod access_log;
pub mod audit;
pub mod authorizer;
pub mod ownership;
pub mod policy;

// Collaborators and application plumbing.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

// Domain-grouped API routes.
pub mod routes;
use routes::{finance, fleet, portfolio, public};

// --- Public Re-exports ---

pub use audit::{AuditRecorder, AuditSinkState, MemoryAuditSink, PostgresAuditSink};
pub use authorizer::Authorizer;
pub use config::AppConfig;
pub use ownership::OwnershipChecker;
pub use policy::PolicyTable;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for the governed API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::get_me, handlers::get_share, handlers::get_payment,
        handlers::list_trailers, handlers::create_trailer, handlers::get_tracking,
        handlers::generate_month
    ),
    components(
        schemas(
            models::Role, models::Share, models::Payment, models::Trailer,
            models::TrackingPoint, models::CreateTrailerRequest, models::UserProfile,
            models::GenerateMonthResponse,
        )
    ),
    tags(
        (name = "trailer-invest", description = "Trailer leasing investor portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container for everything a request needs. The policy table inside
/// the authorizer is loaded once at startup and only ever read.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: credential support, owner lookups, handler reads.
    pub repo: RepositoryState,
    /// Append-only audit trail.
    pub audit: AuditRecorder,
    /// Role gate over the policy table.
    pub authorizer: Authorizer,
    /// Ownership gate for ownership routes.
    pub ownership: OwnershipChecker,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the authorization components around one repository and one audit sink.
    pub fn new(
        repo: RepositoryState,
        audit_sink: AuditSinkState,
        policy: PolicyTable,
        config: AppConfig,
    ) -> Self {
        let audit = AuditRecorder::new(audit_sink);
        Self {
            authorizer: Authorizer::new(Arc::new(policy), audit.clone()),
            ownership: OwnershipChecker::new(repo.clone(), audit.clone()),
            repo,
            audit,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// Reached only for paths that are governed but have no handler in this service, or for
/// non-API paths that match nothing.
async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" })))
}

/// create_router
///
/// Assembles the API routes and the middleware stack, outermost first:
/// CORS, request id + tracing, access logger, authorization interceptor, handlers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(portfolio::portfolio_routes())
        .merge(fleet::fleet_routes())
        .merge(finance::finance_routes())
        .fallback(not_found)
        // Every /api request, matched or not, is decided here before any handler runs.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authorizer::authorize_request,
        ))
        .layer(middleware::from_fn(access_log::access_log))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::DEBUG)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span per request carrying method, URI and the `x-request-id`, so audit and access
/// lines for one request correlate.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
