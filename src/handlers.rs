use crate::{
    AppState,
    audit::AuditEntry,
    auth::AuthUser,
    authorizer::SourceAddress,
    models::{
        self, CreateTrailerRequest, GenerateMonthResponse, Payment, Share, TrackingPoint,
        Trailer, UserProfile,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::json;
use uuid::Uuid;

// Role and ownership checks for every handler below happen in the interceptor before the
// handler runs. Handlers only do their own work and, for privileged writes, audit it.

/// health
///
/// [Public] Liveness probe.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// get_me
///
/// [Investor, Manager, Admin] The caller's resolved identity.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "No verified caller")
    )
)]
pub async fn get_me(AuthUser { id, role }: AuthUser) -> Json<UserProfile> {
    Json(UserProfile { id, role })
}

/// get_share
///
/// [Investor (owner only), Manager, Admin] A single share.
#[utoipa::path(
    get,
    path = "/api/shares/{id}",
    params(("id" = Uuid, Path, description = "Share ID")),
    responses(
        (status = 200, description = "Found", body = Share),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_share(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Share>, StatusCode> {
    state
        .repo
        .get_share(id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// get_payment
///
/// [Investor (owner of the parent share only), Manager, Admin] A single payment.
#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Found", body = Payment),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Payment>, StatusCode> {
    state
        .repo
        .get_payment(id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// list_trailers
///
/// [Investor, Manager, Admin] The whole fleet.
#[utoipa::path(
    get,
    path = "/api/trailers",
    responses((status = 200, description = "Fleet", body = [Trailer]))
)]
pub async fn list_trailers(State(state): State<AppState>) -> Json<Vec<models::Trailer>> {
    Json(state.repo.list_trailers().await)
}

/// create_trailer
///
/// [Manager, Admin] Registers a trailer and audits the creation.
#[utoipa::path(
    post,
    path = "/api/trailers",
    request_body = CreateTrailerRequest,
    responses(
        (status = 201, description = "Created", body = Trailer),
        (status = 403, description = "Role not permitted")
    )
)]
pub async fn create_trailer(
    AuthUser { id: actor_id, role }: AuthUser,
    SourceAddress(source): SourceAddress,
    State(state): State<AppState>,
    Json(payload): Json<CreateTrailerRequest>,
) -> Result<(StatusCode, Json<models::Trailer>), StatusCode> {
    let trailer = state.repo.create_trailer(payload).await.map_err(|e| {
        tracing::error!(error = %e, "create_trailer failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    state
        .audit
        .record(AuditEntry::new(
            Some(actor_id),
            "trailer_created",
            "trailer",
            Some(trailer.id.to_string()),
            json!({ "code": trailer.code, "role": role }),
            source,
        ))
        .await;

    Ok((StatusCode::CREATED, Json(trailer)))
}

/// get_tracking
///
/// [Investor, Manager, Admin] Latest GPS fixes for a trailer code.
#[utoipa::path(
    get,
    path = "/api/tracking/{code}",
    params(("code" = String, Path, description = "Trailer tracking code")),
    responses((status = 200, description = "Recent positions", body = [TrackingPoint]))
)]
pub async fn get_tracking(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Json<Vec<models::TrackingPoint>> {
    Json(state.repo.get_tracking(&code).await)
}

/// generate_month
///
/// [Admin] Triggers payout generation for a "YYYY-MM" month and audits the run.
#[utoipa::path(
    post,
    path = "/api/financial/generate/{month}",
    params(("month" = String, Path, description = "Year-month, e.g. 2025-10")),
    responses(
        (status = 202, description = "Generated", body = GenerateMonthResponse),
        (status = 403, description = "Role not permitted")
    )
)]
pub async fn generate_month(
    AuthUser { id: actor_id, role }: AuthUser,
    SourceAddress(source): SourceAddress,
    State(state): State<AppState>,
    Path(month): Path<String>,
) -> Result<(StatusCode, Json<GenerateMonthResponse>), StatusCode> {
    let generated = state.repo.generate_month(&month).await.map_err(|e| {
        tracing::error!(error = %e, month = %month, "generate_month failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    state
        .audit
        .record(AuditEntry::new(
            Some(actor_id),
            "financial_generated",
            "month",
            Some(month.clone()),
            json!({ "generated": generated, "role": role }),
            source,
        ))
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateMonthResponse { month, generated }),
    ))
}
