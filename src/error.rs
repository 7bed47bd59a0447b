use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::Role;

/// RepositoryError
///
/// Transport or query failure in the persistence layer. A missing row is *not* an error;
/// lookups return `Ok(None)` for that.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// AuditError
///
/// The audit sink refused or failed to persist an entry.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink error: {0}")]
    Sink(#[from] sqlx::Error),

    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// PolicyError
///
/// Raised while building the policy table at startup. Any of these aborts the process
/// before the listener is bound.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PolicyError {
    #[error("malformed policy key '{0}' (expected \"METHOD /path\")")]
    MalformedKey(String),

    #[error("duplicate policy key '{0}'")]
    DuplicateKey(String),

    #[error("policy key '{0}' has an empty role set")]
    EmptyRoleSet(String),

    #[error("ownership route '{0}' is not present in the policy table")]
    OrphanOwnershipRoute(String),
}

/// AccessError
///
/// Every way the request interceptor can refuse a request. The first five variants are
/// policy outcomes and map to 400/401/403; `Lookup` is an unexpected failure of the
/// user or resource lookup and maps to 500.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("no policy governs '{0}'")]
    Ungoverned(String),

    #[error("no verified caller")]
    Unauthenticated,

    #[error("role '{role}' is not permitted (allowed: {permitted:?})")]
    RoleDenied { role: Role, permitted: Vec<Role> },

    #[error("caller does not own the requested resource")]
    OwnershipDenied,

    #[error("malformed request: {0}")]
    MalformedRequest(&'static str),

    #[error("resource lookup failed: {0}")]
    Lookup(#[from] RepositoryError),
}

impl AccessError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AccessError::Ungoverned(_)
            | AccessError::RoleDenied { .. }
            | AccessError::OwnershipDenied => StatusCode::FORBIDDEN,
            AccessError::Lookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The only text a client ever sees. Role sets and keys stay server-side.
    fn public_message(&self) -> &'static str {
        match self {
            AccessError::Unauthenticated => "Authentication required",
            AccessError::MalformedRequest(_) => "Malformed request",
            AccessError::Ungoverned(_)
            | AccessError::RoleDenied { .. }
            | AccessError::OwnershipDenied => "Access denied",
            AccessError::Lookup(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        if let AccessError::Lookup(e) = &self {
            tracing::error!(error = %e, "lookup failed while authorizing request");
        }
        let body = json!({ "message": self.public_message() });
        (self.status(), Json(body)).into_response()
    }
}
