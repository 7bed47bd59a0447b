use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{Method, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use crate::{
    AppState,
    audit::{ACCESS_DENIED, AuditEntry, AuditRecorder},
    auth::{AuthContext, verify_credentials},
    error::AccessError,
    ownership::OwnershipTarget,
    policy::{PolicyEntry, PolicyKey, PolicyTable, ResourceKind, policy_key_for},
};

/// Authorized
///
/// A role-level allow. `ownership` is set when the route still needs the ownership check.
#[derive(Debug, Clone, PartialEq)]
pub struct Authorized {
    pub key: PolicyKey,
    pub ownership: Option<ResourceKind>,
    pub resource_id: Option<String>,
}

/// Authorizer
///
/// Decides whether the caller's role may invoke a route, using the policy table injected
/// at construction. Only a role mismatch is audited; ungoverned routes and missing
/// credentials are routing and authentication failures and return without a write.
#[derive(Clone)]
pub struct Authorizer {
    policy: Arc<PolicyTable>,
    audit: AuditRecorder,
}

impl Authorizer {
    pub fn new(policy: Arc<PolicyTable>, audit: AuditRecorder) -> Self {
        Self { policy, audit }
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub async fn authorize(
        &self,
        method: &Method,
        path: &str,
        ctx: Option<&AuthContext>,
        source_address: Option<&str>,
    ) -> Result<Authorized, AccessError> {
        let (key, resource_id) = policy_key_for(method, path);

        let Some(entry) = self.policy.lookup(&key) else {
            tracing::warn!(policy_key = %key, "request to ungoverned route");
            return Err(AccessError::Ungoverned(key.to_string()));
        };

        let allowed = |key: PolicyKey| Authorized {
            ownership: self.policy.ownership(&key),
            key,
            resource_id,
        };

        let roles = match entry {
            PolicyEntry::Public => return Ok(allowed(key)),
            PolicyEntry::Roles(roles) => roles,
        };

        let Some(ctx) = ctx else {
            tracing::debug!(policy_key = %key, "unauthenticated request to governed route");
            return Err(AccessError::Unauthenticated);
        };

        if roles.contains(&ctx.role) {
            return Ok(allowed(key));
        }

        let permitted = entry.permitted_roles();
        tracing::warn!(
            policy_key = %key,
            actor_id = %ctx.actor_id,
            role = %ctx.role,
            "role not permitted"
        );

        self.audit
            .record(AuditEntry::new(
                Some(ctx.actor_id),
                ACCESS_DENIED,
                "route",
                Some(key.to_string()),
                json!({
                    "method": method.as_str(),
                    "path": path,
                    "attempted_role": ctx.role,
                    "permitted_roles": permitted,
                }),
                source_address.map(str::to_string),
            ))
            .await;

        Err(AccessError::RoleDenied {
            role: ctx.role,
            permitted,
        })
    }
}

/// authorize_request
///
/// The request interceptor. For every `/api` request it verifies credentials, asks the
/// authorizer, runs the ownership check when the route demands it, and either forwards to
/// the handler or answers 400/401/403 itself (500 when a lookup fails). The resolved
/// [`AuthContext`] is attached to the request (for handlers) and to the response (for the
/// access logger).
pub async fn authorize_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !is_api_path(&path) {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let source = source_address(&request, state.config.trust_forwarded_for);
    let ctx = match verify_credentials(request.headers(), state.repo.as_ref(), &state.config).await
    {
        Ok(ctx) => ctx,
        Err(e) => return AccessError::Lookup(e).into_response(),
    };

    let outcome = guard(&state, &method, &path, ctx.as_ref(), source.as_deref()).await;

    let mut response = match outcome {
        Ok(()) => {
            if let Some(ctx) = ctx {
                request.extensions_mut().insert(ctx);
            }
            request.extensions_mut().insert(SourceAddress(source));
            next.run(request).await
        }
        Err(denial) => denial.into_response(),
    };

    if let Some(ctx) = ctx {
        response.extensions_mut().insert(ctx);
    }
    response
}

async fn guard(
    state: &AppState,
    method: &Method,
    path: &str,
    ctx: Option<&AuthContext>,
    source: Option<&str>,
) -> Result<(), AccessError> {
    let authorized = state.authorizer.authorize(method, path, ctx, source).await?;

    let Some(kind) = authorized.ownership else {
        return Ok(());
    };
    let ctx = ctx.ok_or(AccessError::Unauthenticated)?;

    state
        .ownership
        .check(
            OwnershipTarget {
                kind,
                resource_id: authorized.resource_id.as_deref(),
                method,
                path,
                source_address: source,
            },
            ctx,
        )
        .await
}

/// SourceAddress
///
/// The client address resolved by the interceptor, for handlers that write audit entries.
/// Extracts as `SourceAddress(None)` outside the interceptor.
#[derive(Debug, Clone, Default)]
pub struct SourceAddress(pub Option<String>);

impl<S> FromRequestParts<S> for SourceAddress
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SourceAddress>()
            .cloned()
            .unwrap_or_default())
    }
}

pub(crate) fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Client address. The first `x-forwarded-for` hop wins only when `trust_forwarded_for`
/// is set; otherwise the header is ignored and the peer address is used.
fn source_address(request: &Request, trust_forwarded_for: bool) -> Option<String> {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .filter(|_| trust_forwarded_for)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|hop| hop.trim().to_string())
        .filter(|hop| !hop.is_empty());

    forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}
