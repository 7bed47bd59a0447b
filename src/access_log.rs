use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};

use crate::{auth::AuthContext, authorizer::is_api_path};

/// access_log
///
/// Response-completion hook for `/api` requests: one line per call with actor, role,
/// method, path, status and elapsed time. Reads the caller from the response extensions
/// (set by the interceptor) and never alters the response.
pub async fn access_log(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if !is_api_path(&path) {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let started = Instant::now();
    let response = next.run(request).await;

    let ctx = response.extensions().get::<AuthContext>().copied();
    log_completion(&method, &path, response.status(), started.elapsed(), ctx.as_ref());
    response
}

/// 5xx logs at error, 4xx at warn, everything else at info.
pub fn log_completion(
    method: &Method,
    path: &str,
    status: StatusCode,
    elapsed: Duration,
    ctx: Option<&AuthContext>,
) {
    let actor = ctx
        .map(|ctx| ctx.actor_id.to_string())
        .unwrap_or_else(|| "anonymous".to_string());
    let role = ctx.map(|ctx| ctx.role.as_str()).unwrap_or("none");
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let status = status.as_u16();

    macro_rules! emit {
        ($level:ident) => {
            tracing::$level!(
                target: "access",
                actor = %actor,
                role = role,
                method = %method,
                path = path,
                status = status,
                elapsed_ms = elapsed_ms,
                "api request completed"
            )
        };
    }

    match status {
        500.. => emit!(error),
        400..=499 => emit!(warn),
        _ => emit!(info),
    }
}
