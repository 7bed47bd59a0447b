#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc, sync::Mutex};
use tower::ServiceExt;
use trailer_invest::{
    AppConfig, AppState, MemoryAuditSink, PolicyTable, create_router,
    audit::AuditSinkState,
    error::RepositoryError,
    models::{CreateTrailerRequest, Payment, Share, TrackingPoint, Trailer, User},
    repository::{Repository, RepositoryState},
};
use uuid::Uuid;

// --- Fixture identities ---

pub const INVESTOR: Uuid = Uuid::from_u128(0x1001);
pub const OTHER_INVESTOR: Uuid = Uuid::from_u128(0x1002);
pub const MANAGER: Uuid = Uuid::from_u128(0x2001);
pub const ADMIN: Uuid = Uuid::from_u128(0x3001);

pub const INVESTOR_SHARE: Uuid = Uuid::from_u128(0xa001);
pub const OTHER_SHARE: Uuid = Uuid::from_u128(0xa002);
pub const INVESTOR_PAYMENT: Uuid = Uuid::from_u128(0xb001);
pub const OTHER_PAYMENT: Uuid = Uuid::from_u128(0xb002);

// --- Mock Repository ---

/// In-memory stand-in for the persistence layer. Owner lookups honour the same
/// payment -> share -> owner hop as the Postgres implementation.
#[derive(Default)]
pub struct MockRepository {
    pub users: HashMap<Uuid, User>,
    pub shares: HashMap<Uuid, Share>,
    pub payments: HashMap<Uuid, Payment>,
    pub trailers: Mutex<Vec<Trailer>>,
    pub fail_lookups: bool,
    pub fail_user_lookups: bool,
}

impl MockRepository {
    pub fn with_user(mut self, id: Uuid, role: &str) -> Self {
        self.users.insert(
            id,
            User {
                id,
                email: format!("{}@example.com", id.simple()),
                role: role.to_string(),
            },
        );
        self
    }

    pub fn with_share(mut self, id: Uuid, owner: Uuid) -> Self {
        self.shares.insert(
            id,
            Share {
                id,
                user_id: owner,
                trailer_id: Uuid::from_u128(0xc001),
                percentage: 12.5,
                created_at: Utc::now(),
            },
        );
        self
    }

    pub fn with_payment(mut self, id: Uuid, share_id: Uuid) -> Self {
        self.payments.insert(
            id,
            Payment {
                id,
                share_id,
                month: "2025-10".to_string(),
                amount_cents: 42_00,
                paid: false,
                created_at: Utc::now(),
            },
        );
        self
    }

    /// Owner lookups fail; user lookups still succeed.
    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn failing_user_lookups(mut self) -> Self {
        self.fail_user_lookups = true;
        self
    }
}

fn lookup_failure() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl Repository for MockRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        if self.fail_user_lookups {
            return Err(lookup_failure());
        }
        Ok(self.users.get(&id).cloned())
    }

    async fn owner_of_share(&self, share_id: Uuid) -> Result<Option<Uuid>, RepositoryError> {
        if self.fail_lookups {
            return Err(lookup_failure());
        }
        Ok(self.shares.get(&share_id).map(|share| share.user_id))
    }

    async fn owner_of_payment_via_share(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<Uuid>, RepositoryError> {
        if self.fail_lookups {
            return Err(lookup_failure());
        }
        Ok(self
            .payments
            .get(&payment_id)
            .and_then(|payment| self.shares.get(&payment.share_id))
            .map(|share| share.user_id))
    }

    async fn get_share(&self, id: Uuid) -> Option<Share> {
        self.shares.get(&id).cloned()
    }

    async fn get_payment(&self, id: Uuid) -> Option<Payment> {
        self.payments.get(&id).cloned()
    }

    async fn list_trailers(&self) -> Vec<Trailer> {
        self.trailers.lock().unwrap().clone()
    }

    async fn create_trailer(&self, req: CreateTrailerRequest) -> Result<Trailer, RepositoryError> {
        let trailer = Trailer {
            id: Uuid::new_v4(),
            code: req.code,
            model: req.model,
            purchase_date: req.purchase_date,
            created_at: Utc::now(),
        };
        self.trailers.lock().unwrap().push(trailer.clone());
        Ok(trailer)
    }

    async fn get_tracking(&self, trailer_code: &str) -> Vec<TrackingPoint> {
        vec![TrackingPoint {
            trailer_code: trailer_code.to_string(),
            latitude: 53.35,
            longitude: -6.26,
            recorded_at: Utc::now(),
        }]
    }

    async fn generate_month(&self, _month: &str) -> Result<i64, RepositoryError> {
        Ok(3)
    }
}

/// Two investors (each owning one share with one payment), a manager and an admin.
pub fn portfolio_repo() -> MockRepository {
    MockRepository::default()
        .with_user(INVESTOR, "investor")
        .with_user(OTHER_INVESTOR, "investor")
        .with_user(MANAGER, "manager")
        .with_user(ADMIN, "admin")
        .with_share(INVESTOR_SHARE, INVESTOR)
        .with_share(OTHER_SHARE, OTHER_INVESTOR)
        .with_payment(INVESTOR_PAYMENT, INVESTOR_SHARE)
        .with_payment(OTHER_PAYMENT, OTHER_SHARE)
}

// --- App Harness ---

pub fn build_state(repo: MockRepository, sink: Arc<MemoryAuditSink>) -> AppState {
    build_state_with_config(repo, sink, AppConfig::default())
}

pub fn build_state_with_config(
    repo: MockRepository,
    sink: Arc<MemoryAuditSink>,
    config: AppConfig,
) -> AppState {
    AppState::new(
        Arc::new(repo) as RepositoryState,
        sink as AuditSinkState,
        PolicyTable::standard().unwrap(),
        config,
    )
}

pub fn build_app(repo: MockRepository, sink: Arc<MemoryAuditSink>) -> Router {
    create_router(build_state(repo, sink))
}

/// Router whose config trusts `x-forwarded-for`, as when deployed behind a proxy.
pub fn build_proxied_app(repo: MockRepository, sink: Arc<MemoryAuditSink>) -> Router {
    let config = AppConfig {
        trust_forwarded_for: true,
        ..AppConfig::default()
    };
    create_router(build_state_with_config(repo, sink, config))
}

/// Builds a request authenticated through the local `x-user-id` bypass.
pub fn request(method: Method, uri: &str, actor: Option<Uuid>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-user-id", actor.to_string());
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends one request and returns the status and the JSON body (`Null` if not JSON).
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
