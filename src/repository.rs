use crate::{
    error::RepositoryError,
    models::{CreateTrailerRequest, Payment, Share, TrackingPoint, Trailer, User},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The persistence contract consumed by the authorization layer and the thin handlers.
///
/// The user and owner lookups return `Result<Option<_>>` so the interceptor can tell a
/// missing row (anonymous caller, ownership denial) from a broken connection (a 500). The
/// handler reads follow the log-and-default style and return `Option`/`Vec`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential support ---
    /// `Ok(None)` for an unknown id; `Err` only for transport or query failures.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    // --- Owner lookups ---
    /// `user_id` of the share itself.
    async fn owner_of_share(&self, share_id: Uuid) -> Result<Option<Uuid>, RepositoryError>;
    /// `user_id` of the share the payment belongs to.
    async fn owner_of_payment_via_share(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<Uuid>, RepositoryError>;

    // --- Handler reads and writes ---
    async fn get_share(&self, id: Uuid) -> Option<Share>;
    async fn get_payment(&self, id: Uuid) -> Option<Payment>;
    async fn list_trailers(&self) -> Vec<Trailer>;
    async fn create_trailer(&self, req: CreateTrailerRequest) -> Result<Trailer, RepositoryError>;
    async fn get_tracking(&self, trailer_code: &str) -> Vec<TrackingPoint>;
    /// Runs the payout generation for `month` ("YYYY-MM") and returns the rows created.
    async fn generate_month(&self, month: &str) -> Result<i64, RepositoryError>;
}

pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the portal's Postgres schema.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn owner_of_share(&self, share_id: Uuid) -> Result<Option<Uuid>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM shares WHERE id = $1")
            .bind(share_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    /// owner_of_payment_via_share
    ///
    /// Payments carry no owner column, so the owner is always read off the parent share.
    /// An orphaned payment (share deleted) yields `None`.
    async fn owner_of_payment_via_share(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<Uuid>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT s.user_id
            FROM payments p
            JOIN shares s ON s.id = p.share_id
            WHERE p.id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(owner)
    }

    async fn get_share(&self, id: Uuid) -> Option<Share> {
        sqlx::query_as::<_, Share>(
            "SELECT id, user_id, trailer_id, percentage, created_at FROM shares WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_share error: {:?}", e);
            None
        })
    }

    async fn get_payment(&self, id: Uuid) -> Option<Payment> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, share_id, month, amount_cents, paid, created_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_payment error: {:?}", e);
            None
        })
    }

    async fn list_trailers(&self) -> Vec<Trailer> {
        sqlx::query_as::<_, Trailer>(
            "SELECT id, code, model, purchase_date, created_at FROM trailers ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_trailers error: {:?}", e);
            vec![]
        })
    }

    async fn create_trailer(&self, req: CreateTrailerRequest) -> Result<Trailer, RepositoryError> {
        let trailer = sqlx::query_as::<_, Trailer>(
            r#"
            INSERT INTO trailers (id, code, model, purchase_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, code, model, purchase_date, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.code)
        .bind(req.model)
        .bind(req.purchase_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(trailer)
    }

    async fn get_tracking(&self, trailer_code: &str) -> Vec<TrackingPoint> {
        sqlx::query_as::<_, TrackingPoint>(
            r#"
            SELECT trailer_code, latitude, longitude, recorded_at
            FROM tracking_points
            WHERE trailer_code = $1
            ORDER BY recorded_at DESC
            LIMIT 100
            "#,
        )
        .bind(trailer_code)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_tracking error: {:?}", e);
            vec![]
        })
    }

    /// generate_month
    ///
    /// The payout computation lives in the database (`generate_month_payments`); this
    /// only invokes it.
    async fn generate_month(&self, month: &str) -> Result<i64, RepositoryError> {
        let generated = sqlx::query_scalar::<_, i64>("SELECT generate_month_payments($1)")
            .bind(month)
            .fetch_one(&self.pool)
            .await?;
        Ok(generated)
    }
}
