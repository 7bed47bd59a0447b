use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::AuditError;

/// Action names written by the authorization layer.
pub const ACCESS_DENIED: &str = "access_denied";
pub const UNAUTHORIZED_ACCESS: &str = "unauthorized_access";

/// AuditEntry
///
/// An immutable fact about a security-relevant decision or privileged action. Entries are
/// created once and only ever appended to a sink.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditEntry {
    /// `None` for anonymous callers.
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// Opaque structured payload. Never echoed back to clients.
    pub detail: Value,
    pub source_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor_id: Option<Uuid>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: Option<String>,
        detail: Value,
        source_address: Option<String>,
    ) -> Self {
        Self {
            actor_id,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id,
            detail,
            source_address,
            created_at: Utc::now(),
        }
    }
}

/// AuditSink
///
/// Durable, append-only storage for audit entries. The trait has no read, update or
/// delete operation.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

pub type AuditSinkState = Arc<dyn AuditSink>;

/// PostgresAuditSink
///
/// Inserts into `audit_logs`. Concurrent appends are plain inserts, so none can be lost
/// to a read-modify-write race.
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (actor_id, action, entity_type, entity_id, detail, source_address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.detail)
        .bind(&entry.source_address)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// MemoryAuditSink
///
/// In-process sink for tests and local experiments. `failing()` builds a sink whose
/// appends always error, to exercise the deny path when the store is down.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
    should_fail: bool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            should_fail: true,
        }
    }

    /// Snapshot of everything appended so far, in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn count_action(&self, action: &str) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.action == action)
            .count()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        if self.should_fail {
            return Err(AuditError::Unavailable("memory sink set to fail".to_string()));
        }
        self.entries
            .lock()
            .map_err(|_| AuditError::Unavailable("memory sink poisoned".to_string()))?
            .push(entry.clone());
        Ok(())
    }
}

/// AuditRecorder
///
/// Front door for every audit write. Each entry is emitted as a `target: "audit"` tracing
/// event and then appended to the sink. The append is awaited, so a denial is on record
/// before its response leaves; a sink failure is logged loudly and swallowed so that it
/// never turns a 403 into a 500.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: AuditSinkState,
}

impl AuditRecorder {
    pub fn new(sink: AuditSinkState) -> Self {
        Self { sink }
    }

    pub async fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "audit",
            action = %entry.action,
            actor_id = ?entry.actor_id,
            entity_type = %entry.entity_type,
            entity_id = entry.entity_id.as_deref().unwrap_or(""),
            source = entry.source_address.as_deref().unwrap_or("unknown"),
            "audit entry"
        );

        if let Err(e) = self.sink.append(&entry).await {
            tracing::error!(
                target: "audit",
                error = %e,
                action = %entry.action,
                entry = %serde_json::to_string(&entry).unwrap_or_default(),
                "failed to persist audit entry"
            );
        }
    }
}
