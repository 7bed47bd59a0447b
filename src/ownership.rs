use axum::http::Method;
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, AuditRecorder, UNAUTHORIZED_ACCESS},
    auth::AuthContext,
    error::AccessError,
    policy::ResourceKind,
    repository::RepositoryState,
};

/// OwnershipTarget
///
/// The resource an ownership route addresses, as seen by the interceptor.
#[derive(Debug, Clone, Copy)]
pub struct OwnershipTarget<'a> {
    pub kind: ResourceKind,
    /// Concrete final path segment; `None` when the request carried no identifier.
    pub resource_id: Option<&'a str>,
    pub method: &'a Method,
    pub path: &'a str,
    pub source_address: Option<&'a str>,
}

/// OwnershipChecker
///
/// Second gate for ownership routes, run only after the authorizer has allowed the role.
/// Managers and admins pass unconditionally; everyone else must own the resource.
#[derive(Clone)]
pub struct OwnershipChecker {
    repo: RepositoryState,
    audit: AuditRecorder,
}

impl OwnershipChecker {
    pub fn new(repo: RepositoryState, audit: AuditRecorder) -> Self {
        Self { repo, audit }
    }

    /// check
    ///
    /// - privileged role: `Ok(())` without touching the repository
    /// - missing or unparseable identifier: `MalformedRequest`, not audited
    /// - resource missing or owned by someone else: `OwnershipDenied`, one
    ///   `unauthorized_access` audit entry
    /// - repository failure: `Lookup`, surfaced as a 500
    pub async fn check(
        &self,
        target: OwnershipTarget<'_>,
        ctx: &AuthContext,
    ) -> Result<(), AccessError> {
        if ctx.role.bypasses_ownership() {
            return Ok(());
        }

        let raw_id = target
            .resource_id
            .ok_or(AccessError::MalformedRequest("missing resource identifier"))?;
        let resource_id = Uuid::parse_str(raw_id)
            .map_err(|_| AccessError::MalformedRequest("resource identifier is not a uuid"))?;

        let owner = match target.kind {
            ResourceKind::Share => self.repo.owner_of_share(resource_id).await?,
            ResourceKind::Payment => self.repo.owner_of_payment_via_share(resource_id).await?,
        };

        if owner == Some(ctx.actor_id) {
            return Ok(());
        }

        tracing::warn!(
            actor_id = %ctx.actor_id,
            entity_type = target.kind.entity_type(),
            entity_id = raw_id,
            resource_found = owner.is_some(),
            "ownership check failed"
        );

        self.audit
            .record(AuditEntry::new(
                Some(ctx.actor_id),
                UNAUTHORIZED_ACCESS,
                target.kind.entity_type(),
                Some(raw_id.to_string()),
                json!({
                    "path": target.path,
                    "method": target.method.as_str(),
                    "role": ctx.role,
                    "resource_found": owner.is_some(),
                }),
                target.source_address.map(str::to_string),
            ))
            .await;

        Err(AccessError::OwnershipDenied)
    }
}
