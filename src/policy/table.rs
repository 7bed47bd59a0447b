use axum::http::Method;
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    str::FromStr,
};

use crate::{error::PolicyError, models::Role};

/// PolicyKey
///
/// `"<METHOD> <canonical-path>"`, the lookup key of the policy table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyKey {
    pub method: Method,
    pub path: String,
}

impl PolicyKey {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl FromStr for PolicyKey {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PolicyError::MalformedKey(s.to_string());
        let (method, path) = s.split_once(' ').ok_or_else(malformed)?;
        if !path.starts_with('/') || path.contains(' ') {
            return Err(malformed());
        }
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| malformed())?;
        Ok(PolicyKey::new(method, path))
    }
}

/// PolicyEntry
///
/// What a governed route permits. `Roles` is never empty; an explicitly public route uses
/// `Public` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyEntry {
    Public,
    Roles(BTreeSet<Role>),
}

impl PolicyEntry {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            PolicyEntry::Public => true,
            PolicyEntry::Roles(roles) => roles.contains(&role),
        }
    }

    /// Permitted roles in a stable order, for audit detail.
    pub fn permitted_roles(&self) -> Vec<Role> {
        match self {
            PolicyEntry::Public => Vec::new(),
            PolicyEntry::Roles(roles) => roles.iter().copied().collect(),
        }
    }
}

/// ResourceKind
///
/// Which owner lookup an ownership route needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// The share's own `user_id`.
    Share,
    /// The `user_id` of the share the payment belongs to.
    Payment,
}

impl ResourceKind {
    pub fn entity_type(&self) -> &'static str {
        match self {
            ResourceKind::Share => "share",
            ResourceKind::Payment => "payment",
        }
    }
}

/// PolicyTable
///
/// Immutable mapping from [`PolicyKey`] to [`PolicyEntry`], plus the subset of keys that
/// also require an ownership check. Built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    entries: HashMap<PolicyKey, PolicyEntry>,
    ownership: HashMap<PolicyKey, ResourceKind>,
}

impl PolicyTable {
    pub fn builder() -> PolicyTableBuilder {
        PolicyTableBuilder::default()
    }

    /// `None` means the route is not governed at all, which callers must treat as a denial.
    pub fn lookup(&self, key: &PolicyKey) -> Option<&PolicyEntry> {
        self.entries.get(key)
    }

    pub fn ownership(&self, key: &PolicyKey) -> Option<ResourceKind> {
        self.ownership.get(key).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&PolicyKey, &PolicyEntry)> {
        self.entries.iter()
    }

    pub fn ownership_routes(&self) -> impl Iterator<Item = (&PolicyKey, ResourceKind)> {
        self.ownership.iter().map(|(key, kind)| (key, *kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// standard
    ///
    /// The route table of the investor portal API. Every permitted role is listed per
    /// route; there is no inheritance between roles here.
    pub fn standard() -> Result<Self, PolicyError> {
        use Role::{Admin, Investor, Manager};

        const EVERYONE: &[Role] = &[Investor, Manager, Admin];
        const STAFF: &[Role] = &[Manager, Admin];
        const ADMIN: &[Role] = &[Admin];

        Self::builder()
            // Gateway
            .public("GET /api/health")
            .public("POST /api/auth/login")
            .public("POST /api/auth/register")
            .allow("GET /api/auth/me", EVERYONE)
            // Shares
            .allow("GET /api/shares", EVERYONE)
            .allow("POST /api/shares", STAFF)
            .allow("GET /api/shares/:id", EVERYONE)
            .allow("PUT /api/shares/:id", STAFF)
            .allow("DELETE /api/shares/:id", ADMIN)
            // Payments
            .allow("GET /api/payments", EVERYONE)
            .allow("GET /api/payments/:shareId", EVERYONE)
            .allow("PUT /api/payments/:shareId", STAFF)
            // Fleet
            .allow("GET /api/trailers", EVERYONE)
            .allow("POST /api/trailers", STAFF)
            .allow("GET /api/trailers/:id", EVERYONE)
            .allow("PUT /api/trailers/:id", STAFF)
            .allow("DELETE /api/trailers/:id", ADMIN)
            .allow("GET /api/trailers/:trailerId", EVERYONE)
            .allow("GET /api/tracking/:trailerId", EVERYONE)
            .allow("POST /api/tracking/:trailerId", STAFF)
            // Finance and administration
            .allow("GET /api/financial/summary", STAFF)
            .allow("POST /api/financial/generate/:month", ADMIN)
            .allow("GET /api/admin/users", ADMIN)
            .allow("GET /api/admin/audit", ADMIN)
            // Ownership-sensitive reads
            .owned("GET /api/shares/:id", ResourceKind::Share)
            .owned("GET /api/payments/:shareId", ResourceKind::Payment)
            .build()
    }
}

enum Rule {
    Public(&'static str),
    Roles(&'static str, &'static [Role]),
}

/// PolicyTableBuilder
///
/// Collects route definitions and validates them all in [`PolicyTableBuilder::build`].
#[derive(Default)]
pub struct PolicyTableBuilder {
    rules: Vec<Rule>,
    owned: Vec<(&'static str, ResourceKind)>,
}

impl PolicyTableBuilder {
    pub fn public(mut self, key: &'static str) -> Self {
        self.rules.push(Rule::Public(key));
        self
    }

    pub fn allow(mut self, key: &'static str, roles: &'static [Role]) -> Self {
        self.rules.push(Rule::Roles(key, roles));
        self
    }

    pub fn owned(mut self, key: &'static str, kind: ResourceKind) -> Self {
        self.owned.push((key, kind));
        self
    }

    pub fn build(self) -> Result<PolicyTable, PolicyError> {
        let mut entries = HashMap::with_capacity(self.rules.len());

        for rule in self.rules {
            let (raw, entry) = match rule {
                Rule::Public(raw) => (raw, PolicyEntry::Public),
                Rule::Roles(raw, roles) => {
                    if roles.is_empty() {
                        return Err(PolicyError::EmptyRoleSet(raw.to_string()));
                    }
                    (raw, PolicyEntry::Roles(roles.iter().copied().collect()))
                }
            };
            let key: PolicyKey = raw.parse()?;
            if entries.insert(key, entry).is_some() {
                return Err(PolicyError::DuplicateKey(raw.to_string()));
            }
        }

        let mut ownership = HashMap::with_capacity(self.owned.len());
        for (raw, kind) in self.owned {
            let key: PolicyKey = raw.parse()?;
            if !entries.contains_key(&key) {
                return Err(PolicyError::OrphanOwnershipRoute(raw.to_string()));
            }
            if ownership.insert(key, kind).is_some() {
                return Err(PolicyError::DuplicateKey(raw.to_string()));
            }
        }

        Ok(PolicyTable { entries, ownership })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::normalize_path;

    fn key(raw: &str) -> PolicyKey {
        raw.parse().unwrap()
    }

    #[test]
    fn policy_key_round_trips_through_display() {
        let parsed = key("POST /api/financial/generate/:month");
        assert_eq!(parsed.method, Method::POST);
        assert_eq!(parsed.to_string(), "POST /api/financial/generate/:month");
    }

    #[test]
    fn malformed_keys_are_rejected() {
        for raw in ["GET", "GET api/shares", "/api/shares", "GET /api/a b"] {
            assert_eq!(
                raw.parse::<PolicyKey>(),
                Err(PolicyError::MalformedKey(raw.to_string()))
            );
        }
    }

    #[test]
    fn standard_table_builds() {
        let table = PolicyTable::standard().unwrap();
        assert!(!table.is_empty());
        assert_eq!(
            table.lookup(&key("GET /api/health")),
            Some(&PolicyEntry::Public)
        );
    }

    #[test]
    fn absence_is_distinct_from_public() {
        let table = PolicyTable::standard().unwrap();
        assert!(table.lookup(&key("PATCH /api/trailers/:id")).is_none());
    }

    #[test]
    fn role_sets_are_never_empty() {
        let table = PolicyTable::standard().unwrap();
        for (key, entry) in table.entries() {
            if let PolicyEntry::Roles(roles) = entry {
                assert!(!roles.is_empty(), "{key} has no roles");
                assert!(!roles.contains(&Role::Anonymous), "{key} lists anonymous");
            }
        }
    }

    #[test]
    fn every_ownership_route_is_governed_and_restricted() {
        let table = PolicyTable::standard().unwrap();
        assert_eq!(table.ownership_routes().count(), 2);
        for (key, _) in table.ownership_routes() {
            match table.lookup(key) {
                Some(PolicyEntry::Roles(_)) => {}
                other => panic!("{key} should be role-governed, got {other:?}"),
            }
        }
    }

    #[test]
    fn table_keys_are_already_canonical() {
        let table = PolicyTable::standard().unwrap();
        for (key, _) in table.entries() {
            assert_eq!(normalize_path(&key.path).canonical, key.path);
        }
    }

    #[test]
    fn trailer_creation_is_staff_only() {
        let table = PolicyTable::standard().unwrap();
        let entry = table.lookup(&key("POST /api/trailers")).unwrap();
        assert_eq!(entry.permitted_roles(), vec![Role::Manager, Role::Admin]);
        assert!(!entry.permits(Role::Investor));
    }

    #[test]
    fn builder_rejects_orphan_ownership_route() {
        let err = PolicyTable::builder()
            .allow("GET /api/shares", &[Role::Investor])
            .owned("GET /api/shares/:id", ResourceKind::Share)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            PolicyError::OrphanOwnershipRoute("GET /api/shares/:id".to_string())
        );
    }

    #[test]
    fn builder_rejects_empty_role_set_and_duplicates() {
        let empty = PolicyTable::builder().allow("GET /api/x", &[]).build();
        assert!(matches!(empty, Err(PolicyError::EmptyRoleSet(_))));

        let duplicate = PolicyTable::builder()
            .public("GET /api/x")
            .allow("GET /api/x", &[Role::Admin])
            .build();
        assert!(matches!(duplicate, Err(PolicyError::DuplicateKey(_))));
    }
}
