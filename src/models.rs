use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The caller's authorization level. Only `investor`, `manager` and `admin` are ever
/// stored on a profile; `anonymous` names the absence of a verified identity.
///
/// The policy table never assumes an ordering between roles. The only place a hierarchy
/// is honoured is [`Role::bypasses_ownership`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    Investor,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Investor => "investor",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Managers and admins may read any share or payment regardless of who owns it.
    pub fn bypasses_ownership(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anonymous" => Ok(Role::Anonymous),
            "investor" => Ok(Role::Investor),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A row of the `users` table. `role` is kept as text to mirror the column; it is parsed
/// into a [`Role`] during credential verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

/// Share
///
/// An investor's stake in a leased trailer. `user_id` is the owning investor and the
/// subject of every ownership check on `/api/shares/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Share {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trailer_id: Uuid,
    pub percentage: f64,
    pub created_at: DateTime<Utc>,
}

/// Payment
///
/// A monthly payout belonging to a share. A payment has no owner column of its own;
/// ownership always resolves through `share_id`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Payment {
    pub id: Uuid,
    pub share_id: Uuid,
    /// Year-month the payout covers, e.g. "2025-10".
    pub month: String,
    pub amount_cents: i64,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Trailer {
    pub id: Uuid,
    /// Fleet code painted on the trailer, e.g. "TRL-0042".
    pub code: String,
    pub model: String,
    pub purchase_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// TrackingPoint
///
/// One GPS fix reported for a trailer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct TrackingPoint {
    pub trailer_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

// --- Request Payloads ---

/// CreateTrailerRequest
///
/// Input payload for registering a trailer in the fleet (POST /api/trailers).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateTrailerRequest {
    #[schema(example = "TRL-0042")]
    pub code: String,
    pub model: String,
    pub purchase_date: Option<NaiveDate>,
}

// --- Response Payloads ---

/// UserProfile
///
/// Output schema for the authenticated caller (GET /api/auth/me).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub role: Role,
}

/// GenerateMonthResponse
///
/// Acknowledges a payout generation run (POST /api/financial/generate/{month}).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct GenerateMonthResponse {
    pub month: String,
    /// Number of payment rows created by the run.
    pub generated: i64,
}
