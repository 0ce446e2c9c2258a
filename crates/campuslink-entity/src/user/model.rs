//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use campuslink_core::types::UserId;

use super::role::UserRole;
use super::status::PresenceStatus;

/// A user record inside a tenant's namespace.
///
/// The delivery core reads these to resolve identities and writes only the
/// `status`/`last_seen` pair; everything else belongs to the CRUD platform.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    /// Unique user identifier within the tenant.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address (login identity).
    pub email: String,
    /// Role within the tenant.
    pub role: UserRole,
    /// Stored presence flag.
    pub status: PresenceStatus,
    /// When the user was last seen online.
    pub last_seen: Option<DateTime<Utc>>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}
