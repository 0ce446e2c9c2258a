//! Tenant entity model.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use campuslink_core::types::TenantId;

/// Lifecycle state of a tenant registration.
///
/// Tenants are created by the registration workflow in `pending` state and
/// only become usable once the approval workflow moves them to `approved`.
/// The delivery core never mutates this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tenant_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    /// Registered, awaiting approval.
    Pending,
    /// Approved and active.
    Approved,
    /// Rejected by the approval workflow.
    Rejected,
}

impl TenantStatus {
    /// Whether users of this tenant may open connections.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// A registered college with its own isolated data namespace.
///
/// Each approved tenant owns a dedicated Postgres schema named by
/// `schema_name`; all of its users, groups, and messages live there.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    /// Registered tenant code (e.g. `"COEP"`).
    pub id: TenantId,
    /// Official name of the college.
    pub name: String,
    /// Name of the Postgres schema holding this tenant's data.
    pub schema_name: String,
    /// Approval lifecycle state.
    pub status: TenantStatus,
    /// Local time basis for message timestamps, as minutes east of UTC.
    /// Defaults to +330 (IST).
    pub utc_offset_minutes: i32,
    /// When the tenant registered.
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// The tenant's local time offset for rendering timestamps.
    ///
    /// Falls back to UTC if the stored offset is out of range.
    pub fn time_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}
