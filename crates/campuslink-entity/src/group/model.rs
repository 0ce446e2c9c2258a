//! Group entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use campuslink_core::types::{GroupId, UserId};

/// The fixed set of group categories a tenant can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "group_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// A class cohort.
    Class,
    /// An academic department.
    Department,
    /// An organizing committee.
    Committee,
    /// An open-interest community.
    Community,
}

/// A chat group within a tenant.
///
/// Group lifecycle (creation, membership changes) belongs to the CRUD
/// platform; the delivery core reads the member set for fan-out only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    /// Unique group identifier within the tenant.
    pub id: GroupId,
    /// Group name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Category of the group.
    pub kind: GroupKind,
    /// Who created the group.
    pub created_by: UserId,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
}
