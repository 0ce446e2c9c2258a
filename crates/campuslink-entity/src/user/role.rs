//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a tenant's users can hold.
///
/// The role determines which collection of the tenant namespace a user
/// record lives in and what the surrounding CRUD platform lets them do;
/// the delivery core only carries it through the authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Currently enrolled student.
    Student,
    /// Graduated alumnus.
    Alumni,
    /// Tenant administrator.
    Admin,
}

impl UserRole {
    /// Check if this role is an admin.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Alumni => "alumni",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = campuslink_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "alumni" => Ok(Self::Alumni),
            "admin" => Ok(Self::Admin),
            _ => Err(campuslink_core::AppError::validation(format!(
                "Invalid user role: '{s}'. Expected one of: student, alumni, admin"
            ))),
        }
    }
}
