//! # campuslink-entity
//!
//! Domain entity models for CampusLink. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod group;
pub mod message;
pub mod tenant;
pub mod user;

pub use group::{Group, GroupKind};
pub use message::{MessageTarget, NewMessage, StoredMessage};
pub use tenant::{Tenant, TenantStatus};
pub use user::{PresenceStatus, UserRecord, UserRole};
