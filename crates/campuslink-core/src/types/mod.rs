//! Shared type definitions.

pub mod id;

pub use id::{GroupId, MessageId, TenantId, UserId};
