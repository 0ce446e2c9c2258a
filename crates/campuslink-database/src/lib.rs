//! # campuslink-database
//!
//! Storage layer for CampusLink. Defines the tenant-bound [`store::ChatStore`]
//! trait and the [`store::TenantDirectory`] that resolves a tenant code to a
//! [`store::TenantContext`] capability, plus two implementations: Postgres
//! (schema-per-tenant) and in-memory (tests and single-node development).

pub mod connection;
pub mod store;

pub use connection::DatabasePool;
pub use store::{ChatStore, TenantContext, TenantDirectory};
