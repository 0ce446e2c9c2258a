//! Tenant (college) entity.

pub mod model;

pub use model::{Tenant, TenantStatus};
