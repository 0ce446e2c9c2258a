//! Storage collaborator traits and the tenant capability object.
//!
//! The delivery core never picks a storage namespace by name at request
//! time. Authentication resolves the tenant once through a
//! [`TenantDirectory`], yielding a [`TenantContext`] whose store handle is
//! already bound to that tenant's namespace; the context is then passed
//! explicitly down the call chain.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use campuslink_core::result::AppResult;
use campuslink_core::types::{GroupId, TenantId, UserId};
use campuslink_entity::message::{NewMessage, StoredMessage};
use campuslink_entity::tenant::Tenant;
use campuslink_entity::user::{PresenceStatus, UserRecord};

pub use memory::{MemoryChatStore, MemoryTenantDirectory};
pub use postgres::{PgChatStore, PgTenantDirectory};

/// Tenant-bound storage operations the delivery core depends on.
///
/// Every implementation is already scoped to a single tenant's namespace;
/// no method takes a tenant parameter.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Look up a user record by id.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserRecord>>;

    /// Persist a message and return the stored form with its assigned id.
    async fn persist_message(&self, message: NewMessage) -> AppResult<StoredMessage>;

    /// Return the member set of a group, or `None` for an unknown group.
    async fn group_members(&self, group_id: GroupId) -> AppResult<Option<Vec<UserId>>>;

    /// Update a user's stored presence flag and last-seen timestamp.
    async fn set_user_presence(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Direct-message history between two users, newest first.
    async fn messages_with_peer(
        &self,
        user_id: UserId,
        peer_id: UserId,
        limit: i64,
    ) -> AppResult<Vec<StoredMessage>>;

    /// Group-message history, newest first.
    async fn group_messages(&self, group_id: GroupId, limit: i64)
        -> AppResult<Vec<StoredMessage>>;
}

/// Resolves a tenant code to its capability context.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Resolve a tenant id to a [`TenantContext`].
    ///
    /// Fails with `NotFound` for unknown tenants and for tenants whose
    /// registration has not been approved.
    async fn resolve(&self, tenant_id: &TenantId) -> AppResult<TenantContext>;
}

/// The capability object carried by every authenticated channel: the tenant
/// record plus a store handle bound to that tenant's namespace.
#[derive(Clone)]
pub struct TenantContext {
    /// The resolved tenant record.
    pub tenant: Tenant,
    /// Store handle scoped to the tenant's namespace.
    pub store: Arc<dyn ChatStore>,
}

impl std::fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantContext")
            .field("tenant", &self.tenant.id)
            .finish()
    }
}

impl TenantContext {
    /// Build a context from a tenant record and a bound store.
    pub fn new(tenant: Tenant, store: Arc<dyn ChatStore>) -> Self {
        Self { tenant, store }
    }

    /// The tenant's identifier.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant.id
    }
}
