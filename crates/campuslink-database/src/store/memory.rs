//! In-memory store implementations.
//!
//! Used by the test suites and for single-node development without a
//! Postgres instance. Mirrors the Postgres implementations' observable
//! behavior, including `None` for unknown groups and id assignment on
//! persist.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use campuslink_core::error::AppError;
use campuslink_core::result::AppResult;
use campuslink_core::types::{GroupId, MessageId, TenantId, UserId};
use campuslink_entity::message::{MessageTarget, NewMessage, StoredMessage};
use campuslink_entity::tenant::Tenant;
use campuslink_entity::user::{PresenceStatus, UserRecord};

use super::{ChatStore, TenantContext, TenantDirectory};

/// In-memory chat store for one tenant namespace.
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    users: DashMap<UserId, UserRecord>,
    groups: DashMap<GroupId, Vec<UserId>>,
    messages: Mutex<Vec<StoredMessage>>,
    fail_persist: AtomicBool,
}

impl MemoryChatStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user record.
    pub fn insert_user(&self, user: UserRecord) {
        self.users.insert(user.id, user);
    }

    /// Seed a group with its member set.
    pub fn insert_group(&self, group_id: GroupId, members: Vec<UserId>) {
        self.groups.insert(group_id, members);
    }

    /// Make every subsequent `persist_message` fail, for error-path tests.
    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    /// Number of persisted messages.
    pub fn message_count(&self) -> usize {
        self.messages.lock().expect("store lock poisoned").len()
    }

    /// Snapshot of all persisted messages in insertion order.
    pub fn messages_snapshot(&self) -> Vec<StoredMessage> {
        self.messages.lock().expect("store lock poisoned").clone()
    }

    /// Read back a user's stored presence, if the user exists.
    pub fn presence_of(&self, user_id: UserId) -> Option<(PresenceStatus, Option<DateTime<Utc>>)> {
        self.users
            .get(&user_id)
            .map(|u| (u.status, u.last_seen))
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn persist_message(&self, message: NewMessage) -> AppResult<StoredMessage> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(AppError::database("Simulated persistence failure"));
        }

        let (receiver_id, group_id) = match message.target {
            MessageTarget::Direct(user) => (Some(user), None),
            MessageTarget::Group(group) => (None, Some(group)),
        };

        let stored = StoredMessage {
            id: MessageId::new(),
            content: message.content,
            attachments: serde_json::Value::Array(message.attachments),
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            receiver_id,
            group_id,
            timestamp: message.timestamp,
            is_read: false,
        };

        self.messages
            .lock()
            .expect("store lock poisoned")
            .push(stored.clone());
        Ok(stored)
    }

    async fn group_members(&self, group_id: GroupId) -> AppResult<Option<Vec<UserId>>> {
        Ok(self.groups.get(&group_id).map(|m| m.clone()))
    }

    async fn set_user_presence(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.status = status;
            user.last_seen = Some(last_seen);
        }
        Ok(())
    }

    async fn messages_with_peer(
        &self,
        user_id: UserId,
        peer_id: UserId,
        limit: i64,
    ) -> AppResult<Vec<StoredMessage>> {
        let mut out: Vec<StoredMessage> = self
            .messages
            .lock()
            .expect("store lock poisoned")
            .iter()
            .filter(|m| {
                (m.sender_id == user_id && m.receiver_id == Some(peer_id))
                    || (m.sender_id == peer_id && m.receiver_id == Some(user_id))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }

    async fn group_messages(
        &self,
        group_id: GroupId,
        limit: i64,
    ) -> AppResult<Vec<StoredMessage>> {
        let mut out: Vec<StoredMessage> = self
            .messages
            .lock()
            .expect("store lock poisoned")
            .iter()
            .filter(|m| m.group_id == Some(group_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }
}

/// In-memory tenant directory.
#[derive(Default)]
pub struct MemoryTenantDirectory {
    tenants: DashMap<TenantId, TenantContext>,
}

impl MemoryTenantDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tenant with its bound store.
    pub fn register(&self, tenant: Tenant, store: Arc<dyn ChatStore>) {
        self.tenants
            .insert(tenant.id.clone(), TenantContext::new(tenant, store));
    }
}

#[async_trait]
impl TenantDirectory for MemoryTenantDirectory {
    async fn resolve(&self, tenant_id: &TenantId) -> AppResult<TenantContext> {
        let ctx = self
            .tenants
            .get(tenant_id)
            .map(|t| t.clone())
            .ok_or_else(|| {
                AppError::not_found(format!("Tenant '{tenant_id}' is not registered"))
            })?;

        if !ctx.tenant.status.is_active() {
            return Err(AppError::not_found(format!(
                "Tenant '{tenant_id}' is not approved"
            )));
        }

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campuslink_entity::tenant::TenantStatus;
    use campuslink_entity::user::UserRole;

    fn user(name: &str) -> UserRecord {
        UserRecord {
            id: UserId::new(),
            name: name.to_string(),
            email: format!("{name}@example.edu"),
            role: UserRole::Student,
            status: PresenceStatus::Online,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    fn tenant(code: &str, status: TenantStatus) -> Tenant {
        Tenant {
            id: TenantId::new(code),
            name: code.to_string(),
            schema_name: format!("tenant_{}", code.to_lowercase()),
            status,
            utc_offset_minutes: 330,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_persist_assigns_id_and_defaults_unread() {
        let store = MemoryChatStore::new();
        let sender = user("asha");
        let receiver = user("bala");
        store.insert_user(sender.clone());
        store.insert_user(receiver.clone());

        let stored = store
            .persist_message(NewMessage {
                content: "hi".to_string(),
                attachments: vec![],
                sender_id: sender.id,
                sender_name: None,
                target: MessageTarget::Direct(receiver.id),
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        assert!(!stored.is_read);
        assert_eq!(stored.receiver_id, Some(receiver.id));
        assert_eq!(store.message_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_group_is_none() {
        let store = MemoryChatStore::new();
        assert!(store.group_members(GroupId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_directory_rejects_unapproved_tenant() {
        let dir = MemoryTenantDirectory::new();
        dir.register(
            tenant("PEND", TenantStatus::Pending),
            Arc::new(MemoryChatStore::new()),
        );

        let err = dir.resolve(&TenantId::new("PEND")).await.unwrap_err();
        assert_eq!(err.kind, campuslink_core::error::ErrorKind::NotFound);

        let err = dir.resolve(&TenantId::new("NOPE")).await.unwrap_err();
        assert_eq!(err.kind, campuslink_core::error::ErrorKind::NotFound);
    }
}
