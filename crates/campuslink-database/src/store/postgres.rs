//! Postgres-backed store implementations (schema-per-tenant).
//!
//! Shared records (the tenant register) live in the `saas` schema; each
//! approved tenant owns a dedicated schema holding its `users`, `groups`,
//! `group_members`, and `messages` tables. Schema names are read from the
//! trusted tenant register, never from request input, and are validated as
//! plain identifiers before being spliced into queries.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use campuslink_core::error::{AppError, ErrorKind};
use campuslink_core::result::AppResult;
use campuslink_core::types::{GroupId, MessageId, TenantId, UserId};
use campuslink_entity::group::Group;
use campuslink_entity::message::{MessageTarget, NewMessage, StoredMessage};
use campuslink_entity::tenant::Tenant;
use campuslink_entity::user::{PresenceStatus, UserRecord};

use super::{ChatStore, TenantContext, TenantDirectory};

/// Resolves tenant codes against the `saas.tenants` register.
#[derive(Debug, Clone)]
pub struct PgTenantDirectory {
    pool: PgPool,
}

impl PgTenantDirectory {
    /// Create a directory over the shared connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantDirectory for PgTenantDirectory {
    async fn resolve(&self, tenant_id: &TenantId) -> AppResult<TenantContext> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, schema_name, status, utc_offset_minutes, created_at \
             FROM saas.tenants WHERE id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to resolve tenant", e))?
        .ok_or_else(|| AppError::not_found(format!("Tenant '{tenant_id}' is not registered")))?;

        if !tenant.status.is_active() {
            return Err(AppError::not_found(format!(
                "Tenant '{tenant_id}' is not approved"
            )));
        }

        let store = PgChatStore::new(self.pool.clone(), &tenant.schema_name)?;
        Ok(TenantContext::new(tenant, Arc::new(store)))
    }
}

/// Chat store bound to one tenant's Postgres schema.
#[derive(Debug, Clone)]
pub struct PgChatStore {
    pool: PgPool,
    schema: String,
}

impl PgChatStore {
    /// Bind a store to a tenant schema.
    ///
    /// The schema name must be a plain identifier; anything else is
    /// rejected so it can never alter query structure.
    pub fn new(pool: PgPool, schema: &str) -> AppResult<Self> {
        if !is_plain_identifier(schema) {
            return Err(AppError::configuration(format!(
                "Invalid tenant schema name: '{schema}'"
            )));
        }
        Ok(Self {
            pool,
            schema: schema.to_string(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("\"{}\".{}", self.schema, name)
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        let sql = format!(
            "SELECT id, name, email, role, status, last_seen, created_at FROM {} WHERE id = $1",
            self.table("users")
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user", e))
    }

    async fn persist_message(&self, message: NewMessage) -> AppResult<StoredMessage> {
        let (receiver_id, group_id) = match message.target {
            MessageTarget::Direct(user) => (Some(user), None),
            MessageTarget::Group(group) => (None, Some(group)),
        };

        let sql = format!(
            "INSERT INTO {} \
             (id, content, attachments, sender_id, sender_name, receiver_id, group_id, sent_at, is_read) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE) \
             RETURNING id, content, attachments, sender_id, sender_name, receiver_id, group_id, \
                       sent_at AS timestamp, is_read",
            self.table("messages")
        );

        let stored = sqlx::query_as::<_, StoredMessage>(&sql)
            .bind(MessageId::new())
            .bind(&message.content)
            .bind(serde_json::Value::Array(message.attachments.clone()))
            .bind(message.sender_id)
            .bind(&message.sender_name)
            .bind(receiver_id)
            .bind(group_id)
            .bind(message.timestamp)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to persist message", e)
            })?;

        debug!(message_id = %stored.id, sender = %stored.sender_id, "Message persisted");
        Ok(stored)
    }

    async fn group_members(&self, group_id: GroupId) -> AppResult<Option<Vec<UserId>>> {
        let group_sql = format!(
            "SELECT id, name, description, kind, created_by, created_at FROM {} WHERE id = $1",
            self.table("groups")
        );
        let group = sqlx::query_as::<_, Group>(&group_sql)
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find group", e))?;

        let Some(group) = group else {
            return Ok(None);
        };
        debug!(group_id = %group.id, kind = ?group.kind, "resolving group member set");

        let members_sql = format!(
            "SELECT user_id FROM {} WHERE group_id = $1",
            self.table("group_members")
        );
        let members: Vec<UserId> = sqlx::query_scalar(&members_sql)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list group members", e)
            })?;

        Ok(Some(members))
    }

    async fn set_user_presence(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        let sql = format!(
            "UPDATE {} SET status = $2, last_seen = $3 WHERE id = $1",
            self.table("users")
        );
        sqlx::query(&sql)
            .bind(user_id)
            .bind(status)
            .bind(last_seen)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update presence", e)
            })?;
        Ok(())
    }

    async fn messages_with_peer(
        &self,
        user_id: UserId,
        peer_id: UserId,
        limit: i64,
    ) -> AppResult<Vec<StoredMessage>> {
        let sql = format!(
            "SELECT id, content, attachments, sender_id, sender_name, receiver_id, group_id, \
                    sent_at AS timestamp, is_read \
             FROM {} \
             WHERE (sender_id = $1 AND receiver_id = $2) \
                OR (sender_id = $2 AND receiver_id = $1) \
             ORDER BY sent_at DESC LIMIT $3",
            self.table("messages")
        );
        sqlx::query_as::<_, StoredMessage>(&sql)
            .bind(user_id)
            .bind(peer_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load message history", e)
            })
    }

    async fn group_messages(
        &self,
        group_id: GroupId,
        limit: i64,
    ) -> AppResult<Vec<StoredMessage>> {
        let sql = format!(
            "SELECT id, content, attachments, sender_id, sender_name, receiver_id, group_id, \
                    sent_at AS timestamp, is_read \
             FROM {} WHERE group_id = $1 ORDER BY sent_at DESC LIMIT $2",
            self.table("messages")
        );
        sqlx::query_as::<_, StoredMessage>(&sql)
            .bind(group_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load group history", e)
            })
    }
}

/// ASCII identifier check for schema names from the tenant register.
fn is_plain_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 63
        && s.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifier() {
        assert!(is_plain_identifier("tenant_coep"));
        assert!(is_plain_identifier("_t1"));
        assert!(!is_plain_identifier("Tenant"));
        assert!(!is_plain_identifier("t;drop table users"));
        assert!(!is_plain_identifier(""));
    }
}
