//! Tenant-scoped connection registry.
//!
//! At most one live connection per `(tenant, user)` identity. A reconnect
//! replaces the previous entry (last writer wins) and force-closes the
//! superseded handle. All lookups are keyed by the composite identity, so
//! a user id reused across tenants never crosses the boundary.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use campuslink_core::types::{TenantId, UserId};

use super::handle::{ConnectionHandle, ConnectionId, SendOutcome};

/// Outcome of a single targeted delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    Delivered,
    /// No registered connection for the recipient; not an error.
    RecipientOffline,
    /// A connection existed but the frame could not be handed to it.
    SendFailed,
}

/// Aggregate result of a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub offline: usize,
    pub failed: usize,
}

/// Outcome of removing a connection from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deregistration {
    /// The entry matched this connection id and was removed.
    Removed,
    /// The identity is now held by a newer connection; nothing removed.
    Superseded,
    /// No entry for the identity existed.
    AlreadyGone,
}

type IdentityKey = (TenantId, UserId);

#[derive(Default)]
pub struct ConnectionRegistry {
    entries: DashMap<IdentityKey, Arc<ConnectionHandle>>,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.entries.len())
            .finish()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection under its identity. If an older connection
    /// held the slot it is force-closed and returned.
    pub fn register(&self, handle: Arc<ConnectionHandle>) -> Option<Arc<ConnectionHandle>> {
        let key = (handle.tenant_id.clone(), handle.user_id);
        let superseded = self.entries.insert(key, handle.clone());
        if let Some(ref old) = superseded {
            warn!(
                tenant_id = %handle.tenant_id,
                user_id = %handle.user_id,
                old_connection = %old.id,
                new_connection = %handle.id,
                "superseding existing connection for identity"
            );
            old.force_close();
        } else {
            debug!(
                tenant_id = %handle.tenant_id,
                user_id = %handle.user_id,
                connection_id = %handle.id,
                "connection registered"
            );
        }
        superseded
    }

    /// Removes the entry for an identity, but only if it still belongs to
    /// the given connection. A handle that was superseded by a reconnect
    /// must not evict its successor.
    pub fn deregister(
        &self,
        tenant_id: &TenantId,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Deregistration {
        let key = (tenant_id.clone(), user_id);
        if self
            .entries
            .remove_if(&key, |_, handle| handle.id == connection_id)
            .is_some()
        {
            debug!(tenant_id = %tenant_id, user_id = %user_id, connection_id = %connection_id, "connection deregistered");
            return Deregistration::Removed;
        }
        if self.entries.contains_key(&key) {
            Deregistration::Superseded
        } else {
            Deregistration::AlreadyGone
        }
    }

    /// Looks up the live connection for an identity, if any.
    pub fn get(&self, tenant_id: &TenantId, user_id: UserId) -> Option<Arc<ConnectionHandle>> {
        self.entries
            .get(&(tenant_id.clone(), user_id))
            .map(|entry| entry.value().clone())
    }

    pub fn is_connected(&self, tenant_id: &TenantId, user_id: UserId) -> bool {
        self.entries.contains_key(&(tenant_id.clone(), user_id))
    }

    /// Total live connections across all tenants.
    pub fn connection_count(&self) -> usize {
        self.entries.len()
    }

    /// Sends a frame to a single identity.
    pub fn unicast(&self, tenant_id: &TenantId, user_id: UserId, frame: &str) -> SendResult {
        let Some(handle) = self.get(tenant_id, user_id) else {
            return SendResult::RecipientOffline;
        };
        self.send_via(&handle, frame)
    }

    /// Sends a frame to each listed member of a group that is currently
    /// connected. Absent members count as offline, not failures.
    pub fn broadcast_to_group(
        &self,
        tenant_id: &TenantId,
        member_ids: &[UserId],
        frame: &str,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for &member in member_ids {
            match self.unicast(tenant_id, member, frame) {
                SendResult::Delivered => report.delivered += 1,
                SendResult::RecipientOffline => report.offline += 1,
                SendResult::SendFailed => report.failed += 1,
            }
        }
        report
    }

    /// Sends a frame to every live connection in a tenant, optionally
    /// skipping one user. Connections in other tenants are never touched.
    pub fn broadcast_to_tenant(
        &self,
        tenant_id: &TenantId,
        frame: &str,
        exclude: Option<UserId>,
    ) -> DeliveryReport {
        let targets: Vec<Arc<ConnectionHandle>> = self
            .entries
            .iter()
            .filter(|entry| &entry.key().0 == tenant_id && Some(entry.key().1) != exclude)
            .map(|entry| entry.value().clone())
            .collect();

        let mut report = DeliveryReport::default();
        for handle in targets {
            match self.send_via(&handle, frame) {
                SendResult::Delivered => report.delivered += 1,
                SendResult::RecipientOffline => report.offline += 1,
                SendResult::SendFailed => report.failed += 1,
            }
        }
        report
    }

    /// Asks every live connection to wind down. Each socket task then runs
    /// its own teardown, so presence records are still flipped on the way
    /// out.
    pub fn shutdown_all(&self) {
        for entry in self.entries.iter() {
            entry.value().request_shutdown();
        }
    }

    fn send_via(&self, handle: &Arc<ConnectionHandle>, frame: &str) -> SendResult {
        match handle.send(frame) {
            SendOutcome::Sent => SendResult::Delivered,
            SendOutcome::Dropped => SendResult::SendFailed,
            SendOutcome::Closed => {
                // Stale entry: the socket task is gone. Clean it up so the
                // identity reads as offline on the next lookup.
                self.deregister(&handle.tenant_id, handle.user_id, handle.id);
                SendResult::SendFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campuslink_entity::user::UserRole;
    use tokio::sync::mpsc;

    fn open(
        registry: &ConnectionRegistry,
        tenant: &str,
        user_id: UserId,
        name: &str,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (handle, rx) = ConnectionHandle::new(
            TenantId::new(tenant),
            user_id,
            name.to_string(),
            UserRole::Student,
            8,
        );
        let handle = Arc::new(handle);
        registry.register(handle.clone());
        (handle, rx)
    }

    #[tokio::test]
    async fn test_reconnect_supersedes_previous_connection() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();

        let (first, _rx1) = open(&registry, "COEP", user, "Asha");
        let (second, _rx2) = open(&registry, "COEP", user, "Asha");

        assert_eq!(registry.connection_count(), 1);
        assert!(!first.is_alive());
        assert!(first.is_cancelled());
        assert!(second.is_alive());
        assert_eq!(
            registry.get(&TenantId::new("COEP"), user).map(|h| h.id),
            Some(second.id)
        );
    }

    #[tokio::test]
    async fn test_superseded_handle_cannot_evict_successor() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let tenant = TenantId::new("COEP");

        let (first, _rx1) = open(&registry, "COEP", user, "Asha");
        let (_second, _rx2) = open(&registry, "COEP", user, "Asha");

        assert_eq!(
            registry.deregister(&tenant, user, first.id),
            Deregistration::Superseded
        );
        assert!(registry.is_connected(&tenant, user));
    }

    #[tokio::test]
    async fn test_unicast_to_offline_recipient() {
        let registry = ConnectionRegistry::new();
        assert_eq!(
            registry.unicast(&TenantId::new("COEP"), UserId::new(), "{}"),
            SendResult::RecipientOffline
        );
    }

    #[tokio::test]
    async fn test_unicast_delivers() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let (_handle, mut rx) = open(&registry, "COEP", user, "Asha");

        assert_eq!(
            registry.unicast(&TenantId::new("COEP"), user, "ping"),
            SendResult::Delivered
        );
        assert_eq!(rx.recv().await.as_deref(), Some("ping"));
    }

    #[tokio::test]
    async fn test_dead_connection_is_evicted_on_send() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let tenant = TenantId::new("COEP");
        let (_handle, rx) = open(&registry, "COEP", user, "Asha");
        drop(rx);

        assert_eq!(registry.unicast(&tenant, user, "ping"), SendResult::SendFailed);
        assert!(!registry.is_connected(&tenant, user));
    }

    #[tokio::test]
    async fn test_same_user_id_in_two_tenants_stays_separate() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();

        let (_a, mut rx_a) = open(&registry, "COEP", user, "Bob");
        let (_b, mut rx_b) = open(&registry, "VJTI", user, "Bob");

        assert_eq!(registry.connection_count(), 2);
        assert_eq!(
            registry.unicast(&TenantId::new("COEP"), user, "for coep bob"),
            SendResult::Delivered
        );
        assert_eq!(rx_a.recv().await.as_deref(), Some("for coep bob"));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tenant_broadcast_respects_boundary_and_exclusion() {
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = open(&registry, "COEP", UserId::new(), "Alice");
        let (_bob, mut bob_rx) = open(&registry, "COEP", UserId::new(), "Bob");
        let (_carol, mut carol_rx) = open(&registry, "VJTI", UserId::new(), "Carol");

        let report =
            registry.broadcast_to_tenant(&TenantId::new("COEP"), "notice", Some(alice.user_id));
        assert_eq!(report.delivered, 1);
        assert_eq!(bob_rx.recv().await.as_deref(), Some("notice"));
        assert!(alice_rx.try_recv().is_err());
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_group_broadcast_counts_offline_members() {
        let registry = ConnectionRegistry::new();
        let online = UserId::new();
        let offline = UserId::new();
        let (_handle, mut rx) = open(&registry, "COEP", online, "Asha");

        let report = registry.broadcast_to_group(
            &TenantId::new("COEP"),
            &[online, offline],
            "group notice",
        );
        assert_eq!(report.delivered, 1);
        assert_eq!(report.offline, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(rx.recv().await.as_deref(), Some("group notice"));
    }
}
