//! Inbound message routing: validate, persist, then deliver.
//!
//! Persistence is the commit point. A message is fanned out only after the
//! store has acknowledged it, so no recipient ever sees a message that the
//! store lost. Validation and authorization failures are rejected before
//! the persist attempt and reported only to the origin connection.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use campuslink_core::error::{AppError, ErrorKind};
use campuslink_core::result::AppResult;
use campuslink_core::types::{GroupId, UserId};
use campuslink_database::store::TenantContext;
use campuslink_entity::message::{MessageTarget, NewMessage, StoredMessage};

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::connection::Principal;
use crate::event::{InboundEvent, MessageBody, OutboundEvent};

/// Routes chat messages: validates the target, persists through the
/// tenant's store, then delivers to the recipient connection(s).
pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter").finish()
    }
}

impl MessageRouter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Handles one raw frame from a socket. Any rejection is reported back
    /// on the same connection as an error event; other connections never
    /// see it.
    pub async fn handle_frame(
        &self,
        context: &TenantContext,
        connection: &Arc<ConnectionHandle>,
        raw: &str,
    ) {
        let event: InboundEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                self.report(connection, "INVALID_EVENT", format!("Unparseable event: {e}"));
                return;
            }
        };

        let principal = Principal {
            user_id: connection.user_id,
            tenant_id: connection.tenant_id.clone(),
            role: connection.role,
            display_name: connection.display_name.clone(),
        };

        let result = match event {
            InboundEvent::Direct {
                content,
                receiver_id,
            } => match parse_id::<UserId>(&receiver_id, "receiverId") {
                Ok(receiver) => self.send_direct(context, &principal, content, receiver).await,
                Err(e) => Err(e),
            },
            InboundEvent::Group {
                content, group_id, ..
            } => match parse_id::<GroupId>(&group_id, "groupId") {
                Ok(group) => self.send_group(context, &principal, content, group).await,
                Err(e) => Err(e),
            },
        };

        if let Err(error) = result {
            self.report(connection, wire_code(&error), error.message.clone());
        }
    }

    /// Sends a direct message: confirm the receiver exists in this tenant,
    /// persist, then deliver to the receiver and echo to the sender.
    pub async fn send_direct(
        &self,
        context: &TenantContext,
        principal: &Principal,
        content: String,
        receiver_id: UserId,
    ) -> AppResult<StoredMessage> {
        validate_content(&content)?;

        if context.store.find_user(receiver_id).await?.is_none() {
            return Err(AppError::not_found("Receiver does not exist in this campus"));
        }

        let stored = context
            .store
            .persist_message(NewMessage {
                content,
                attachments: vec![],
                sender_id: principal.user_id,
                sender_name: None,
                target: MessageTarget::Direct(receiver_id),
                timestamp: Utc::now(),
            })
            .await?;

        let frame = OutboundEvent::Message {
            data: MessageBody::from_stored(&stored, context.tenant.time_offset()),
        }
        .to_frame();

        let to_receiver = self
            .registry
            .unicast(&principal.tenant_id, receiver_id, &frame);
        // Echo so every sender device converges on the stored form.
        let to_sender = self
            .registry
            .unicast(&principal.tenant_id, principal.user_id, &frame);

        debug!(
            message_id = %stored.id,
            sender_id = %principal.user_id,
            receiver_id = %receiver_id,
            ?to_receiver,
            ?to_sender,
            "direct message routed"
        );
        Ok(stored)
    }

    /// Sends a group message: resolve the member set, require the sender to
    /// be in it, persist, then fan out to every member including the
    /// sender.
    pub async fn send_group(
        &self,
        context: &TenantContext,
        principal: &Principal,
        content: String,
        group_id: GroupId,
    ) -> AppResult<StoredMessage> {
        validate_content(&content)?;

        let members = context
            .store
            .group_members(group_id)
            .await?
            .ok_or_else(|| AppError::not_found("Group does not exist in this campus"))?;

        if !members.contains(&principal.user_id) {
            return Err(AppError::authorization("Sender is not a member of the group"));
        }

        let stored = context
            .store
            .persist_message(NewMessage {
                content,
                attachments: vec![],
                sender_id: principal.user_id,
                sender_name: Some(principal.display_name.clone()),
                target: MessageTarget::Group(group_id),
                timestamp: Utc::now(),
            })
            .await?;

        let frame = OutboundEvent::GroupMessage {
            data: MessageBody::from_stored(&stored, context.tenant.time_offset()),
        }
        .to_frame();

        let report = self
            .registry
            .broadcast_to_group(&principal.tenant_id, &members, &frame);

        debug!(
            message_id = %stored.id,
            group_id = %group_id,
            sender_id = %principal.user_id,
            delivered = report.delivered,
            offline = report.offline,
            failed = report.failed,
            "group message routed"
        );
        Ok(stored)
    }

    fn report(&self, connection: &ConnectionHandle, code: &str, message: String) {
        warn!(
            connection_id = %connection.id,
            user_id = %connection.user_id,
            code,
            %message,
            "rejecting inbound event"
        );
        connection.send(&OutboundEvent::error(code, message).to_frame());
    }
}

fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::validation("Message content must not be empty"));
    }
    Ok(())
}

fn parse_id<T: From<Uuid>>(raw: &str, field: &str) -> AppResult<T> {
    if raw.is_empty() {
        return Err(AppError::validation(format!("Missing {field}")));
    }
    Uuid::from_str(raw)
        .map(T::from)
        .map_err(|_| AppError::validation(format!("Malformed {field}: '{raw}'")))
}

/// Error code reported on the wire for a rejected event.
fn wire_code(error: &AppError) -> &'static str {
    match error.kind {
        ErrorKind::Validation => "INVALID_EVENT",
        ErrorKind::Authorization => "NOT_A_GROUP_MEMBER",
        ErrorKind::NotFound => "NOT_FOUND",
        ErrorKind::Database => "STORAGE_ERROR",
        _ => "INTERNAL_ERROR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campuslink_core::types::TenantId;
    use campuslink_database::store::MemoryChatStore;
    use campuslink_entity::tenant::{Tenant, TenantStatus};
    use campuslink_entity::user::{PresenceStatus, UserRecord, UserRole};
    use tokio::sync::mpsc;

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        router: MessageRouter,
        store: Arc<MemoryChatStore>,
        context: TenantContext,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = Arc::new(MemoryChatStore::new());
        let context = TenantContext::new(
            Tenant {
                id: TenantId::new("COEP"),
                name: "COEP".to_string(),
                schema_name: "college_coep".to_string(),
                status: TenantStatus::Approved,
                utc_offset_minutes: 330,
                created_at: Utc::now(),
            },
            store.clone(),
        );
        Fixture {
            router: MessageRouter::new(registry.clone()),
            registry,
            store,
            context,
        }
    }

    fn seed_user(store: &MemoryChatStore, name: &str) -> UserId {
        let id = UserId::new();
        store.insert_user(UserRecord {
            id,
            name: name.to_string(),
            email: format!("{}@coep.edu", name.to_lowercase()),
            role: UserRole::Student,
            status: PresenceStatus::Offline,
            last_seen: None,
            created_at: Utc::now(),
        });
        id
    }

    fn connect(
        fixture: &Fixture,
        user_id: UserId,
        name: &str,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (handle, rx) = ConnectionHandle::new(
            TenantId::new("COEP"),
            user_id,
            name.to_string(),
            UserRole::Student,
            16,
        );
        let handle = Arc::new(handle);
        fixture.registry.register(handle.clone());
        (handle, rx)
    }

    fn principal(user_id: UserId, name: &str) -> Principal {
        Principal {
            user_id,
            tenant_id: TenantId::new("COEP"),
            role: UserRole::Student,
            display_name: name.to_string(),
        }
    }

    fn event_type(frame: &str) -> String {
        let value: serde_json::Value = serde_json::from_str(frame).unwrap();
        value["type"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_direct_message_persists_then_delivers_and_echoes() {
        let f = fixture();
        let asha = seed_user(&f.store, "Asha");
        let bala = seed_user(&f.store, "Bala");
        let (_ah, mut asha_rx) = connect(&f, asha, "Asha");
        let (_bh, mut bala_rx) = connect(&f, bala, "Bala");

        let stored = f
            .router
            .send_direct(&f.context, &principal(asha, "Asha"), "hi".to_string(), bala)
            .await
            .unwrap();

        assert_eq!(f.store.message_count(), 1);
        assert_eq!(stored.receiver_id, Some(bala));

        let to_bala = bala_rx.recv().await.unwrap();
        let to_asha = asha_rx.recv().await.unwrap();
        assert_eq!(event_type(&to_bala), "message");
        // sender gets the identical stored form back
        assert_eq!(to_bala, to_asha);
    }

    #[tokio::test]
    async fn test_direct_message_to_offline_recipient_still_persists() {
        let f = fixture();
        let asha = seed_user(&f.store, "Asha");
        let bala = seed_user(&f.store, "Bala");

        f.router
            .send_direct(&f.context, &principal(asha, "Asha"), "hi".to_string(), bala)
            .await
            .unwrap();
        assert_eq!(f.store.message_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_receiver_is_not_persisted() {
        let f = fixture();
        let asha = seed_user(&f.store, "Asha");

        let err = f
            .router
            .send_direct(
                &f.context,
                &principal(asha, "Asha"),
                "hi".to_string(),
                UserId::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(f.store.message_count(), 0);
    }

    #[tokio::test]
    async fn test_persist_failure_means_no_delivery() {
        let f = fixture();
        let asha = seed_user(&f.store, "Asha");
        let bala = seed_user(&f.store, "Bala");
        let (_bh, mut bala_rx) = connect(&f, bala, "Bala");
        f.store.set_fail_persist(true);

        let err = f
            .router
            .send_direct(&f.context, &principal(asha, "Asha"), "hi".to_string(), bala)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);
        assert!(bala_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_group_fanout_includes_sender_and_carries_name() {
        let f = fixture();
        let asha = seed_user(&f.store, "Asha");
        let bala = seed_user(&f.store, "Bala");
        let group = GroupId::new();
        f.store.insert_group(group, vec![asha, bala]);
        let (_ah, mut asha_rx) = connect(&f, asha, "Asha");
        let (_bh, mut bala_rx) = connect(&f, bala, "Bala");

        let stored = f
            .router
            .send_group(&f.context, &principal(asha, "Asha"), "yo".to_string(), group)
            .await
            .unwrap();
        assert_eq!(stored.sender_name.as_deref(), Some("Asha"));

        for rx in [&mut asha_rx, &mut bala_rx] {
            let frame = rx.recv().await.unwrap();
            assert_eq!(event_type(&frame), "group_message");
            let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(value["data"]["senderName"], "Asha");
            assert_eq!(value["data"]["groupId"], group.to_string());
        }
    }

    #[tokio::test]
    async fn test_non_member_sender_rejected_without_persist() {
        let f = fixture();
        let asha = seed_user(&f.store, "Asha");
        let bala = seed_user(&f.store, "Bala");
        let group = GroupId::new();
        f.store.insert_group(group, vec![bala]);

        let err = f
            .router
            .send_group(&f.context, &principal(asha, "Asha"), "yo".to_string(), group)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert_eq!(f.store.message_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_group_rejected_without_persist() {
        let f = fixture();
        let asha = seed_user(&f.store, "Asha");

        let err = f
            .router
            .send_group(
                &f.context,
                &principal(asha, "Asha"),
                "yo".to_string(),
                GroupId::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(f.store.message_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_frame_reports_error_to_origin_only() {
        let f = fixture();
        let asha = seed_user(&f.store, "Asha");
        let bala = seed_user(&f.store, "Bala");
        let (asha_handle, mut asha_rx) = connect(&f, asha, "Asha");
        let (_bh, mut bala_rx) = connect(&f, bala, "Bala");

        f.router
            .handle_frame(&f.context, &asha_handle, "this is not json")
            .await;

        let frame = asha_rx.recv().await.unwrap();
        assert_eq!(event_type(&frame), "error");
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["data"]["code"], "INVALID_EVENT");
        assert!(bala_rx.try_recv().is_err());
        assert_eq!(f.store.message_count(), 0);
    }

    #[tokio::test]
    async fn test_frame_with_group_membership_violation_reports_code() {
        let f = fixture();
        let asha = seed_user(&f.store, "Asha");
        let bala = seed_user(&f.store, "Bala");
        let group = GroupId::new();
        f.store.insert_group(group, vec![bala]);
        let (asha_handle, mut asha_rx) = connect(&f, asha, "Asha");

        let raw = format!(
            r#"{{"type":"group_message","content":"yo","groupId":"{group}","senderName":"Asha"}}"#
        );
        f.router.handle_frame(&f.context, &asha_handle, &raw).await;

        let value: serde_json::Value =
            serde_json::from_str(&asha_rx.recv().await.unwrap()).unwrap();
        assert_eq!(value["data"]["code"], "NOT_A_GROUP_MEMBER");
    }

    #[tokio::test]
    async fn test_frame_with_missing_receiver_reports_invalid_event() {
        let f = fixture();
        let asha = seed_user(&f.store, "Asha");
        let (asha_handle, mut asha_rx) = connect(&f, asha, "Asha");

        f.router
            .handle_frame(
                &f.context,
                &asha_handle,
                r#"{"type":"message","content":"hi"}"#,
            )
            .await;

        let value: serde_json::Value =
            serde_json::from_str(&asha_rx.recv().await.unwrap()).unwrap();
        assert_eq!(value["data"]["code"], "INVALID_EVENT");
    }
}
