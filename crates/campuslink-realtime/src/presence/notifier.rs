//! Disconnect handling: registry cleanup, stored presence, and the
//! tenant-wide `user_offline` notice.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use campuslink_database::store::TenantContext;
use campuslink_entity::user::PresenceStatus;

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::{ConnectionRegistry, Deregistration};
use crate::event::OutboundEvent;

/// Runs the teardown sequence when a socket session ends.
///
/// The sequence runs at most once per connection, and not at all for a
/// connection that was superseded by a reconnect: the identity is still
/// online through its successor, so no offline notice goes out.
pub struct PresenceNotifier {
    registry: Arc<ConnectionRegistry>,
}

impl std::fmt::Debug for PresenceNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceNotifier").finish()
    }
}

impl PresenceNotifier {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Handles a closed connection: deregister, flip stored presence to
    /// offline, broadcast `user_offline` to the rest of the tenant.
    ///
    /// Safe to call from multiple teardown paths; only the first caller
    /// for a given handle does any work.
    pub async fn connection_closed(&self, context: &TenantContext, handle: &ConnectionHandle) {
        if !handle.begin_close() {
            // Already torn down, or force-closed by a successor.
            return;
        }

        match self
            .registry
            .deregister(&handle.tenant_id, handle.user_id, handle.id)
        {
            Deregistration::Superseded => {
                debug!(
                    tenant_id = %handle.tenant_id,
                    user_id = %handle.user_id,
                    connection_id = %handle.id,
                    "closed connection was superseded, identity stays online"
                );
                return;
            }
            Deregistration::Removed | Deregistration::AlreadyGone => {}
        }

        // Best effort: a failed presence write must not block the notice.
        if let Err(e) = context
            .store
            .set_user_presence(handle.user_id, PresenceStatus::Offline, Utc::now())
            .await
        {
            warn!(
                tenant_id = %handle.tenant_id,
                user_id = %handle.user_id,
                error = %e,
                "failed to persist offline presence"
            );
        }

        let frame = OutboundEvent::UserOffline {
            user_id: handle.user_id,
        }
        .to_frame();
        let report =
            self.registry
                .broadcast_to_tenant(&handle.tenant_id, &frame, Some(handle.user_id));

        debug!(
            tenant_id = %handle.tenant_id,
            user_id = %handle.user_id,
            notified = report.delivered,
            "user went offline"
        );
    }
}
