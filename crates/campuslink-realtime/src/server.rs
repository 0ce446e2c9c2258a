//! The realtime engine: owns the registry and the components built on it.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use campuslink_core::config::realtime::RealtimeConfig;

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::connection::Principal;
use crate::presence::PresenceNotifier;
use crate::router::MessageRouter;

/// Aggregates the delivery components around one shared connection
/// registry. One engine per process.
pub struct RealtimeEngine {
    registry: Arc<ConnectionRegistry>,
    router: MessageRouter,
    presence: PresenceNotifier,
    config: RealtimeConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.registry.connection_count())
            .finish()
    }
}

impl RealtimeEngine {
    pub fn new(config: RealtimeConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            router: MessageRouter::new(registry.clone()),
            presence: PresenceNotifier::new(registry.clone()),
            registry,
            config,
            shutdown_tx,
        }
    }

    /// Opens a registered connection for an authenticated principal.
    ///
    /// Returns the shared handle plus the receiver the socket's writer
    /// task drains. Any previous connection for the same identity is
    /// force-closed by the registration.
    pub fn open_connection(
        &self,
        principal: &Principal,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (handle, rx) = ConnectionHandle::new(
            principal.tenant_id.clone(),
            principal.user_id,
            principal.display_name.clone(),
            principal.role,
            self.config.channel_buffer_size,
        );
        let handle = Arc::new(handle);
        self.registry.register(handle.clone());
        (handle, rx)
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn presence(&self) -> &PresenceNotifier {
        &self.presence
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Subscribe to the engine-wide shutdown signal.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates shutdown: every live socket task is asked to wind down
    /// and runs its own teardown, so stored presence is flipped on the
    /// way out.
    pub fn shutdown(&self) {
        info!(
            connections = self.registry.connection_count(),
            "realtime engine shutting down"
        );
        let _ = self.shutdown_tx.send(());
        self.registry.shutdown_all();
    }
}
