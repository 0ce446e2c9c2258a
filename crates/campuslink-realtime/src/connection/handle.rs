//! Per-connection handle shared between the registry and the socket task.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use campuslink_core::types::{TenantId, UserId};
use campuslink_entity::user::UserRole;

/// Unique id of a single socket session, distinct from the user identity.
/// Two sessions for the same user get different connection ids, which is
/// what lets deregistration tell a stale handle from the live one.
pub type ConnectionId = Uuid;

/// Outcome of pushing a frame onto a connection's outbound buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Frame accepted into the outbound buffer.
    Sent,
    /// Outbound buffer full; the frame was dropped, the connection lives on.
    Dropped,
    /// Receiver side gone; the connection is dead.
    Closed,
}

/// Handle to one live socket session.
///
/// The socket task owns the receiving half of the outbound channel; the
/// registry hands clones of this handle to anyone who wants to deliver a
/// frame. Sends are non-blocking: a slow consumer loses frames rather
/// than stalling the router.
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub display_name: String,
    pub role: UserRole,
    pub connected_at: DateTime<Utc>,
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
    alive: AtomicBool,
    close_claimed: AtomicBool,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("user_id", &self.user_id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl ConnectionHandle {
    /// Creates a handle with a bounded outbound buffer, returning the
    /// receiver half for the socket's writer task.
    pub fn new(
        tenant_id: TenantId,
        user_id: UserId,
        display_name: String,
        role: UserRole,
        buffer_size: usize,
    ) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        let handle = Self {
            id: Uuid::new_v4(),
            tenant_id,
            user_id,
            display_name,
            role,
            connected_at: Utc::now(),
            outbound: tx,
            cancel: CancellationToken::new(),
            alive: AtomicBool::new(true),
            close_claimed: AtomicBool::new(false),
        };
        (handle, rx)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Attempts to enqueue a frame for the socket writer.
    pub fn send(&self, frame: &str) -> SendOutcome {
        if !self.is_alive() {
            return SendOutcome::Closed;
        }
        match self.outbound.try_send(frame.to_owned()) {
            Ok(()) => SendOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %self.id,
                    user_id = %self.user_id,
                    "outbound buffer full, dropping frame"
                );
                SendOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.alive.store(false, Ordering::SeqCst);
                SendOutcome::Closed
            }
        }
    }

    /// Marks the handle dead, claims its close sequence, and cancels its
    /// socket task. Used when a newer session for the same identity
    /// supersedes this one: the old handle must start failing writes
    /// immediately, and its teardown must not touch presence.
    pub fn force_close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.close_claimed.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }

    /// Requests the socket task to wind down without claiming the close
    /// sequence; the task runs its own teardown when the loop exits.
    pub fn request_shutdown(&self) {
        self.cancel.cancel();
    }

    /// Claims the close sequence for this handle. Returns `true` exactly
    /// once per handle, so teardown (deregister, presence flip, offline
    /// broadcast) cannot run twice under disconnect races. The claim is
    /// tracked apart from channel liveness: a dead outbound channel (the
    /// writer task dropped its receiver) still leaves the close sequence
    /// for the socket task to run.
    pub fn begin_close(&self) -> bool {
        self.alive.store(false, Ordering::SeqCst);
        !self.close_claimed.swap(true, Ordering::SeqCst)
    }

    /// Resolves when the session has been asked to stop.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
