//! # campuslink-realtime
//!
//! Real-time message delivery engine for CampusLink. Provides:
//!
//! - WebSocket credential validation at channel-upgrade time
//! - A tenant-scoped connection registry with last-writer-wins identity
//!   entries and bounded, best-effort sends
//! - A message router that persists inbound chat events before delivering
//!   them to a peer or a group
//! - A presence notifier that flips stored presence and broadcasts
//!   `user_offline` notices on disconnect

pub mod connection;
pub mod event;
pub mod presence;
pub mod router;
pub mod server;

pub use connection::authenticator::{Principal, WsAuthenticator};
pub use connection::registry::ConnectionRegistry;
pub use presence::PresenceNotifier;
pub use router::MessageRouter;
pub use server::RealtimeEngine;
