//! Connection lifecycle: handles, registry, and upgrade authentication.

pub mod authenticator;
pub mod handle;
pub mod registry;

pub use authenticator::{Principal, WsAuthenticator};
pub use handle::{ConnectionHandle, ConnectionId};
pub use registry::{ConnectionRegistry, DeliveryReport, Deregistration, SendResult};
