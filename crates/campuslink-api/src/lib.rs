//! # campuslink-api
//!
//! HTTP surface of the CampusLink delivery subsystem: the WebSocket
//! upgrade endpoint, message-history REST endpoints, and health checks.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
