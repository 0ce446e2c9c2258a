//! Wire-level event types for the realtime channel.

pub mod types;

pub use types::{ErrorBody, InboundEvent, MessageBody, OutboundEvent};
