//! Message entity.

pub mod model;

pub use model::{MessageTarget, NewMessage, StoredMessage};
