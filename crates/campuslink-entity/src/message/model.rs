//! Message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use campuslink_core::types::{GroupId, MessageId, UserId};

/// The destination of a message: exactly one peer or one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageTarget {
    /// Direct message to a single user.
    Direct(UserId),
    /// Message to every member of a group.
    Group(GroupId),
}

/// A message accepted for persistence but not yet stored.
///
/// The server assigns the timestamp; clients never supply one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// Message text.
    pub content: String,
    /// Optional attachment descriptors (opaque to the delivery core).
    pub attachments: Vec<serde_json::Value>,
    /// The authenticated sender.
    pub sender_id: UserId,
    /// Verified display name of the sender (group messages carry it).
    pub sender_name: Option<String>,
    /// Where the message goes.
    pub target: MessageTarget,
    /// Server-assigned creation time (UTC; rendered in the tenant's
    /// offset at the wire boundary).
    pub timestamp: DateTime<Utc>,
}

/// A persisted message as read back from the tenant's store.
///
/// Immutable once stored except for the read flag, which the CRUD layer
/// flips on retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredMessage {
    /// Store-assigned identifier.
    pub id: MessageId,
    /// Message text.
    pub content: String,
    /// Attachment descriptors.
    pub attachments: serde_json::Value,
    /// Sender identifier.
    pub sender_id: UserId,
    /// Verified sender display name, when carried.
    pub sender_name: Option<String>,
    /// Receiver, for direct messages.
    pub receiver_id: Option<UserId>,
    /// Group, for group messages.
    pub group_id: Option<GroupId>,
    /// Server-assigned creation time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Whether the recipient has read the message.
    pub is_read: bool,
}

impl StoredMessage {
    /// The message target, reconstructed from the stored columns.
    ///
    /// Exactly one of `receiver_id`/`group_id` is set for any row the
    /// store accepts; a row violating that is treated as direct-less.
    pub fn target(&self) -> Option<MessageTarget> {
        match (self.receiver_id, self.group_id) {
            (Some(user), None) => Some(MessageTarget::Direct(user)),
            (None, Some(group)) => Some(MessageTarget::Group(group)),
            _ => None,
        }
    }
}
