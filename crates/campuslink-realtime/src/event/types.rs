//! JSON shapes exchanged over the channel.
//!
//! Inbound frames are tagged by `type` with flat camelCase fields; outbound
//! frames wrap their payload under `data`. Timestamps on the wire are
//! ISO-8601 strings rendered in the tenant's configured UTC offset.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use campuslink_core::types::{GroupId, MessageId, UserId};
use campuslink_entity::message::StoredMessage;

/// An event received from a client.
///
/// Target ids arrive as raw strings so that a missing or garbled id can be
/// rejected with a targeted error event instead of a generic parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    /// Direct message to one peer.
    #[serde(rename = "message")]
    Direct {
        #[serde(default)]
        content: String,
        #[serde(rename = "receiverId", default)]
        receiver_id: String,
    },
    /// Message to every member of a group.
    #[serde(rename = "group_message")]
    Group {
        #[serde(default)]
        content: String,
        #[serde(rename = "groupId", default)]
        group_id: String,
        /// Advisory only; the verified principal name always wins.
        #[serde(rename = "senderName", default)]
        sender_name: Option<String>,
    },
}

/// An event pushed to a client.
///
/// Message and error payloads sit under `data`; `user_offline` carries its
/// `userId` at the top level, matching the established client contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// A delivered direct message.
    Message { data: MessageBody },
    /// A delivered group message.
    GroupMessage { data: MessageBody },
    /// A user in the tenant went offline.
    UserOffline {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
    /// A problem with an inbound event, reported only to its origin.
    Error { data: ErrorBody },
}

/// Payload of an `error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl OutboundEvent {
    /// Serializes the event for the wire.
    ///
    /// The shapes here contain nothing unserializable, so failure would
    /// indicate a programming error; it is absorbed into an error frame
    /// rather than propagated.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize outbound event");
            r#"{"type":"error","data":{"code":"INTERNAL_ERROR","message":"event serialization failed"}}"#
                .to_string()
        })
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            data: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// The payload of a delivered message, echoing the stored form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    #[serde(rename = "_id")]
    pub id: MessageId,
    pub content: String,
    pub sender_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    /// ISO-8601, rendered in the tenant's UTC offset.
    pub timestamp: String,
    pub is_read: bool,
}

impl MessageBody {
    /// Renders a stored message for the wire, converting its UTC timestamp
    /// into the tenant's local offset.
    pub fn from_stored(message: &StoredMessage, offset: FixedOffset) -> Self {
        Self {
            id: message.id,
            content: message.content.clone(),
            sender_id: message.sender_id,
            sender_name: message.sender_name.clone(),
            receiver_id: message.receiver_id,
            group_id: message.group_id,
            timestamp: message.timestamp.with_timezone(&offset).to_rfc3339(),
            is_read: message.is_read,
        }
    }
}
