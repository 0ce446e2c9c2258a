//! Message history and REST send endpoints.
//!
//! REST sends go through the same router as socket frames, so persistence
//! ordering and delivery semantics are identical regardless of transport.

use std::str::FromStr;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campuslink_core::error::AppError;
use campuslink_core::types::{GroupId, UserId};
use campuslink_realtime::event::MessageBody;

use crate::error::ApiError;
use crate::extractors::AuthSession;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub peer_id: Option<String>,
    pub group_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    pub receiver_id: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<MessageBody>,
}

/// GET /api/messages?peerId=… | ?groupId=… — history, newest first.
pub async fn list_messages(
    State(_state): State<AppState>,
    session: AuthSession,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let offset = session.context.tenant.time_offset();

    let stored = match (&query.peer_id, &query.group_id) {
        (Some(peer), None) => {
            let peer_id = parse_id::<UserId>(peer, "peerId")?;
            session
                .context
                .store
                .messages_with_peer(session.principal.user_id, peer_id, limit)
                .await?
        }
        (None, Some(group)) => {
            let group_id = parse_id::<GroupId>(group, "groupId")?;
            let members = session
                .context
                .store
                .group_members(group_id)
                .await?
                .ok_or_else(|| AppError::not_found("Group does not exist in this campus"))?;
            if !members.contains(&session.principal.user_id) {
                return Err(AppError::authorization("Not a member of the group").into());
            }
            session.context.store.group_messages(group_id, limit).await?
        }
        _ => {
            return Err(
                AppError::validation("Provide exactly one of peerId or groupId").into(),
            )
        }
    };

    let messages = stored
        .iter()
        .map(|m| MessageBody::from_stored(m, offset))
        .collect();
    Ok(Json(HistoryResponse { messages }))
}

/// POST /api/messages — send through the delivery router.
pub async fn send_message(
    State(state): State<AppState>,
    session: AuthSession,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<MessageBody>, ApiError> {
    let stored = match (&request.receiver_id, &request.group_id) {
        (Some(receiver), None) => {
            let receiver_id = parse_id::<UserId>(receiver, "receiverId")?;
            state
                .realtime
                .router()
                .send_direct(
                    &session.context,
                    &session.principal,
                    request.content,
                    receiver_id,
                )
                .await?
        }
        (None, Some(group)) => {
            let group_id = parse_id::<GroupId>(group, "groupId")?;
            state
                .realtime
                .router()
                .send_group(
                    &session.context,
                    &session.principal,
                    request.content,
                    group_id,
                )
                .await?
        }
        _ => {
            return Err(
                AppError::validation("Provide exactly one of receiverId or groupId").into(),
            )
        }
    };

    let offset = session.context.tenant.time_offset();
    Ok(Json(MessageBody::from_stored(&stored, offset)))
}

fn parse_id<T: From<Uuid>>(raw: &str, field: &str) -> Result<T, ApiError> {
    Uuid::from_str(raw)
        .map(T::from)
        .map_err(|_| AppError::validation(format!("Malformed {field}: '{raw}'")).into())
}
