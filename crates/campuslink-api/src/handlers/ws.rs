//! WebSocket upgrade handler and the per-connection socket loop.
//!
//! The upgrade is always accepted; credential checks run on the opened
//! socket so that a rejected client receives a proper close frame with a
//! policy-violation code instead of a bare HTTP error. A connection is
//! registered only after authentication succeeds.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use campuslink_core::error::ErrorKind;

use crate::state::AppState;

/// Close code sent when the presented credential is rejected.
const CLOSE_POLICY_VIOLATION: u16 = 1008;
/// Close code sent when the server cannot continue the session.
const CLOSE_INTERNAL_ERROR: u16 = 1011;

#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    #[serde(default)]
    pub token: String,
}

/// GET /ws?token={jwt} — WebSocket upgrade.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Response {
    let max_frame = state.realtime.config().max_frame_bytes;
    ws.max_message_size(max_frame)
        .on_upgrade(move |socket| handle_socket(state, query.token, socket))
}

async fn handle_socket(state: AppState, token: String, mut socket: WebSocket) {
    let (principal, context) = match state.authenticator.authenticate(&token).await {
        Ok(auth) => auth,
        Err(error) => {
            let (code, reason) = match error.kind {
                ErrorKind::Authentication | ErrorKind::NotFound | ErrorKind::Authorization => {
                    (CLOSE_POLICY_VIOLATION, error.message)
                }
                _ => {
                    warn!(error = %error, "channel authentication failed internally");
                    (CLOSE_INTERNAL_ERROR, "internal error".to_string())
                }
            };
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                })))
                .await;
            return;
        }
    };

    let (handle, mut outbound_rx) = state.realtime.open_connection(&principal);

    info!(
        connection_id = %handle.id,
        tenant_id = %principal.tenant_id,
        user_id = %principal.user_id,
        "websocket connection established"
    );

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Drains the bounded outbound buffer into the socket.
    let forwarder = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            // Force-closed by a reconnect, or engine shutdown.
            _ = handle.cancelled() => break,
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    state
                        .realtime
                        .router()
                        .handle_frame(&context, &handle, text.as_str())
                        .await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {
                    // Ping/pong handled by axum; binary frames ignored.
                }
                Some(Err(e)) => {
                    warn!(connection_id = %handle.id, error = %e, "websocket transport error");
                    break;
                }
            },
        }
    }

    forwarder.abort();
    state
        .realtime
        .presence()
        .connection_closed(&context, &handle)
        .await;

    info!(
        connection_id = %handle.id,
        tenant_id = %principal.tenant_id,
        user_id = %principal.user_id,
        "websocket connection closed"
    );
}
