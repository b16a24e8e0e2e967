use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use coursehub_core::types::UserId;
use coursehub_events::wire::{parse_client_frame, ClientFrame};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::auth::jwt;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Query parameters for the WebSocket upgrade request.
#[derive(Deserialize)]
pub struct WsQuery {
    /// Bearer token issued by the auth service.
    token: String,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// The bearer token is validated *before* the upgrade is accepted: a bad
/// or expired token gets a 401 and the connection never reaches the
/// registry. After the upgrade the connection is registered with
/// `WsManager` and managed by two tasks (sender + receiver).
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let claims = jwt::validate_token(&query.token, &state.config.jwt)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {e}")))?;

    let user_id = claims.sub;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Processes inbound frames on the current task.
///   4. Cleans up on disconnect (unregister purges all room memberships).
async fn handle_socket(socket: WebSocket, state: AppState, user_id: UserId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = state.ws_manager.register(conn_id.clone(), user_id).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: process inbound messages.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_frame(&state, &conn_id, user_id, &text).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                state.ws_manager.touch(&conn_id).await;
            }
            Ok(_msg) => {
                // Ping is answered by the protocol layer; binary frames
                // are not part of the wire contract.
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection (purging room memberships) and abort
    // the sender task.
    state.ws_manager.unregister(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket disconnected");
}

/// Dispatch a single inbound text frame.
///
/// Unknown channels and malformed JSON are logged and skipped; a broken
/// frame must not tear down the connection.
async fn handle_frame(state: &AppState, conn_id: &str, user_id: UserId, text: &str) {
    let frame = match parse_client_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(
                conn_id = %conn_id,
                error = %e,
                raw_message = %text,
                "Failed to parse client frame",
            );
            return;
        }
    };

    match frame {
        ClientFrame::JoinCourse(data) => {
            if state.ws_manager.join(conn_id, data.course_id).await {
                tracing::debug!(conn_id = %conn_id, course_id = data.course_id, "Joined course room");
            }
        }
        ClientFrame::LeaveCourse(data) => {
            state.ws_manager.leave(conn_id, data.course_id).await;
            tracing::debug!(conn_id = %conn_id, course_id = data.course_id, "Left course room");
        }
        ClientFrame::ProgressUpdate(data) => {
            state
                .publisher
                .publish_progress_update(user_id, data.course_id, data.percent);
        }
        ClientFrame::TypingStart(data) => {
            state.publisher.publish_typing(user_id, data.course_id, true);
        }
        ClientFrame::TypingStop(data) => {
            state.publisher.publish_typing(user_id, data.course_id, false);
        }
    }
}
