use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use ctrack_core::error::CoreError;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::ws::registry::ConnectionRegistry;

#[derive(Debug, Deserialize)]
struct WsAuthQuery {
    token: Option<String>,
}

/// Authenticates a WebSocket upgrade from the `?token=` query parameter,
/// since browsers cannot set headers on the upgrade request.
pub struct WsAuth(pub AuthUser);

impl FromRequestParts<AppState> for WsAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<WsAuthQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let token = query
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Missing token".into())))?;
        AuthUser::from_token(&token, &state.config.jwt).map(WsAuth)
    }
}

/// HTTP handler that authenticates, then upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered in the
/// [`ConnectionRegistry`] and served by a sender task plus the receive loop.
pub async fn ws_handler(
    WsAuth(user): WsAuth,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, user, state.connections))
}

/// Manage a single WebSocket connection after upgrade.
///
/// The channel is push-only: inbound text is ignored, Close ends the loop.
async fn handle_socket(socket: WebSocket, user: AuthUser, connections: Arc<ConnectionRegistry>) {
    let (conn_id, mut rx) = connections.open(user.user_id).await;
    let open_for_user = connections.count_for_user(user.user_id).await;
    tracing::info!(
        conn_id = %conn_id,
        user_id = user.user_id,
        open_for_user,
        "WebSocket connected"
    );

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward the inbox to the WebSocket sink.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    connections.close(conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, user_id = user.user_id, "WebSocket disconnected");
}
