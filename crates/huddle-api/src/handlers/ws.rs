//! WebSocket upgrade handler.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use huddle_core::traits::token::AuthenticatedUser;

use crate::state::AppState;

/// Close code sent when token verification fails.
const CLOSE_AUTH_FAILED: u16 = 4001;

/// Query parameters for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: Option<String>,
}

/// GET /ws?token={jwt} — WebSocket upgrade.
///
/// The upgrade is always accepted; the token is verified on the
/// established socket so that failures surface as close code 4001
/// instead of an HTTP error the client cannot distinguish from a
/// network problem.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, query.token, socket))
}

async fn handle_socket(state: AppState, token: Option<String>, mut socket: WebSocket) {
    let user = match authenticate(&state, token.as_deref()).await {
        Ok(user) => user,
        Err(reason) => {
            warn!(reason = %reason, "WebSocket auth failed");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_AUTH_FAILED,
                    reason: "Authentication failed".into(),
                })))
                .await;
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = state.hub.connect(user.user_id, &user.username).await;
    let conn_id = handle.id;

    info!(
        conn_id = %conn_id,
        user_id = %user.user_id,
        "WebSocket connection established"
    );

    // Forward hub frames to the socket until the sender side closes.
    let outbound_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state.hub.handle_inbound(conn_id, &text).await;
            }
            Ok(Message::Close(_)) => break,
            // Ping/Pong control frames are answered by axum itself.
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    outbound_task.abort();
    state.hub.disconnect(conn_id).await;

    info!(
        conn_id = %conn_id,
        user_id = %user.user_id,
        "WebSocket connection closed"
    );
}

async fn authenticate(
    state: &AppState,
    token: Option<&str>,
) -> Result<AuthenticatedUser, String> {
    let token = token.ok_or_else(|| "missing token".to_string())?;
    state
        .verifier
        .verify(token)
        .await
        .map_err(|e| e.message)
}
