/// WebSocket endpoint for the notification relay
///
/// `GET /ws?token=<jwt>` — the token travels as a query parameter because
/// browser WebSocket clients cannot set an Authorization header. The
/// handshake validates the token and tenant scope before upgrading; a bad
/// token is rejected with 401 and a tenant-less account with 403, and no
/// socket is ever registered for them.
///
/// After the upgrade the connection is one-way: the task pumps relay
/// frames out and discards anything the client sends. Closing the socket
/// (or any transport error) deregisters the connection.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use taskhub_shared::auth::{
    authorization::require_tenant,
    middleware::{authenticate_token, AuthContext},
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: String,
}

/// Handshake: authenticate, then upgrade
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let auth = authenticate_token(&query.token, state.jwt_secret())?;
    let tenant_id = require_tenant(&auth)?;

    info!(user_id = %auth.user_id, %tenant_id, "WebSocket connection accepted");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, auth)))
}

/// Pumps relay frames into the socket until either side closes
async fn handle_socket(mut socket: WebSocket, state: AppState, auth: AuthContext) {
    // require_tenant already passed in the handshake
    let Some(tenant_id) = auth.tenant_id else {
        return;
    };

    let (handle, mut receiver) = state.relay.connect(auth.user_id, tenant_id);

    pump(&mut socket, &mut receiver).await;

    state.relay.disconnect(handle);
    debug!(user_id = %auth.user_id, "WebSocket connection closed");
}

async fn pump(socket: &mut WebSocket, receiver: &mut UnboundedReceiver<String>) {
    loop {
        tokio::select! {
            frame = receiver.recv() => {
                match frame {
                    Some(frame) => {
                        if socket.send(Message::Text(frame)).await.is_err() {
                            return;
                        }
                    }
                    // Registry entry replaced and dropped
                    None => return,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    // Inbound frames are ignored; the channel is push-only
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
