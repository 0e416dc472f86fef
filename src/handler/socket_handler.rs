use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::middlewares::auth_middleware::authenticate_token;
use crate::service::notification_hub::{Envelope, NotificationHub, Rooms};
use crate::util::jwt::JwtTokenUtilsImpl;

#[derive(Clone)]
pub struct SocketState {
    pub hub: Arc<NotificationHub>,
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

pub async fn socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SocketState>,
    Query(query): Query<SocketQuery>,
) -> Response {
    let mut rooms = Rooms::default();
    if let Some(token) = query.token.as_deref().filter(|t| !t.is_empty()) {
        match authenticate_token(&state.jwt_utils, token) {
            Ok((_, actor)) => {
                rooms.join_user(actor.id.to_hex());
                rooms.join_role(actor.role);
            }
            Err(e) => return e.into_response(),
        }
    }
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| run_socket(socket, hub, rooms))
}

async fn run_socket(socket: WebSocket, hub: Arc<NotificationHub>, mut rooms: Rooms) {
    let (mut sink, mut stream) = socket.split();
    let mut events = hub.subscribe();
    info!("Realtime client connected");

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<Envelope>(text.as_str()) {
                    Ok(envelope) => hub.handle_client_event(&mut rooms, envelope),
                    Err(e) => debug!("Ignoring malformed client frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Socket read failed: {}", e);
                    break;
                }
            },
            dispatch = events.recv() => match dispatch {
                Ok(dispatch) => {
                    if !rooms.admits(&dispatch.audience) {
                        continue;
                    }
                    let frame = match serde_json::to_string(&dispatch.envelope) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("Failed to encode realtime frame: {}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Realtime client lagging, events skipped"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    info!("Realtime client disconnected");
}
