use axum::{routing::get, Router};

use crate::handler::socket_handler::{socket_handler, SocketState};

/// Authentication is optional here; a `?token=` joins the caller's rooms.
pub fn socket_router(state: SocketState) -> Router {
    Router::new().route("/socket", get(socket_handler)).with_state(state)
}
