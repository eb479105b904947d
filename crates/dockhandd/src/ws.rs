//! WebSocket log streaming
//!
//! `/ws/logs/:name?file=…&search=…` upgrades to a socket that receives one
//! log line per text message, starting with lines appended after the
//! subscription. The subscription is cancelled when either side closes.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use dockhand_logs::Subscription;

use crate::routes::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    file: String,
    #[serde(default)]
    search: String,
}

pub async fn ws_logs(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<WsQuery>,
) -> Response {
    // validate before the upgrade so bad requests still get a 400
    match state.engine.follow(&name, &query.file, &query.search) {
        Ok(subscription) => {
            ws.on_upgrade(move |socket| stream_lines(socket, subscription))
        }
        Err(e) => ApiError(e).into_response(),
    }
}

async fn stream_lines(mut socket: WebSocket, subscription: Subscription) {
    loop {
        tokio::select! {
            line = subscription.recv() => {
                match line {
                    Some(line) => {
                        if socket.send(Message::Text(line)).await.is_err() {
                            break;
                        }
                    }
                    // subscription closed by engine shutdown
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!("websocket receive error: {}", e);
                        break;
                    }
                    // pings are answered by axum; other messages are ignored
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    subscription.cancel();
    let _ = socket.send(Message::Close(None)).await;
}
