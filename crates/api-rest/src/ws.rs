//! WebSocket event stream.
//!
//! Each connection subscribes to the broadcast sink and receives every [`HospitalEvent`] as a
//! JSON text frame, e.g. `{"event":"room-assigned","data":{...}}`. Incoming frames are ignored
//! apart from close.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use hms_core::HospitalEvent;
use tokio::sync::broadcast::{self, error::RecvError};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let rx = state.events.subscribe();
    tracing::debug!(
        "WebSocket subscriber connected ({} total)",
        state.events.subscriber_count()
    );
    ws.on_upgrade(move |socket| stream_events(socket, rx))
}

async fn stream_events(mut socket: WebSocket, mut rx: broadcast::Receiver<HospitalEvent>) {
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let text = match event.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("Event serialization error: {:?}", e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("WebSocket subscriber lagged, {} events dropped", missed);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!("WebSocket subscriber disconnected");
}
