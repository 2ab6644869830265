use crate::RelayService;
use axum::Json;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use parley_core::Identity;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(identity): Path<String>,
    State(service): State<RelayService>,
) -> Response {
    let identity = match Identity::parse(identity) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejecting connection: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, identity, service))
}

async fn handle_socket(socket: WebSocket, identity: Identity, service: RelayService) {
    info!("New WebSocket connection: {}", identity);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let link = service.register(identity.clone(), tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let identity = identity.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => service.forward(&identity, text.as_str()),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // A replaced link must not take its successor down with it.
    if service.unregister(&identity, link) {
        service.broadcast_peer_left(&identity);
        info!("WebSocket disconnected: {}", identity);
    } else {
        info!("Superseded link for {} closed", identity);
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn online(State(service): State<RelayService>) -> Json<Vec<Identity>> {
    Json(service.online())
}
