use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;

use crate::adapters::http::state::HttpState;
use crate::domain::stream::WsFrameMetaMessage;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(st): State<HttpState>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, st))
}

/// Visor en vivo: por cada frame nuevo del buzón se envía un mensaje de
/// texto con los metadatos y el JPEG en binario. Mejor-esfuerzo: un frame
/// pisado antes de leerse simplemente no se emite.
async fn handle_socket(mut socket: WebSocket, st: HttpState) {
    let mut rx = match st.monitor.subscribe().await {
        Ok(r) => r,
        Err(_) => return,
    };

    while rx.changed().await.is_ok() {
        let latest = rx.borrow_and_update().clone();
        let Some((meta, jpeg)) = latest else { continue };

        let json = serde_json::to_string(&WsFrameMetaMessage {
            r#type: "frame".into(),
            meta,
        })
        .unwrap_or_default();

        if socket.send(Message::Text(json)).await.is_err() {
            break;
        }
        if socket.send(Message::Binary(jpeg)).await.is_err() {
            break;
        }
    }
}
