//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to the pipeline. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "peeky_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "peeky_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply = handle_text(&txt, &state).await;
        if let Err(e) = socket.send(Message::Text(reply)).await {
          error!(target: "peeky_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "peeky_backend", "WebSocket disconnected");
}

/// Parse, dispatch, serialize. Always produces a reply.
pub(crate) async fn handle_text(txt: &str, state: &AppState) -> String {
  let reply_msg = match serde_json::from_str::<ClientWsMessage>(txt) {
    Ok(incoming) => {
      debug!(target: "peeky_backend", "WS received: {:?}", &incoming);
      handle_client_ws(incoming, state).await
    }
    Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
  };

  serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  })
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::GetQuestions { age_group, count, category, categories } => {
      let count = state.limits.effective_count(count);
      let questions = state.pipeline
        .get_questions(&age_group, count, category.as_deref(), &categories)
        .await;
      info!(target: "questions", %age_group, requested = count, served = questions.len(), "WS questions served");
      ServerWsMessage::Questions { questions }
    }
  }
}
