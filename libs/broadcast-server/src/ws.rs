use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use churn_api::{BroadcastEvent, CollectionKind};

use super::AppState;

// ═══════════════════════════════════════════════════════════════
//  WebSocket: /ws
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_ws(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(socket, state))
}

// ═══════════════════════════════════════════════════════════════
//  Protocol types
// ═══════════════════════════════════════════════════════════════

/// Клиентское сообщение. Без подписок клиент получает все коллекции.
#[derive(Debug, Deserialize)]
struct WsAction {
    action: String,
    #[serde(default)]
    collection: String,
}

/// Collections a client narrowed itself to. Empty means all.
#[derive(Debug, Default)]
pub(crate) struct CollectionFilter {
    names: HashSet<String>,
}

impl CollectionFilter {
    pub(crate) fn wants(&self, event: &BroadcastEvent) -> bool {
        self.names.is_empty() || self.names.contains(&event.collection)
    }

    fn apply(&mut self, action: &WsAction) -> Result<(), String> {
        let kind = CollectionKind::from_name(&action.collection)
            .ok_or_else(|| format!("unknown collection '{}'", action.collection))?;
        match action.action.as_str() {
            "subscribe" => {
                self.names.insert(kind.name().to_string());
            }
            "unsubscribe" => {
                self.names.remove(kind.name());
            }
            other => return Err(format!("unknown action '{other}'")),
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Connection handler
// ═══════════════════════════════════════════════════════════════

async fn ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.broadcaster.subscribe();
    let mut filter = CollectionFilter::default();
    tracing::debug!(clients = state.broadcaster.client_count(), "ws client connected");

    loop {
        tokio::select! {
            biased;

            _ = state.shutdown.cancelled() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }

            msg = socket.recv() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    _ => break,
                };

                let text = match msg {
                    Message::Text(t) => t,
                    Message::Close(_) => break,
                    _ => continue,
                };

                let result = serde_json::from_str::<WsAction>(&text)
                    .map_err(|e| format!("parse: {e}"))
                    .and_then(|action| filter.apply(&action));
                if let Err(e) = result {
                    let body = serde_json::json!({ "error": e }).to_string();
                    if socket.send(Message::Text(body.into())).await.is_err() {
                        break;
                    }
                }
            }

            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if !filter.wants(&event) {
                            continue;
                        }
                        if let Ok(json) = serde_json::to_string(&event) {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "ws client lagging, events skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws client disconnected");
}
