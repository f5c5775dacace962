//! WebSocket fan-out of relay events.

use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use churn_api::{BroadcastEvent, BroadcastSink};

mod ws;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("bind ws :{port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("axum serve: {0}")]
    Serve(#[source] std::io::Error),
}

// ═══════════════════════════════════════════════════════════════
//  WsBroadcaster
// ═══════════════════════════════════════════════════════════════

/// `BroadcastSink` поверх `tokio::sync::broadcast`: каждое событие
/// получают все подключенные клиенты.
///
/// `emit` never blocks. With no clients the event is discarded; a client
/// that falls more than `buffer` events behind skips ahead.
#[derive(Clone)]
pub struct WsBroadcaster {
    tx: broadcast::Sender<BroadcastEvent>,
}

impl WsBroadcaster {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl BroadcastSink for WsBroadcaster {
    fn emit(&self, event: BroadcastEvent) {
        // Err только если нет подписчиков
        let _ = self.tx.send(event);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Server
// ═══════════════════════════════════════════════════════════════

#[derive(Clone)]
struct AppState {
    broadcaster: WsBroadcaster,
    shutdown: CancellationToken,
}

/// `shutdown` также закрывает уже открытые WS соединения.
pub fn router(broadcaster: WsBroadcaster, shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/ws", get(ws::handle_ws))
        .with_state(AppState { broadcaster, shutdown })
}

/// WebSocket сервер, `GET /ws`. Завершается по `shutdown`.
pub async fn run(
    port: u16,
    broadcaster: WsBroadcaster,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|source| ServerError::Bind { port, source })?;
    tracing::info!(port, "broadcast server listening");
    serve(listener, broadcaster, shutdown).await
}

/// Как [`run`], но на уже привязанном listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    broadcaster: WsBroadcaster,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    axum::serve(listener, router(broadcaster, shutdown.clone()))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(ServerError::Serve)?;

    tracing::info!("broadcast server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(n: i64) -> BroadcastEvent {
        BroadcastEvent {
            event: "newData".into(),
            collection: "sales".into(),
            ts_ms: n,
            payload: json!({"documentId": format!("{n:024x}")}),
        }
    }

    #[tokio::test]
    async fn every_client_gets_every_event() {
        let b = WsBroadcaster::new(16);
        let mut a = b.subscribe();
        let mut c = b.subscribe();
        assert_eq!(b.client_count(), 2);

        b.emit(event(1));
        b.emit(event(2));

        for rx in [&mut a, &mut c] {
            assert_eq!(rx.recv().await.unwrap().ts_ms, 1);
            assert_eq!(rx.recv().await.unwrap().ts_ms, 2);
        }
    }

    #[tokio::test]
    async fn emit_without_clients_is_silent() {
        let b = WsBroadcaster::new(4);
        b.emit(event(1));
        let mut late = b.subscribe();
        b.emit(event(2));
        assert_eq!(late.recv().await.unwrap().ts_ms, 2);
    }

    #[tokio::test]
    async fn slow_client_skips_ahead() {
        let b = WsBroadcaster::new(2);
        let mut rx = b.subscribe();
        for n in 0..5 {
            b.emit(event(n));
        }
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Lagged(3))));
        assert_eq!(rx.recv().await.unwrap().ts_ms, 3);
    }

    #[tokio::test]
    async fn serve_stops_on_cancel() {
        let token = CancellationToken::new();
        let server = tokio::spawn(run(0, WsBroadcaster::new(4), token.clone()));
        token.cancel();
        let res = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(res.is_ok());
    }
}
