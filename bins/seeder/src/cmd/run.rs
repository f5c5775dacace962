use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use broadcast_server::WsBroadcaster;
use churn_api::DocumentStore;
use storage_memory::MemoryStore;
use workload::WorkloadEngine;

use crate::config::Effective;
use crate::error::SeederError;

pub async fn run(eff: Effective) -> Result<(), SeederError> {
    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();

    let memory = MemoryStore::new(eff.store.clone());
    let store: Arc<dyn DocumentStore> = Arc::new(memory.clone());

    // --- Relay + WebSocket fan-out ---
    let mut relay = None;
    let mut ws_handle: Option<JoinHandle<()>> = None;
    if let Some(relay_cfg) = &eff.relay {
        let broadcaster = WsBroadcaster::new(eff.ws_buffer);

        // bind заранее: ошибка порта фатальна до старта нагрузки
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", eff.ws_port))
            .await
            .map_err(|source| broadcast_server::ServerError::Bind { port: eff.ws_port, source })?;
        let ws_token = token.clone();
        let ws_broadcaster = broadcaster.clone();
        ws_handle = Some(tokio::spawn(async move {
            if let Err(e) = broadcast_server::serve(listener, ws_broadcaster, ws_token).await {
                tracing::error!(error = %e, "broadcast server error");
            }
        }));
        tracing::info!(port = eff.ws_port, "broadcast server (ws) listening");

        relay = Some(
            change_relay::spawn_relay(store.clone(), Arc::new(broadcaster), relay_cfg, token.clone())
                .await?,
        );
    }

    // --- Workload loops ---
    let mut engine = WorkloadEngine::new(store, &eff.workload);
    let handles = engine.start(&eff.workload.collections, &token);
    tracing::info!(loops = engine.loop_count(), seed = ?eff.workload.seed, "seeder ready");

    // --- Ожидание Ctrl+C ---
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down...");

    token.cancel();

    // Drain: loops stop at their next pause boundary
    let deadline = tokio::time::Instant::now() + eff.shutdown_grace;
    while tokio::time::Instant::now() < deadline
        && !(handles.iter().all(JoinHandle::is_finished)
            && relay.as_ref().is_none_or(|r| r.handle.is_finished())
            && ws_handle.as_ref().is_none_or(JoinHandle::is_finished))
    {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    // Abort anything still running
    for h in &handles {
        if !h.is_finished() {
            h.abort();
        }
    }
    if let Some(r) = &relay {
        if !r.handle.is_finished() {
            r.handle.abort();
        }
    }

    if let Some(h) = &ws_handle {
        if !h.is_finished() {
            h.abort();
        }
    }

    for h in handles {
        let _ = h.await;
    }
    if let Some(r) = relay {
        let _ = r.handle.await;
    }
    if let Some(h) = ws_handle {
        let _ = h.await;
    }

    for report in engine.reports() {
        tracing::info!(
            collection = %report.collection,
            op = %report.op,
            iterations = report.stats.iterations,
            failures = report.stats.failures,
            documents = report.stats.documents,
            last_error = report.stats.last_error.as_deref().unwrap_or(""),
            "loop stats"
        );
    }

    memory.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}
