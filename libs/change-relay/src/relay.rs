use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use churn_api::{
    now_ms, BroadcastEvent, BroadcastSink, ChangeStream, CollectionKind, DocumentStore,
};

use crate::projection::project;
use crate::{RelayConfig, RelayError};

/// Счётчики relay, общие для всех его задач.
#[derive(Debug, Default)]
pub struct RelayStats {
    forwarded: AtomicU64,
    dropped: AtomicU64,
}

impl RelayStats {
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Payloads lost to a full queue.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// `handle` завершается после всех задач relay. Abort останавливает их сразу.
pub struct RelayHandle {
    pub handle: JoinHandle<()>,
    pub stats: Arc<RelayStats>,
}

// ═══════════════════════════════════════════════════════════════
//  Relay — change streams → projection → queue → sink.emit()
// ═══════════════════════════════════════════════════════════════

/// Запустить relay: открыть по одной подписке на каждую коллекцию из
/// `config.watch`, проецировать события и отдавать их в `sink`.
///
/// Subscriptions are opened before this returns, so every change made
/// afterwards is observed. Failing to open one is a startup error; a feed
/// that breaks later is logged and ends only that subscription.
///
/// Subscription tasks push into a bounded queue drained by one emitter task.
/// A full queue drops the payload with a warning. On cancellation the
/// subscriptions stop and the emitter flushes what is already queued.
pub async fn spawn_relay(
    store: Arc<dyn DocumentStore>,
    sink: Arc<dyn BroadcastSink>,
    config: &RelayConfig,
    token: CancellationToken,
) -> Result<RelayHandle, RelayError> {
    config.validate()?;

    let mut kinds: Vec<CollectionKind> = Vec::new();
    for &kind in &config.watch {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    let mut subscriptions: Vec<(CollectionKind, Box<dyn ChangeStream>)> = Vec::new();
    for kind in kinds {
        let stream = store.watch(kind.name()).await.map_err(|e| RelayError::Watch {
            collection: kind.name().to_string(),
            source: e,
        })?;
        subscriptions.push((kind, stream));
    }

    let stats = Arc::new(RelayStats::default());
    let (tx, rx) = mpsc::channel::<BroadcastEvent>(config.queue_size);

    // Задачи живут в JoinSet внешней задачи: abort() хэндла роняет и их.
    let mut tasks = JoinSet::new();
    for (kind, stream) in subscriptions {
        tasks.spawn(subscription_task(kind, stream, tx.clone(), stats.clone(), token.clone()));
    }
    drop(tx);
    tasks.spawn(emitter_task(rx, sink, stats.clone()));

    let task_stats = stats.clone();
    let handle = tokio::spawn(async move {
        while tasks.join_next().await.is_some() {}
        tracing::info!(
            forwarded = task_stats.forwarded(),
            dropped = task_stats.dropped(),
            "relay stopped"
        );
    });

    Ok(RelayHandle { handle, stats })
}

async fn subscription_task(
    kind: CollectionKind,
    mut stream: Box<dyn ChangeStream>,
    tx: mpsc::Sender<BroadcastEvent>,
    stats: Arc<RelayStats>,
    token: CancellationToken,
) {
    let collection = kind.name();
    tracing::info!(collection, "watching change feed");

    loop {
        tokio::select! {
            next = stream.next() => match next {
                Some(Ok(change)) => {
                    let (class, payload) = project(kind, &change);
                    let event = BroadcastEvent {
                        event: class.event_name().to_string(),
                        collection: collection.to_string(),
                        ts_ms: now_ms(),
                        payload,
                    };
                    match tx.try_send(event) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            stats.dropped.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(collection, seq = change.seq, "relay queue full, dropping event");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
                Some(Err(e)) => {
                    tracing::error!(collection, error = ?e, "change feed failed, subscription closed");
                    break;
                }
                None => {
                    tracing::info!(collection, "change feed ended");
                    break;
                }
            },
            _ = token.cancelled() => break,
        }
    }
}

async fn emitter_task(
    mut rx: mpsc::Receiver<BroadcastEvent>,
    sink: Arc<dyn BroadcastSink>,
    stats: Arc<RelayStats>,
) {
    while let Some(event) = rx.recv().await {
        tracing::debug!(event = %event.event, collection = %event.collection, "emit");
        sink.emit(event);
        stats.forwarded.fetch_add(1, Ordering::Relaxed);
    }
}
