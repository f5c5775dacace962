use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use churn_api::{CollectionKind, DocumentStore, Filter, OperationKind};

use crate::error::LoopError;
use crate::faker::Faker;
use crate::generator;
use crate::sampling::SamplingPolicy;
use crate::stats::LoopStats;

/// Пауза после неудачной итерации.
pub const DEFAULT_FAILURE_PAUSE: Duration = Duration::from_millis(1000);

// ═══════════════════════════════════════════════════════════════
//  OperationLoop
// ═══════════════════════════════════════════════════════════════

/// One (collection, operation) control loop:
///
/// `SAMPLE → EXECUTE → SUCCESS_PAUSE | FAILURE_PAUSE → SAMPLE …`
///
/// Batches are strictly sequential. Errors never end the loop; only the
/// cancellation token does, and it is observed at the pause boundary so an
/// in-flight batch always completes.
pub struct OperationLoop {
    collection: CollectionKind,
    op: OperationKind,
    store: Arc<dyn DocumentStore>,
    policy: Arc<SamplingPolicy>,
    faker: Box<dyn Faker>,
    failure_pause: Duration,
    stats: Arc<LoopStats>,
}

impl OperationLoop {
    pub fn new(
        collection: CollectionKind,
        op: OperationKind,
        store: Arc<dyn DocumentStore>,
        policy: Arc<SamplingPolicy>,
        faker: Box<dyn Faker>,
    ) -> Self {
        Self {
            collection,
            op,
            store,
            policy,
            faker,
            failure_pause: DEFAULT_FAILURE_PAUSE,
            stats: Arc::new(LoopStats::default()),
        }
    }

    pub fn with_failure_pause(mut self, pause: Duration) -> Self {
        self.failure_pause = pause;
        self
    }

    pub fn stats(&self) -> Arc<LoopStats> {
        self.stats.clone()
    }

    pub fn collection(&self) -> CollectionKind {
        self.collection
    }

    pub fn op(&self) -> OperationKind {
        self.op
    }

    /// Run until `token` is cancelled.
    pub async fn run(mut self, token: CancellationToken) {
        let collection = self.collection.name();
        let op = self.op;
        tracing::info!(collection, %op, "operation loop started");

        while !token.is_cancelled() {
            let batch = self.policy.batch_size(op, self.faker.as_mut());

            let pause = match self.execute(batch).await {
                Ok(n) => {
                    self.stats.record_success(n);
                    tracing::debug!(collection, %op, batch, count = n, "batch applied");
                    self.policy.delay(op, self.faker.as_mut())
                }
                Err(e) => {
                    self.stats.record_failure(&e);
                    tracing::error!(collection, %op, batch, error = %e, "batch failed, pausing");
                    self.failure_pause
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = token.cancelled() => break,
            }
        }

        tracing::info!(collection, %op, "operation loop stopped");
    }

    /// One EXECUTE step. Returns the number of documents written.
    ///
    /// Update/delete apply point updates one by one; an error midway keeps
    /// the ones already applied.
    pub async fn execute(&mut self, batch: usize) -> Result<usize, LoopError> {
        let name = self.collection.name();
        let now = chrono::Utc::now();

        match self.op {
            OperationKind::Insert => {
                let docs = generator::generate_batch(self.collection, batch, self.faker.as_mut(), now)?;
                let ids = self.store.insert_many(name, docs).await?;
                Ok(ids.len())
            }
            OperationKind::Update => {
                let targets = self.store.find(name, &Filter::not_deleted(), batch).await?;
                let mut applied = 0;
                for target in targets {
                    let fields = generator::mutation(self.collection, self.faker.as_mut(), now)?;
                    if self.store.update(name, &target.id, fields).await?.matched {
                        applied += 1;
                    }
                }
                Ok(applied)
            }
            OperationKind::Delete => {
                let targets = self.store.find(name, &Filter::not_deleted(), batch).await?;
                let mut applied = 0;
                for target in targets {
                    let fields = generator::soft_delete(now)?;
                    if self.store.update(name, &target.id, fields).await?.matched {
                        applied += 1;
                    }
                }
                Ok(applied)
            }
        }
    }
}
