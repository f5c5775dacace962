use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use churn_api::{CollectionKind, DocumentStore, OperationKind};

use crate::config::WorkloadConfig;
use crate::faker::{Faker, SeededFaker};
use crate::operation::OperationLoop;
use crate::sampling::SamplingPolicy;
use crate::stats::{LoopStats, LoopStatsSnapshot};

/// Per-loop seed spacing (golden-ratio increment, as in splitmix64).
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Counters of one running loop, tagged with what it drives.
#[derive(Debug, Clone, Serialize)]
pub struct LoopReport {
    pub collection: CollectionKind,
    pub op: OperationKind,
    #[serde(flatten)]
    pub stats: LoopStatsSnapshot,
}

// ═══════════════════════════════════════════════════════════════
//  WorkloadEngine
// ═══════════════════════════════════════════════════════════════

/// Владеет всеми operation loops и запускает их.
///
/// Each loop is its own tokio task: a failure or panic in one never reaches
/// its siblings. Stopping is done by cancelling the token passed to
/// [`WorkloadEngine::start`].
pub struct WorkloadEngine {
    store: Arc<dyn DocumentStore>,
    policy: Arc<SamplingPolicy>,
    failure_pause: Duration,
    seed: Option<u64>,
    loops: Vec<(CollectionKind, OperationKind, Arc<LoopStats>)>,
}

impl WorkloadEngine {
    pub fn new(store: Arc<dyn DocumentStore>, config: &WorkloadConfig) -> Self {
        Self {
            store,
            policy: Arc::new(config.sampling.clone()),
            failure_pause: Duration::from_millis(config.failure_pause_ms),
            seed: config.seed,
            loops: Vec::new(),
        }
    }

    fn faker_for(&self, index: usize) -> Box<dyn Faker> {
        match self.seed {
            Some(seed) => Box::new(SeededFaker::seeded(
                seed.wrapping_add(SEED_STRIDE.wrapping_mul(index as u64 + 1)),
            )),
            None => Box::new(SeededFaker::from_entropy()),
        }
    }

    /// Launch insert, update and delete loops for every collection.
    /// Duplicates in `collections` are started once.
    pub fn start(
        &mut self,
        collections: &[CollectionKind],
        token: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        for &collection in collections {
            if self.loops.iter().any(|(c, _, _)| *c == collection) {
                tracing::warn!(%collection, "collection already running, skipping");
                continue;
            }

            for op in OperationKind::ALL {
                let faker = self.faker_for(self.loops.len());
                let op_loop = OperationLoop::new(
                    collection,
                    op,
                    self.store.clone(),
                    self.policy.clone(),
                    faker,
                )
                .with_failure_pause(self.failure_pause);

                self.loops.push((collection, op, op_loop.stats()));
                handles.push(tokio::spawn(op_loop.run(token.clone())));
            }
            tracing::info!(%collection, "workload loops spawned");
        }

        handles
    }

    pub fn reports(&self) -> Vec<LoopReport> {
        self.loops
            .iter()
            .map(|(collection, op, stats)| LoopReport {
                collection: *collection,
                op: *op,
                stats: stats.snapshot(),
            })
            .collect()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }
}
