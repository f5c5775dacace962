//! Synthetic write workload: sampling policy, record generators, and the
//! per-collection insert/update/delete loops driven by [`WorkloadEngine`].

pub mod config;
pub mod error;
pub mod faker;
pub mod generator;
pub mod sampling;
mod engine;
mod operation;
mod stats;

pub use config::WorkloadConfig;
pub use engine::{LoopReport, WorkloadEngine};
pub use error::{ConfigError, GenerationError, LoopError};
pub use faker::{Faker, SeededFaker};
pub use operation::{OperationLoop, DEFAULT_FAILURE_PAUSE};
pub use sampling::{OperationSampling, SamplingPolicy, Strategy};
pub use stats::{LoopStats, LoopStatsSnapshot};
