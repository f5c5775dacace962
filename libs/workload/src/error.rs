use churn_api::StoreError;

/// Ошибка генерации документа. При ограниченных генераторах не должна
/// возникать; если возникла — текущая итерация уходит в failure pause.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("record did not serialize to an object")]
    NotAnObject,
}

/// Failure of one EXECUTE step of an operation loop.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("generation: {0}")]
    Generation(#[from] GenerationError),
}

/// Invalid workload configuration, rejected before any loop starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{what}: min {min} > max {max}")]
    InvertedBounds { what: String, min: i64, max: i64 },

    #[error("{what}: stddev must be >= 0, got {stddev}")]
    NegativeStddev { what: String, stddev: f64 },

    #[error("{what}: lower bound must be >= {floor}, got {min}")]
    BelowFloor { what: String, floor: i64, min: i64 },

    #[error("no collections configured")]
    NoCollections,
}
