use serde::Deserialize;

use churn_api::CollectionKind;

use crate::error::ConfigError;
use crate::sampling::SamplingPolicy;

// ═══════════════════════════════════════════════════════════════
//  Workload Config
// ═══════════════════════════════════════════════════════════════

/// Конфигурация workload engine: коллекции, seed, паузы, sampling.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    /// Коллекции, для каждой запускаются insert/update/delete циклы.
    #[serde(default = "default_collections")]
    pub collections: Vec<CollectionKind>,
    /// Seed для PRNG. Без указания — энтропия ОС.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Пауза после ошибки итерации, мс.
    #[serde(default = "default_failure_pause_ms")]
    pub failure_pause_ms: u64,
    #[serde(default)]
    pub sampling: SamplingPolicy,
}

fn default_collections() -> Vec<CollectionKind> {
    CollectionKind::ALL.to_vec()
}
fn default_failure_pause_ms() -> u64 {
    1000
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            collections: default_collections(),
            seed: None,
            failure_pause_ms: default_failure_pause_ms(),
            sampling: SamplingPolicy::default(),
        }
    }
}

impl WorkloadConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collections.is_empty() {
            return Err(ConfigError::NoCollections);
        }
        self.sampling.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::Strategy;

    #[test]
    fn defaults_cover_all_collections() {
        let cfg: WorkloadConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.collections, CollectionKind::ALL.to_vec());
        assert_eq!(cfg.failure_pause_ms, 1000);
        assert_eq!(cfg.sampling, SamplingPolicy::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_sampling_override_keeps_other_defaults() {
        let cfg: WorkloadConfig = serde_json::from_str(
            r#"{
                "collections": ["dummyuser", "sales"],
                "seed": 7,
                "sampling": {
                    "insert": {
                        "batch": {"strategy": "uniform", "min": 1, "max": 5},
                        "delay": {"strategy": "uniform", "min": 100, "max": 500}
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.collections, vec![CollectionKind::UserProfile, CollectionKind::Sales]);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.sampling.insert.batch, Strategy::Uniform { min: 1, max: 5 });
        assert_eq!(cfg.sampling.update, SamplingPolicy::default().update);
    }

    #[test]
    fn empty_collections_rejected() {
        let cfg = WorkloadConfig { collections: vec![], ..Default::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::NoCollections)));
    }
}
