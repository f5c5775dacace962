use serde::Deserialize;

use churn_api::CollectionKind;

use crate::RelayError;

/// Конфигурация relay: какие коллекции слушать и размер очереди к sink.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_watch")]
    pub watch: Vec<CollectionKind>,
    /// Ёмкость очереди subscription tasks → emitter. При переполнении payload отбрасывается.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

fn default_watch() -> Vec<CollectionKind> {
    CollectionKind::ALL.to_vec()
}
fn default_queue_size() -> usize {
    1024
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { watch: default_watch(), queue_size: default_queue_size() }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.queue_size == 0 {
            return Err(RelayError::ZeroQueue);
        }
        if self.watch.is_empty() {
            return Err(RelayError::NothingToWatch);
        }
        Ok(())
    }
}
