use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use change_relay::RelayConfig;
use churn_api::CollectionKind;
use storage_memory::MemoryStoreConfig;
use workload::{SamplingPolicy, WorkloadConfig};

use crate::error::SeederError;

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Parser, Clone, Debug, Default)]
#[command(name = "churn-seeder", about = "Синтетическая нагрузка на коллекции + relay change feed")]
pub struct Cli {
    /// Путь к config.toml
    #[arg(long, default_value = "seeder.toml", env = "CHURN_CONFIG")]
    pub config: String,

    /// Seed для PRNG. Без указания — энтропия ОС
    #[arg(long, env = "CHURN_SEED")]
    pub seed: Option<u64>,

    /// Коллекции через запятую (user-profile|dummyuser, geolocation, sales)
    #[arg(long, value_delimiter = ',')]
    pub collections: Vec<String>,

    /// Порт WebSocket сервера
    #[arg(long, env = "CHURN_WS_PORT")]
    pub ws_port: Option<u16>,

    /// Пауза после ошибки итерации, мс
    #[arg(long)]
    pub failure_pause_ms: Option<u64>,

    /// Равномерные диапазоны батчей/пауз вместо sampling из config
    #[arg(long)]
    pub uniform_sampling: bool,

    /// Не запускать relay и WebSocket сервер
    #[arg(long)]
    pub no_relay: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub store: MemoryStoreConfig,
    pub ws_port: Option<u16>,
    pub ws_buffer: Option<usize>,
    pub shutdown_grace_ms: Option<u64>,
}

pub fn load_config(path: &str) -> Result<Config, SeederError> {
    let content = std::fs::read_to_string(path).map_err(|e| SeederError::Config {
        context: path.to_string(),
        detail: format!("cannot read: {e}"),
    })?;
    toml::from_str(&content).map_err(|e| SeederError::Config {
        context: path.to_string(),
        detail: e.to_string(),
    })
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

/// Итоговая конфигурация после мержа: config.toml < env/CLI
#[derive(Debug)]
pub struct Effective {
    pub workload: WorkloadConfig,
    pub relay: Option<RelayConfig>,
    pub store: MemoryStoreConfig,
    pub ws_port: u16,
    pub ws_buffer: usize,
    pub shutdown_grace: Duration,
}

impl Effective {
    pub fn new(cli: &Cli) -> Result<Self, SeederError> {
        let cfg = match load_config(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&cli.config).exists() {
                    return Err(e);
                }
                tracing::info!(path = %cli.config, "no config file, using defaults");
                Config::default()
            }
        };
        Self::merge(cli, cfg)
    }

    pub fn merge(cli: &Cli, cfg: Config) -> Result<Self, SeederError> {
        let mut workload = cfg.workload;
        if cli.seed.is_some() {
            workload.seed = cli.seed;
        }
        if let Some(ms) = cli.failure_pause_ms {
            workload.failure_pause_ms = ms;
        }
        if cli.uniform_sampling {
            workload.sampling = SamplingPolicy::uniform();
        }
        if !cli.collections.is_empty() {
            workload.collections = parse_collections(&cli.collections)?;
        }
        workload.validate()?;

        let relay = if cli.no_relay {
            None
        } else {
            cfg.relay.validate()?;
            Some(cfg.relay)
        };

        Ok(Self {
            workload,
            relay,
            store: cfg.store,
            ws_port: cli.ws_port.or(cfg.ws_port).unwrap_or(3000),
            ws_buffer: cfg.ws_buffer.unwrap_or(1024),
            shutdown_grace: Duration::from_millis(cfg.shutdown_grace_ms.unwrap_or(2000)),
        })
    }
}

fn parse_collections(names: &[String]) -> Result<Vec<CollectionKind>, SeederError> {
    names
        .iter()
        .map(|n| {
            CollectionKind::from_name(n.trim()).ok_or_else(|| SeederError::Config {
                context: "--collections".into(),
                detail: format!("unknown collection '{n}'"),
            })
        })
        .collect()
}
