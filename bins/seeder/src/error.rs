#[derive(Debug, thiserror::Error)]
pub enum SeederError {
    #[error("config ({context}): {detail}")]
    Config { context: String, detail: String },

    #[error("workload: {0}")]
    Workload(#[from] workload::ConfigError),

    #[error("relay: {0}")]
    Relay(#[from] change_relay::RelayError),

    #[error("{0}")]
    Server(#[from] broadcast_server::ServerError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
