//! Change feed relay: store change streams → subscriber payloads.

mod config;
mod error;
pub mod projection;
mod relay;

pub use config::RelayConfig;
pub use error::RelayError;
pub use projection::{classify, project, Classification};
pub use relay::{spawn_relay, RelayHandle, RelayStats};
