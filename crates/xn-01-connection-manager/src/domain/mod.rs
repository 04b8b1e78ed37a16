pub mod config;
pub mod errors;
pub mod state;

pub use config::{ConfigError, ConnectionConfig, DEFAULT_NODE_URL};
pub use errors::LedgerError;
pub use state::ConnectionState;
