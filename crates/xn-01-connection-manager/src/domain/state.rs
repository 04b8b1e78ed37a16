//! Connection lifecycle.

use std::fmt;

/// Lifecycle of a connection.
///
/// ```text
/// Connected ──→ Disconnected   (explicit disconnect)
///     │
///     └──────→ Lost            (transport closed underneath us)
/// ```
///
/// Both exits are final; a new `connect` creates a new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Lost,
}

impl ConnectionState {
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Lost => "lost",
        };
        f.write_str(name)
    }
}
