//! # Routed Notifications
//!
//! Types describing what flows through the router and why a route ends.

use serde::{Deserialize, Serialize};
use shared_types::{StatusEvent, SubmissionHandle};
use std::fmt;

/// A status notification tagged with the submission it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub handle: SubmissionHandle,
    pub event: StatusEvent,
}

/// Why a subscription stopped receiving notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// The route was released individually (watch finished or abandoned).
    Released,
    /// The underlying connection dropped.
    ConnectionLost,
    /// The client disconnected deliberately.
    Disconnected,
}

impl CloseReason {
    /// Whether the close was caused by the connection going away.
    #[must_use]
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, CloseReason::ConnectionLost | CloseReason::Disconnected)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::Released => "released",
            CloseReason::ConnectionLost => "connection lost",
            CloseReason::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failure_reasons() {
        assert!(CloseReason::ConnectionLost.is_connection_failure());
        assert!(CloseReason::Disconnected.is_connection_failure());
        assert!(!CloseReason::Released.is_connection_failure());
    }
}
