//! Request-level errors.

use shared_types::ConnectionError;
use std::time::Duration;
use thiserror::Error;
use xn_03_operation_codec::EncodingError;

/// Errors from a request made over a live connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The connection is not usable.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The node refused the request (bad nonce, bad signature, pool full).
    #[error("Rejected by node: {reason}")]
    Rejected { reason: String },

    /// No response within the request timeout.
    #[error("No response after {after:?}")]
    Timeout { after: Duration },

    /// The node answered with something this client cannot interpret.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The request could not be encoded.
    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodingError),
}
