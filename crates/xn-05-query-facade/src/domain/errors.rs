//! Query errors.

use shared_types::ConnectionError;
use thiserror::Error;
use xn_01_connection_manager::LedgerError;
use xn_03_operation_codec::DecodingError;

/// A read that could not be answered.
///
/// "No such document" is not an error; it is `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("ledger query failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("stored document is unreadable: {0}")]
    Decoding(#[from] DecodingError),
}

impl QueryError {
    /// Whether the node could not be reached at all.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            QueryError::Ledger(LedgerError::Connection(
                ConnectionError::NotConnected
                    | ConnectionError::Lost
                    | ConnectionError::Unreachable { .. }
            )) | QueryError::Ledger(LedgerError::Timeout { .. })
        )
    }
}
