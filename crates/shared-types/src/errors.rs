//! # Error Types
//!
//! Connection and account failures reported by more than one component.

use crate::entities::AccountAddress;
use thiserror::Error;

/// Errors establishing or keeping the ledger connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// The node could not be reached within the connect timeout.
    #[error("Node unreachable at {node}: {reason}")]
    Unreachable { node: String, reason: String },

    /// The node's interface metadata is incompatible with this client.
    #[error("Protocol mismatch: {reason}")]
    ProtocolMismatch { reason: String },

    /// The connection dropped while work was in flight.
    #[error("Connection lost")]
    Lost,

    /// No connection has been established.
    #[error("Not connected")]
    NotConnected,

    /// A connection is already active for this manager.
    #[error("Already connected to {node}")]
    AlreadyConnected { node: String },
}

/// Errors from the account provider and signer resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    /// No signing provider is available in the environment.
    #[error("No signing provider available for {app_name}")]
    NoProvider { app_name: String },

    /// The address is not in the current account snapshot.
    #[error("Account not found: {address}")]
    AccountNotFound { address: AccountAddress },

    /// The signer declined to sign (e.g. user cancellation).
    #[error("Signing rejected: {reason}")]
    SigningRejected { reason: String },
}
