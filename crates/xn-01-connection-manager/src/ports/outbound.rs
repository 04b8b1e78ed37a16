//! Outbound ports for the Connection Manager.
//!
//! A `LedgerConnector` opens a channel to a node; the `LedgerTransport` it
//! returns carries every request and subscription over that one channel.

use async_trait::async_trait;
use shared_bus::NotificationRouter;
use shared_types::{AccountAddress, LedgerMetadata, SubmissionHandle};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by a transport adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The node could not be reached.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The node refused the request.
    #[error("rejected: {reason}")]
    Rejected { reason: String },

    /// The channel is closed.
    #[error("channel closed")]
    Closed,

    /// The node sent something unexpected.
    #[error("protocol: {0}")]
    Protocol(String),

    /// The adapter gave up waiting.
    #[error("timed out")]
    Timeout,
}

/// Opens channels to ledger nodes.
#[async_trait]
pub trait LedgerConnector: Send + Sync {
    /// Open a persistent duplex channel to `node_address`.
    async fn open(&self, node_address: &str) -> Result<Arc<dyn LedgerTransport>, TransportError>;
}

/// One open channel to a ledger node.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Interface metadata advertised by the node.
    async fn metadata(&self) -> Result<LedgerMetadata, TransportError>;

    /// The account index the next extrinsic from `account` must carry.
    async fn next_nonce(&self, account: &AccountAddress) -> Result<u64, TransportError>;

    /// Submit an encoded extrinsic and watch its status.
    ///
    /// Returns once the node has accepted the submission into its pool.
    /// Every status notification for it is then published to `publisher`
    /// under `handle`; the adapter stops forwarding once `publish` reports
    /// the route is gone.
    async fn submit_and_watch(
        &self,
        handle: SubmissionHandle,
        extrinsic: Vec<u8>,
        publisher: NotificationRouter,
    ) -> Result<(), TransportError>;

    /// The encoded document stored for `did`, if any.
    async fn query_document(&self, did: &AccountAddress)
        -> Result<Option<Vec<u8>>, TransportError>;

    /// Resolves when the channel has closed, for whatever reason.
    async fn closed(&self);

    /// Close the channel.
    async fn close(&self);
}
