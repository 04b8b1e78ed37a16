//! # Connection Manager Service
//!
//! Owns the single live connection and hands out `ConnectionHandle`s that
//! borrow it.

use crate::domain::{ConnectionConfig, ConnectionState, LedgerError};
use crate::ports::{LedgerConnector, LedgerTransport, TransportError};
use shared_bus::{CloseReason, NotificationRouter, StatusSubscription};
use shared_types::{AccountAddress, ConnectionError, LedgerMetadata, SignedExtrinsic};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use xn_03_operation_codec::{check_compatibility, encode_extrinsic};

/// Establishes and tears down the connection to a ledger node.
///
/// At most one connection is active per manager. A second `connect` while the
/// first is live fails with `AlreadyConnected`.
pub struct ConnectionManager {
    connector: Arc<dyn LedgerConnector>,
    config: ConnectionConfig,
    active: Mutex<Option<ConnectionHandle>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn LedgerConnector>, config: ConnectionConfig) -> Self {
        Self {
            connector,
            config,
            active: Mutex::new(None),
        }
    }

    /// Connect to `node_address`.
    ///
    /// # Errors
    /// * `Unreachable` - the node did not answer within `connect_timeout`
    /// * `ProtocolMismatch` - the node's metadata is incompatible with the codec
    /// * `AlreadyConnected` - a live connection already exists
    pub async fn connect(&self, node_address: &str) -> Result<ConnectionHandle, ConnectionError> {
        let mut active = self.active.lock().await;
        if let Some(existing) = active.as_ref() {
            if existing.state().is_live() {
                return Err(ConnectionError::AlreadyConnected {
                    node: existing.node_address().to_string(),
                });
            }
        }

        let unreachable = |reason: String| ConnectionError::Unreachable {
            node: node_address.to_string(),
            reason,
        };

        info!(node = %node_address, "Connecting to ledger node");
        let transport =
            match timeout(self.config.connect_timeout, self.connector.open(node_address)).await {
                Ok(Ok(transport)) => transport,
                Ok(Err(e)) => return Err(unreachable(e.to_string())),
                Err(_) => {
                    return Err(unreachable(format!(
                        "no connection after {:?}",
                        self.config.connect_timeout
                    )))
                }
            };

        let metadata = match timeout(self.config.request_timeout, transport.metadata()).await {
            Ok(Ok(metadata)) => metadata,
            Ok(Err(TransportError::Protocol(reason) | TransportError::Rejected { reason })) => {
                transport.close().await;
                return Err(ConnectionError::ProtocolMismatch { reason });
            }
            Ok(Err(e)) => {
                transport.close().await;
                return Err(unreachable(e.to_string()));
            }
            Err(_) => {
                transport.close().await;
                return Err(unreachable("metadata request timed out".to_string()));
            }
        };

        if let Err(reason) = check_compatibility(&metadata) {
            warn!(node = %node_address, %reason, "Incompatible node");
            transport.close().await;
            return Err(ConnectionError::ProtocolMismatch { reason });
        }

        let handle =
            ConnectionHandle::establish(node_address, transport, metadata, self.config.clone());
        info!(
            node = %node_address,
            runtime = %handle.metadata().runtime,
            "Connected to ledger node"
        );
        *active = Some(handle.clone());
        Ok(handle)
    }

    /// Close the active connection, ending every open submission route.
    ///
    /// Returns `false` if there was nothing to close.
    pub async fn disconnect(&self) -> bool {
        let handle = self.active.lock().await.take();
        match handle {
            Some(handle) => {
                handle.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// The active connection, if any (live or not).
    pub async fn current(&self) -> Option<ConnectionHandle> {
        self.active.lock().await.clone()
    }
}

struct ConnectionInner {
    node_address: String,
    transport: Arc<dyn LedgerTransport>,
    router: NotificationRouter,
    state: watch::Sender<ConnectionState>,
    metadata: LedgerMetadata,
    config: ConnectionConfig,
}

impl ConnectionInner {
    /// Leave the `Connected` state. Only the first call has any effect.
    fn end(&self, state: ConnectionState, reason: CloseReason) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if current.is_live() {
                *current = state;
                true
            } else {
                false
            }
        });
        if changed {
            let closed = self.router.close_all(reason);
            info!(node = %self.node_address, %state, routes = closed, "Connection ended");
        }
        changed
    }
}

/// Borrowed access to the live connection.
///
/// Cheap to clone. All submissions and queries multiplex over the one
/// underlying channel; status notifications are demultiplexed per
/// submission.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<ConnectionInner>,
}

impl ConnectionHandle {
    fn establish(
        node_address: &str,
        transport: Arc<dyn LedgerTransport>,
        metadata: LedgerMetadata,
        config: ConnectionConfig,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connected);
        let inner = Arc::new(ConnectionInner {
            node_address: node_address.to_string(),
            transport,
            router: NotificationRouter::new(),
            state,
            metadata,
            config,
        });

        spawn_watchdog(Arc::downgrade(&inner), Arc::clone(&inner.transport));
        Self { inner }
    }

    #[must_use]
    pub fn node_address(&self) -> &str {
        &self.inner.node_address
    }

    #[must_use]
    pub fn metadata(&self) -> &LedgerMetadata {
        &self.inner.metadata
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Observe state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Resolves once the connection is no longer live, with the state it
    /// ended in.
    pub async fn lost(&self) -> ConnectionState {
        let mut rx = self.inner.state.subscribe();
        let state = match rx.wait_for(|state| !state.is_live()).await {
            Ok(state) => *state,
            Err(_) => ConnectionState::Lost,
        };
        state
    }

    /// Submissions currently routed over this connection.
    #[must_use]
    pub fn open_routes(&self) -> usize {
        self.inner.router.route_count()
    }

    /// Submit a signed extrinsic and subscribe to its status.
    ///
    /// The returned subscription observes only this submission's
    /// notifications. Dropping it releases the route.
    pub async fn submit_and_watch(
        &self,
        extrinsic: &SignedExtrinsic,
    ) -> Result<StatusSubscription, LedgerError> {
        self.ensure_live()?;
        let bytes = encode_extrinsic(extrinsic)?;

        let subscription = self
            .inner
            .router
            .open_route()
            .map_err(|_| self.ended_error())?;
        let handle = subscription.handle();

        self.request(self.inner.transport.submit_and_watch(
            handle,
            bytes,
            self.inner.router.clone(),
        ))
        .await?;

        debug!(%handle, signer = %extrinsic.signer, nonce = extrinsic.nonce, "Submitted");
        Ok(subscription)
    }

    /// Next account index for `account`, counting submissions in the pool.
    pub async fn next_nonce(&self, account: &AccountAddress) -> Result<u64, LedgerError> {
        self.ensure_live()?;
        self.request(self.inner.transport.next_nonce(account)).await
    }

    /// Encoded document for `did`, if one exists.
    pub async fn query_document(
        &self,
        did: &AccountAddress,
    ) -> Result<Option<Vec<u8>>, LedgerError> {
        self.ensure_live()?;
        self.request(self.inner.transport.query_document(did)).await
    }

    async fn shutdown(&self) {
        self.inner
            .end(ConnectionState::Disconnected, CloseReason::Disconnected);
        self.inner.transport.close().await;
    }

    fn ensure_live(&self) -> Result<(), ConnectionError> {
        if self.state().is_live() {
            Ok(())
        } else {
            Err(self.ended_error())
        }
    }

    fn ended_error(&self) -> ConnectionError {
        match self.state() {
            ConnectionState::Disconnected => ConnectionError::NotConnected,
            ConnectionState::Connected | ConnectionState::Lost => ConnectionError::Lost,
        }
    }

    async fn request<T>(
        &self,
        call: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, LedgerError> {
        let after = self.inner.config.request_timeout;
        match timeout(after, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(TransportError::Rejected { reason })) => Err(LedgerError::Rejected { reason }),
            Ok(Err(TransportError::Protocol(reason))) => Err(LedgerError::Protocol(reason)),
            Ok(Err(TransportError::Timeout)) | Err(_) => Err(LedgerError::Timeout { after }),
            Ok(Err(TransportError::Closed | TransportError::Unreachable(_))) => {
                Err(self.ended_error().into())
            }
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("node", &self.inner.node_address)
            .field("state", &self.state())
            .field("routes", &self.open_routes())
            .finish()
    }
}

/// Mark the connection lost once the transport closes underneath it.
fn spawn_watchdog(inner: Weak<ConnectionInner>, transport: Arc<dyn LedgerTransport>) {
    tokio::spawn(async move {
        transport.closed().await;
        if let Some(inner) = inner.upgrade() {
            if inner.end(ConnectionState::Lost, CloseReason::ConnectionLost) {
                warn!(node = %inner.node_address, "Connection to ledger node lost");
            }
        }
    });
}
