//! JSON-RPC WebSocket adapter.
//!
//! Speaks the node's RPC surface over a single `jsonrpsee` WebSocket client:
//!
//! | Method | Params | Result |
//! |--------|--------|--------|
//! | `xenon_metadata` | - | `LedgerMetadata` |
//! | `system_accountNextIndex` | address | `u64` |
//! | `author_submitAndWatchExtrinsic` | hex extrinsic | subscription of `StatusEvent` |
//! | `xenon_didDocument` | address | hex document or `null` |
//!
//! Status subscriptions are unsubscribed with `author_unwatchExtrinsic` when
//! the forwarding task drops them.

use crate::domain::ConnectionConfig;
use crate::ports::{LedgerConnector, LedgerTransport, TransportError};
use async_trait::async_trait;
use jsonrpsee::core::client::{ClientT, Error as ClientError, Subscription, SubscriptionClientT};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use parking_lot::RwLock;
use shared_bus::NotificationRouter;
use shared_types::{AccountAddress, LedgerMetadata, StatusEvent, SubmissionHandle};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

const METHOD_METADATA: &str = "xenon_metadata";
const METHOD_NEXT_INDEX: &str = "system_accountNextIndex";
const METHOD_SUBMIT_AND_WATCH: &str = "author_submitAndWatchExtrinsic";
const METHOD_UNWATCH: &str = "author_unwatchExtrinsic";
const METHOD_DID_DOCUMENT: &str = "xenon_didDocument";

/// Opens `jsonrpsee` WebSocket connections.
#[derive(Debug, Clone)]
pub struct RpcConnector {
    connection_timeout: Duration,
    request_timeout: Duration,
}

impl RpcConnector {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            connection_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
        }
    }
}

impl Default for RpcConnector {
    fn default() -> Self {
        Self::new(&ConnectionConfig::default())
    }
}

#[async_trait]
impl LedgerConnector for RpcConnector {
    async fn open(&self, node_address: &str) -> Result<Arc<dyn LedgerTransport>, TransportError> {
        info!(node = %node_address, "Opening WebSocket connection");

        let client = WsClientBuilder::default()
            .connection_timeout(self.connection_timeout)
            .request_timeout(self.request_timeout)
            .build(node_address)
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        Ok(Arc::new(RpcTransport::spawn(Arc::new(client))))
    }
}

/// A live WebSocket connection to one node.
pub struct RpcTransport {
    /// The only long-lived strong reference besides the monitor's.
    client: RwLock<Option<Arc<WsClient>>>,
    /// Close requested locally.
    shutdown: Arc<Notify>,
    /// Set once the client is gone.
    closed: Arc<watch::Sender<bool>>,
}

impl RpcTransport {
    fn spawn(client: Arc<WsClient>) -> Self {
        let shutdown = Arc::new(Notify::new());
        let closed = Arc::new(watch::channel(false).0);

        let monitor_client = Arc::clone(&client);
        let monitor_closed = Arc::clone(&closed);
        let monitor_shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            tokio::select! {
                () = monitor_client.on_disconnect() => {
                    warn!("WebSocket connection dropped by node");
                }
                () = monitor_shutdown.notified() => {
                    debug!("WebSocket connection closing");
                }
            }
            drop(monitor_client);
            monitor_closed.send_replace(true);
        });

        Self {
            client: RwLock::new(Some(client)),
            shutdown,
            closed,
        }
    }

    fn client(&self) -> Result<Arc<WsClient>, TransportError> {
        self.client.read().clone().ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl LedgerTransport for RpcTransport {
    async fn metadata(&self) -> Result<LedgerMetadata, TransportError> {
        self.client()?
            .request(METHOD_METADATA, rpc_params![])
            .await
            .map_err(map_client_error)
    }

    async fn next_nonce(&self, account: &AccountAddress) -> Result<u64, TransportError> {
        self.client()?
            .request(METHOD_NEXT_INDEX, rpc_params![account.as_str()])
            .await
            .map_err(map_client_error)
    }

    async fn submit_and_watch(
        &self,
        handle: SubmissionHandle,
        extrinsic: Vec<u8>,
        publisher: NotificationRouter,
    ) -> Result<(), TransportError> {
        let client = self.client()?;
        let encoded = format!("0x{}", hex::encode(extrinsic));

        let subscription: Subscription<StatusEvent> = client
            .subscribe(
                METHOD_SUBMIT_AND_WATCH,
                rpc_params![encoded],
                METHOD_UNWATCH,
            )
            .await
            .map_err(map_client_error)?;

        debug!(%handle, "Watching extrinsic");
        tokio::spawn(forward_status(
            handle,
            subscription,
            publisher,
            Arc::downgrade(&client),
        ));
        Ok(())
    }

    async fn query_document(
        &self,
        did: &AccountAddress,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let response: Option<String> = self
            .client()?
            .request(METHOD_DID_DOCUMENT, rpc_params![did.as_str()])
            .await
            .map_err(map_client_error)?;

        response
            .map(|encoded| {
                let digits = encoded.strip_prefix("0x").unwrap_or(&encoded);
                hex::decode(digits).map_err(|e| TransportError::Protocol(e.to_string()))
            })
            .transpose()
    }

    async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    async fn close(&self) {
        self.client.write().take();
        self.shutdown.notify_one();
        self.closed().await;
    }
}

/// Forward one status subscription into the router until either side ends.
async fn forward_status(
    handle: SubmissionHandle,
    mut subscription: Subscription<StatusEvent>,
    publisher: NotificationRouter,
    client: Weak<WsClient>,
) {
    while let Some(item) = subscription.next().await {
        match item {
            Ok(event) => {
                if !publisher.publish(handle, event) {
                    debug!(%handle, "Route released, unwatching");
                    return;
                }
            }
            Err(e) => {
                warn!(%handle, error = %e, "Undecodable status notification");
            }
        }
    }

    // Stream ended. If the whole connection went away the connection watchdog
    // reports it; otherwise the node ended this watch on its own.
    let connected = client.upgrade().is_some_and(|c| c.is_connected());
    if connected {
        debug!(%handle, "Node ended status watch");
        publisher.close_route(handle);
    }
}

fn map_client_error(err: ClientError) -> TransportError {
    match err {
        ClientError::Call(obj) => TransportError::Rejected {
            reason: obj.message().to_string(),
        },
        ClientError::RestartNeeded(_) => TransportError::Closed,
        ClientError::RequestTimeout => TransportError::Timeout,
        ClientError::Transport(e) => TransportError::Unreachable(e.to_string()),
        other => TransportError::Protocol(other.to_string()),
    }
}
