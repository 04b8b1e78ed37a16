//! # Xenon Client
//!
//! Composition root: one connection, one account registry, one submission
//! engine and one query facade built from a `RuntimeConfig`.
//!
//! ## Startup sequence
//!
//! 1. Validate configuration
//! 2. Enable the account provider under `app_name`
//! 3. Connect to `node_url` and check the node's metadata
//! 4. Build the engine and the query facade over that connection

use crate::config::{ConfigError, RuntimeConfig};
use shared_types::{AccountAddress, AccountError, ConnectionError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use xn_01_connection_manager::{ConnectionHandle, ConnectionManager, LedgerConnector};
use xn_02_account_registry::{AccountProvider, AccountRegistry, AccountSet};
use xn_04_submission_engine::SubmissionEngine;
use xn_05_query_facade::QueryFacade;

/// Startup failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// A connected Xenon client.
pub struct XenonClient {
    config: RuntimeConfig,
    manager: ConnectionManager,
    connection: ConnectionHandle,
    registry: Arc<AccountRegistry>,
    engine: SubmissionEngine,
    queries: QueryFacade,
}

impl XenonClient {
    /// Wire every component and connect.
    ///
    /// # Errors
    /// * `Config` - the configuration is invalid
    /// * `Account` - no signing provider is available
    /// * `Connection` - the node is unreachable or incompatible
    pub async fn connect(
        config: RuntimeConfig,
        connector: Arc<dyn LedgerConnector>,
        provider: Arc<dyn AccountProvider>,
    ) -> Result<Self, ClientError> {
        config.validate()?;

        let registry = Arc::new(AccountRegistry::new(provider));
        let extensions = registry.enable_provider(&config.app_name).await?;

        let manager = ConnectionManager::new(connector, config.connection.clone());
        let connection = manager.connect(&config.node_url).await?;

        let engine = SubmissionEngine::new(
            connection.clone(),
            Arc::clone(&registry),
            config.engine.clone(),
        );
        let queries = QueryFacade::new(connection.clone());

        info!(
            node = %config.node_url,
            extensions = extensions.len(),
            accounts = registry.snapshot().len(),
            confirmation = %config.engine.confirmation,
            "Xenon client ready"
        );

        Ok(Self {
            config,
            manager,
            connection,
            registry,
            engine,
            queries,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn engine(&self) -> &SubmissionEngine {
        &self.engine
    }

    #[must_use]
    pub fn queries(&self) -> &QueryFacade {
        &self.queries
    }

    /// Current account snapshot.
    #[must_use]
    pub fn accounts(&self) -> Arc<AccountSet> {
        self.registry.snapshot()
    }

    /// The first authorized account, if any.
    #[must_use]
    pub fn default_account(&self) -> Option<AccountAddress> {
        self.registry.snapshot().first().map(|a| a.address.clone())
    }

    /// Close the connection. Pending submissions fail with `ConnectionLost`.
    pub async fn shutdown(&self) {
        if self.manager.disconnect().await {
            info!(node = %self.config.node_url, "Xenon client disconnected");
        }
    }
}

impl fmt::Debug for XenonClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XenonClient")
            .field("node_url", &self.config.node_url)
            .field("connection", &self.connection)
            .field("accounts", &self.registry.snapshot().len())
            .field("engine", &self.engine)
            .finish()
    }
}
