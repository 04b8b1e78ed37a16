//! Outbound ports for the Account Registry.

use crate::domain::Account;
use async_trait::async_trait;
use shared_types::{AccountAddress, AccountError, PublicKey, Signature};
use std::sync::Arc;
use tokio::sync::watch;

/// A signing extension made available by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub name: String,
    pub version: String,
}

/// Supplies accounts and signing capability (wallet, extension, keystore).
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Ask the environment for signing extensions on behalf of `app_name`.
    ///
    /// An empty list means no provider is available.
    async fn enable(&self, app_name: &str) -> Result<Vec<Extension>, AccountError>;

    /// The full current account set, pushed again on every change.
    fn subscribe_accounts(&self) -> watch::Receiver<Vec<Account>>;

    /// Signer for `address` held by `source_id`.
    fn signer(
        &self,
        source_id: &str,
        address: &AccountAddress,
    ) -> Result<Arc<dyn Signer>, AccountError>;
}

/// Signs payloads for one account.
#[async_trait]
pub trait Signer: Send + Sync {
    fn public_key(&self) -> PublicKey;

    /// Sign `payload`. May fail with `SigningRejected` if the holder declines.
    async fn sign(&self, payload: &[u8]) -> Result<Signature, AccountError>;
}
