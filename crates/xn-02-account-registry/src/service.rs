//! # Account Registry Service
//!
//! Tracks the accounts currently authorized for signing. The provider pushes
//! whole account lists; each one replaces the registry snapshot atomically,
//! so readers see either the old set or the new set, never a mix.

use crate::domain::{Account, AccountSet};
use crate::ports::{AccountProvider, Extension, Signer};
use parking_lot::Mutex;
use shared_types::{AccountAddress, AccountError, PublicKey, Signature};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Snapshot-replaced registry of signing accounts.
pub struct AccountRegistry {
    provider: Arc<dyn AccountProvider>,
    snapshot: Arc<watch::Sender<Arc<AccountSet>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl AccountRegistry {
    pub fn new(provider: Arc<dyn AccountProvider>) -> Self {
        Self {
            provider,
            snapshot: Arc::new(watch::channel(Arc::new(AccountSet::default())).0),
            forwarder: Mutex::new(None),
        }
    }

    /// Enable the provider for `app_name` and start following its accounts.
    ///
    /// # Errors
    /// * `NoProvider` - the environment offers no signing extension
    pub async fn enable_provider(&self, app_name: &str) -> Result<Vec<Extension>, AccountError> {
        let extensions = self.provider.enable(app_name).await?;
        if extensions.is_empty() {
            return Err(AccountError::NoProvider {
                app_name: app_name.to_string(),
            });
        }
        info!(app = %app_name, extensions = extensions.len(), "Signing provider enabled");

        let mut updates = self.provider.subscribe_accounts();
        replace(&self.snapshot, updates.borrow_and_update().clone());

        let snapshot = Arc::clone(&self.snapshot);
        let task = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let accounts = updates.borrow_and_update().clone();
                replace(&snapshot, accounts);
            }
            debug!("Account provider subscription ended");
        });

        if let Some(previous) = self.forwarder.lock().replace(task) {
            previous.abort();
        }
        Ok(extensions)
    }

    /// Whether `enable_provider` has succeeded.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.forwarder.lock().is_some()
    }

    /// Follow snapshot replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<AccountSet>> {
        self.snapshot.subscribe()
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AccountSet> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Resolve the signer for `address` against the snapshot current at call
    /// time.
    ///
    /// # Errors
    /// * `AccountNotFound` - `address` is absent from the current snapshot
    pub fn resolve_signer(&self, address: &AccountAddress) -> Result<SigningHandle, AccountError> {
        let snapshot = self.snapshot();
        let account = snapshot
            .get(address)
            .ok_or_else(|| AccountError::AccountNotFound {
                address: address.clone(),
            })?
            .clone();

        let signer = self
            .provider
            .signer(&account.signing_source_id, address)?;
        Ok(SigningHandle { account, signer })
    }
}

impl Drop for AccountRegistry {
    fn drop(&mut self) {
        if let Some(task) = self.forwarder.get_mut().take() {
            task.abort();
        }
    }
}

fn replace(snapshot: &watch::Sender<Arc<AccountSet>>, accounts: Vec<Account>) {
    let version = snapshot.borrow().version() + 1;
    let count = accounts.len();
    snapshot.send_replace(Arc::new(AccountSet::new(accounts, version)));
    debug!(version, accounts = count, "Account snapshot replaced");
}

/// A resolved signer for one account.
#[derive(Clone)]
pub struct SigningHandle {
    account: Account,
    signer: Arc<dyn Signer>,
}

impl SigningHandle {
    #[must_use]
    pub fn address(&self) -> &AccountAddress {
        &self.account.address
    }

    #[must_use]
    pub fn account(&self) -> &Account {
        &self.account
    }

    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub async fn sign(&self, payload: &[u8]) -> Result<Signature, AccountError> {
        self.signer.sign(payload).await
    }
}

impl std::fmt::Debug for SigningHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningHandle")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LocalKeystore;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn next_version(rx: &mut watch::Receiver<Arc<AccountSet>>) -> Arc<AccountSet> {
        timeout(Duration::from_secs(1), rx.changed())
            .await
            .expect("timeout")
            .expect("sender alive");
        Arc::clone(&rx.borrow_and_update())
    }

    #[tokio::test]
    async fn test_no_provider() {
        let registry = AccountRegistry::new(Arc::new(LocalKeystore::unavailable()));
        assert_eq!(
            registry.enable_provider("Xenon DID Dashboard").await,
            Err(AccountError::NoProvider {
                app_name: "Xenon DID Dashboard".into()
            })
        );
        assert!(!registry.is_enabled());
    }

    #[tokio::test]
    async fn test_enable_takes_initial_snapshot() {
        let keystore = Arc::new(LocalKeystore::new());
        let alice = keystore.add_seed([1; 32], Some("Alice"));
        let registry = AccountRegistry::new(keystore);

        registry.enable_provider("test").await.unwrap();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.version(), 1);
        assert!(snapshot.contains(&alice));
    }

    #[tokio::test]
    async fn test_updates_replace_snapshot() {
        let keystore = Arc::new(LocalKeystore::new());
        let registry = AccountRegistry::new(keystore.clone());
        registry.enable_provider("test").await.unwrap();
        let mut rx = registry.subscribe();

        let alice = keystore.add_seed([1; 32], None);
        let snapshot = next_version(&mut rx).await;
        assert!(snapshot.contains(&alice));
        assert!(snapshot.version() > 1);
    }

    #[tokio::test]
    async fn test_resolve_signer_uses_current_snapshot() {
        let keystore = Arc::new(LocalKeystore::new());
        let alice = keystore.add_seed([1; 32], None);
        let registry = AccountRegistry::new(keystore.clone());
        registry.enable_provider("test").await.unwrap();

        let held = registry.snapshot();
        assert!(registry.resolve_signer(&alice).is_ok());

        let mut rx = registry.subscribe();
        keystore.remove_account(&alice);
        next_version(&mut rx).await;

        // An older snapshot still lists the account; resolution does not.
        assert!(held.contains(&alice));
        assert!(matches!(
            registry.resolve_signer(&alice),
            Err(AccountError::AccountNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_signing_handle_signs() {
        let keystore = Arc::new(LocalKeystore::new());
        let alice = keystore.add_seed([3; 32], None);
        let registry = AccountRegistry::new(keystore);
        registry.enable_provider("test").await.unwrap();

        let handle = registry.resolve_signer(&alice).unwrap();
        assert_eq!(handle.address(), &alice);
        assert!(handle.sign(b"hello").await.is_ok());
    }
}
