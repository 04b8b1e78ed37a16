//! Local Ed25519 keystore provider.
//!
//! Holds keys in memory. Addresses are `0x` + hex public key. Every change to
//! the key set pushes the complete new account list to subscribers.

use crate::domain::Account;
use crate::ports::{AccountProvider, Extension, Signer};
use async_trait::async_trait;
use ed25519_dalek::{Signer as _, SigningKey};
use parking_lot::RwLock;
use shared_types::{AccountAddress, AccountError, PublicKey, Signature};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Default extension name.
pub const KEYSTORE_NAME: &str = "xenon-keystore";

struct StoredKey {
    key: SigningKey,
    name: Option<String>,
}

/// In-memory keystore acting as an account provider.
pub struct LocalKeystore {
    name: String,
    available: bool,
    keys: RwLock<BTreeMap<AccountAddress, StoredKey>>,
    accounts: watch::Sender<Vec<Account>>,
    declining: Arc<AtomicBool>,
}

impl LocalKeystore {
    pub fn new() -> Self {
        Self::named(KEYSTORE_NAME)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: true,
            keys: RwLock::new(BTreeMap::new()),
            accounts: watch::channel(Vec::new()).0,
            declining: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A keystore whose `enable` finds no extension.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Generate a fresh random account.
    pub fn generate_account(&self, name: Option<&str>) -> AccountAddress {
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        self.insert(key, name)
    }

    /// Add the account derived from a 32-byte seed.
    pub fn add_seed(&self, seed: [u8; 32], name: Option<&str>) -> AccountAddress {
        self.insert(SigningKey::from_bytes(&seed), name)
    }

    /// Forget an account. Returns whether it existed.
    pub fn remove_account(&self, address: &AccountAddress) -> bool {
        let removed = self.keys.write().remove(address).is_some();
        if removed {
            info!(%address, "Keystore account removed");
            self.publish();
        }
        removed
    }

    /// While set, every signer declines (as a user cancelling a prompt).
    pub fn set_declining(&self, declining: bool) {
        self.declining.store(declining, Ordering::SeqCst);
    }

    fn insert(&self, key: SigningKey, name: Option<&str>) -> AccountAddress {
        let address = AccountAddress::from_public_key(&key.verifying_key().to_bytes());
        self.keys.write().insert(
            address.clone(),
            StoredKey {
                key,
                name: name.map(str::to_string),
            },
        );
        info!(%address, "Keystore account added");
        self.publish();
        address
    }

    fn publish(&self) {
        let accounts: Vec<Account> = self
            .keys
            .read()
            .iter()
            .map(|(address, stored)| {
                let account = Account::new(address.clone(), self.name.clone());
                match &stored.name {
                    Some(name) => account.with_name(name.clone()),
                    None => account,
                }
            })
            .collect();
        self.accounts.send_replace(accounts);
    }
}

impl Default for LocalKeystore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountProvider for LocalKeystore {
    async fn enable(&self, app_name: &str) -> Result<Vec<Extension>, AccountError> {
        debug!(app = %app_name, available = self.available, "Keystore enable requested");
        if !self.available {
            return Ok(Vec::new());
        }
        Ok(vec![Extension {
            name: self.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }])
    }

    fn subscribe_accounts(&self) -> watch::Receiver<Vec<Account>> {
        self.accounts.subscribe()
    }

    fn signer(
        &self,
        source_id: &str,
        address: &AccountAddress,
    ) -> Result<Arc<dyn Signer>, AccountError> {
        let not_found = || AccountError::AccountNotFound {
            address: address.clone(),
        };
        if source_id != self.name {
            return Err(not_found());
        }
        let keys = self.keys.read();
        let stored = keys.get(address).ok_or_else(not_found)?;
        Ok(Arc::new(KeystoreSigner {
            key: stored.key.clone(),
            declining: Arc::clone(&self.declining),
        }))
    }
}

/// Signer backed by a keystore key.
pub struct KeystoreSigner {
    key: SigningKey,
    declining: Arc<AtomicBool>,
}

#[async_trait]
impl Signer for KeystoreSigner {
    fn public_key(&self) -> PublicKey {
        self.key.verifying_key().to_bytes()
    }

    async fn sign(&self, payload: &[u8]) -> Result<Signature, AccountError> {
        if self.declining.load(Ordering::SeqCst) {
            return Err(AccountError::SigningRejected {
                reason: "cancelled by user".to_string(),
            });
        }
        Ok(self.key.sign(payload).to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Verifier, VerifyingKey};

    #[tokio::test]
    async fn test_signer_signs_verifiably() {
        let keystore = LocalKeystore::new();
        let address = keystore.add_seed([7; 32], Some("Alice"));

        let signer = keystore.signer(KEYSTORE_NAME, &address).unwrap();
        let signature = signer.sign(b"payload").await.unwrap();

        let key = VerifyingKey::from_bytes(&signer.public_key()).unwrap();
        assert!(key
            .verify(b"payload", &ed25519_dalek::Signature::from_bytes(&signature))
            .is_ok());
        assert_eq!(AccountAddress::from_public_key(&signer.public_key()), address);
    }

    #[tokio::test]
    async fn test_declining_signer() {
        let keystore = LocalKeystore::new();
        let address = keystore.generate_account(None);
        let signer = keystore.signer(KEYSTORE_NAME, &address).unwrap();

        keystore.set_declining(true);
        assert!(matches!(
            signer.sign(b"payload").await,
            Err(AccountError::SigningRejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_changes_push_full_set() {
        let keystore = LocalKeystore::new();
        let mut rx = keystore.subscribe_accounts();

        let a = keystore.add_seed([1; 32], None);
        keystore.add_seed([2; 32], None);
        keystore.remove_account(&a);

        let accounts = rx.borrow_and_update().clone();
        assert_eq!(accounts.len(), 1);
        assert!(accounts.iter().all(|acc| acc.address != a));
    }

    #[tokio::test]
    async fn test_unavailable_keystore_has_no_extensions() {
        let keystore = LocalKeystore::unavailable();
        assert!(keystore.enable("test").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_source_not_found() {
        let keystore = LocalKeystore::new();
        let address = keystore.generate_account(None);
        assert!(keystore.signer("other-wallet", &address).is_err());
    }
}
