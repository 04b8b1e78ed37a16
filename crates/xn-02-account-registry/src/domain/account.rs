//! Accounts and account-set snapshots.

use serde::{Deserialize, Serialize};
use shared_types::AccountAddress;

/// An externally held signing identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: AccountAddress,
    /// Provider-side identifier of whoever holds the key.
    pub signing_source_id: String,
    /// Display name, if the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Account {
    pub fn new(address: AccountAddress, signing_source_id: impl Into<String>) -> Self {
        Self {
            address,
            signing_source_id: signing_source_id.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// An immutable snapshot of the authorized accounts.
///
/// Never mutated after construction; the registry swaps in a new one on
/// every provider update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSet {
    accounts: Vec<Account>,
    /// Monotonic snapshot number, 0 before the first update.
    version: u64,
}

impl AccountSet {
    pub fn new(accounts: Vec<Account>, version: u64) -> Self {
        Self { accounts, version }
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn get(&self, address: &AccountAddress) -> Option<&Account> {
        self.accounts.iter().find(|a| &a.address == address)
    }

    #[must_use]
    pub fn contains(&self, address: &AccountAddress) -> bool {
        self.get(address).is_some()
    }

    /// First account, the default submitter when none is named.
    #[must_use]
    pub fn first(&self) -> Option<&Account> {
        self.accounts.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
