//! # Core Domain Entities
//!
//! Identity entities as stored by the ledger's DID pallet and rendered by
//! the presentation layer.
//!
//! ## Clusters
//!
//! - **Identity**: `AccountAddress`, `DidDocument`
//! - **Document Contents**: `LinkedChain`, `PublicKeyEntry`, `ServiceEndpoint`

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte block hash.
pub type BlockHash = [u8; 32];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// Numeric identifier of an external chain (e.g. `1` for Ethereum mainnet).
pub type ChainId = u32;

/// DID method name used when rendering identifiers.
pub const DID_METHOD: &str = "xenon";

/// Maximum linked chains per document (pallet `MaxLinkedChains`).
pub const MAX_LINKED_CHAINS: usize = 10;

/// Maximum public keys per document (pallet `MaxPublicKeys`).
pub const MAX_PUBLIC_KEYS: usize = 5;

/// Maximum service endpoints per document (pallet `MaxServices`).
pub const MAX_SERVICES: usize = 10;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// An on-ledger account identity.
///
/// Kept as an opaque string: the client compares addresses, it never
/// interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountAddress(String);

impl AccountAddress {
    /// Wrap an address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Derive the address of an Ed25519 public key (`0x` + hex).
    #[must_use]
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(format!("0x{}", hex::encode(public_key)))
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID URI for this account, e.g. `did:xenon:0xabc...`.
    #[must_use]
    pub fn did_uri(&self) -> String {
        format!("did:{}:{}", DID_METHOD, self.0)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The decentralized-identity record keyed by an account address.
///
/// The client only ever holds an immutable snapshot returned from a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDocument {
    /// The account this document describes.
    pub did: AccountAddress,
    /// The account allowed to modify the document.
    pub controller: AccountAddress,
    /// Chains this identity has been linked to.
    pub linked_chains: Vec<LinkedChain>,
    /// Verification keys registered on the document.
    pub public_keys: Vec<PublicKeyEntry>,
    /// Service endpoints advertised by the identity.
    pub services: Vec<ServiceEndpoint>,
    /// Block number the document was created at.
    pub created_at: u64,
    /// Block number of the last modification.
    pub updated_at: u64,
}

impl DidDocument {
    /// A fresh document controlled by its own account.
    #[must_use]
    pub fn new(did: AccountAddress, block_number: u64) -> Self {
        Self {
            controller: did.clone(),
            did,
            linked_chains: Vec::new(),
            public_keys: Vec::new(),
            services: Vec::new(),
            created_at: block_number,
            updated_at: block_number,
        }
    }

    /// The DID URI of the document subject.
    #[must_use]
    pub fn did_uri(&self) -> String {
        self.did.did_uri()
    }

    /// Find a linked chain by id.
    #[must_use]
    pub fn linked_chain(&self, chain_id: ChainId) -> Option<&LinkedChain> {
        self.linked_chains.iter().find(|c| c.chain_id == chain_id)
    }

    /// Whether another chain can still be linked.
    #[must_use]
    pub fn has_chain_capacity(&self) -> bool {
        self.linked_chains.len() < MAX_LINKED_CHAINS
    }
}

// =============================================================================
// CLUSTER B: DOCUMENT CONTENTS
// =============================================================================

/// An external chain address bound to the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedChain {
    /// Human readable chain name (e.g. "Ethereum").
    pub chain_name: String,
    /// Chain identifier.
    pub chain_id: ChainId,
    /// The identity's address on that chain.
    pub address: String,
}

/// Key algorithm of a registered public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    Ed25519,
    Sr25519,
    Ecdsa,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::Ed25519 => "Ed25519",
            KeyType::Sr25519 => "Sr25519",
            KeyType::Ecdsa => "Ecdsa",
        };
        f.write_str(name)
    }
}

/// A verification key registered on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyEntry {
    /// Key identifier within the document (e.g. "key1").
    pub id: String,
    /// Key algorithm.
    pub key_type: KeyType,
    /// Raw public key bytes.
    pub public_key: Vec<u8>,
}

impl PublicKeyEntry {
    /// Short display fingerprint: algorithm plus the first 8 key bytes.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let prefix = &self.public_key[..self.public_key.len().min(8)];
        format!(
            "{}-{}",
            self.key_type.to_string().to_lowercase(),
            hex::encode(prefix)
        )
    }
}

/// A service endpoint advertised by the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Service identifier within the document.
    pub id: String,
    /// Service type (e.g. "Messaging").
    pub service_type: String,
    /// Endpoint URI.
    pub endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_uri() {
        let addr = AccountAddress::new("5GrwV");
        assert_eq!(addr.did_uri(), "did:xenon:5GrwV");
    }

    #[test]
    fn test_address_from_public_key() {
        let addr = AccountAddress::from_public_key(&[0xAB; 32]);
        assert!(addr.as_str().starts_with("0xabab"));
        assert_eq!(addr.as_str().len(), 2 + 64);
    }

    #[test]
    fn test_new_document_is_self_controlled() {
        let doc = DidDocument::new(AccountAddress::new("alice"), 7);
        assert_eq!(doc.controller, doc.did);
        assert_eq!(doc.created_at, 7);
        assert!(doc.linked_chains.is_empty());
        assert!(doc.has_chain_capacity());
    }

    #[test]
    fn test_chain_capacity() {
        let mut doc = DidDocument::new(AccountAddress::new("alice"), 1);
        for i in 0..MAX_LINKED_CHAINS as u32 {
            doc.linked_chains.push(LinkedChain {
                chain_name: format!("chain-{}", i),
                chain_id: i,
                address: "0x1".into(),
            });
        }
        assert!(!doc.has_chain_capacity());
        assert!(doc.linked_chain(3).is_some());
        assert!(doc.linked_chain(99).is_none());
    }

    #[test]
    fn test_fingerprint() {
        let entry = PublicKeyEntry {
            id: "key1".into(),
            key_type: KeyType::Sr25519,
            public_key: vec![0x01, 0x02, 0x03],
        };
        assert_eq!(entry.fingerprint(), "sr25519-010203");
    }

    #[test]
    fn test_address_serializes_transparently() {
        let addr = AccountAddress::new("0xabc");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0xabc\"");
    }
}
