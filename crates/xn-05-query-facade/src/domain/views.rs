//! Read-models handed to the presentation layer.

use serde::Serialize;
use shared_types::{AccountAddress, DidDocument, LinkedChain, PublicKeyEntry};

/// Everything a dashboard shows for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub address: AccountAddress,
    /// `did:xenon:<address>`, shown whether or not a document exists.
    pub did_uri: String,
    pub document: Option<DidDocument>,
}

impl IdentityView {
    #[must_use]
    pub fn new(address: AccountAddress, document: Option<DidDocument>) -> Self {
        Self {
            did_uri: address.did_uri(),
            address,
            document,
        }
    }

    /// Whether the address has a registered document.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.document.is_some()
    }

    #[must_use]
    pub fn linked_chains(&self) -> &[LinkedChain] {
        self.document
            .as_ref()
            .map(|d| d.linked_chains.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn public_keys(&self) -> &[PublicKeyEntry] {
        self.document
            .as_ref()
            .map(|d| d.public_keys.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_view() {
        let view = IdentityView::new(AccountAddress::new("0xabc"), None);
        assert!(!view.is_registered());
        assert_eq!(view.did_uri, "did:xenon:0xabc");
        assert!(view.linked_chains().is_empty());
        assert!(view.public_keys().is_empty());
    }

    #[test]
    fn test_view_json_shape() {
        let address = AccountAddress::new("0xabc");
        let view = IdentityView::new(address.clone(), Some(DidDocument::new(address, 4)));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["didUri"], "did:xenon:0xabc");
        assert_eq!(json["document"]["created_at"], 4);
    }
}
