//! # Query Facade Service
//!
//! Point reads against ledger state. One round trip per call, no
//! correlation state.

use crate::domain::{IdentityView, QueryError};
use shared_types::{AccountAddress, DidDocument, LinkedChain, PublicKeyEntry};
use tracing::debug;
use xn_01_connection_manager::ConnectionHandle;
use xn_03_operation_codec::decode_document;

/// Read-only access to identity documents.
#[derive(Debug, Clone)]
pub struct QueryFacade {
    connection: ConnectionHandle,
}

impl QueryFacade {
    pub fn new(connection: ConnectionHandle) -> Self {
        Self { connection }
    }

    /// The document registered for `address`.
    ///
    /// Returns `Ok(None)` when the address has no document.
    ///
    /// # Errors
    /// * `Ledger` - the node could not be queried
    /// * `Decoding` - the stored document could not be decoded
    pub async fn get_did_document(
        &self,
        address: &AccountAddress,
    ) -> Result<Option<DidDocument>, QueryError> {
        let Some(bytes) = self.connection.query_document(address).await? else {
            debug!(%address, "No document registered");
            return Ok(None);
        };
        let document = decode_document(&bytes)?;
        debug!(%address, chains = document.linked_chains.len(), "Document fetched");
        Ok(Some(document))
    }

    /// Chains linked to `address`, empty when it has no document.
    pub async fn linked_chains(
        &self,
        address: &AccountAddress,
    ) -> Result<Vec<LinkedChain>, QueryError> {
        Ok(self
            .get_did_document(address)
            .await?
            .map(|d| d.linked_chains)
            .unwrap_or_default())
    }

    /// Keys registered on `address`'s document, empty when it has none.
    pub async fn public_keys(
        &self,
        address: &AccountAddress,
    ) -> Result<Vec<PublicKeyEntry>, QueryError> {
        Ok(self
            .get_did_document(address)
            .await?
            .map(|d| d.public_keys)
            .unwrap_or_default())
    }

    pub async fn identity_view(&self, address: &AccountAddress) -> Result<IdentityView, QueryError> {
        let document = self.get_did_document(address).await?;
        Ok(IdentityView::new(address.clone(), document))
    }
}
