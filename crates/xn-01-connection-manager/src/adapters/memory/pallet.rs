//! DID pallet state transitions, as executed by the in-memory ledger.

use shared_types::{AccountAddress, DidDocument, LinkedChain};
use std::collections::HashMap;
use std::fmt;
use xn_03_operation_codec::{
    ChainLinked, ChainUnlinked, DispatchError, DocumentCreated, EventPayload, Operation,
};

/// Dispatch errors raised by the pallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalletError {
    DidDocumentAlreadyExists,
    DidDocumentNotFound,
    TooManyLinkedChains,
    ChainNotLinked,
}

impl fmt::Display for PalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PalletError::DidDocumentAlreadyExists => "DidDocumentAlreadyExists",
            PalletError::DidDocumentNotFound => "DidDocumentNotFound",
            PalletError::TooManyLinkedChains => "TooManyLinkedChains",
            PalletError::ChainNotLinked => "ChainNotLinked",
        };
        f.write_str(name)
    }
}

impl From<PalletError> for DispatchError {
    fn from(err: PalletError) -> Self {
        DispatchError::xenon(err.to_string())
    }
}

/// Document storage keyed by account.
#[derive(Debug, Default)]
pub(crate) struct DidRegistry {
    documents: HashMap<AccountAddress, DidDocument>,
}

impl DidRegistry {
    pub(crate) fn document(&self, did: &AccountAddress) -> Option<&DidDocument> {
        self.documents.get(did)
    }

    pub(crate) fn insert(&mut self, document: DidDocument) {
        self.documents.insert(document.did.clone(), document);
    }

    /// Execute `operation` signed by `origin` in block `block_number`.
    pub(crate) fn dispatch(
        &mut self,
        origin: &AccountAddress,
        operation: &Operation,
        block_number: u64,
    ) -> Result<EventPayload, PalletError> {
        match operation {
            Operation::CreateIdentity => {
                if self.documents.contains_key(origin) {
                    return Err(PalletError::DidDocumentAlreadyExists);
                }
                self.insert(DidDocument::new(origin.clone(), block_number));
                Ok(EventPayload::DocumentCreated(DocumentCreated {
                    did: origin.clone(),
                    controller: origin.clone(),
                }))
            }
            Operation::LinkChain {
                chain_name,
                chain_id,
                address,
            } => {
                let document = self
                    .documents
                    .get_mut(origin)
                    .ok_or(PalletError::DidDocumentNotFound)?;

                let entry = LinkedChain {
                    chain_name: chain_name.clone(),
                    chain_id: *chain_id,
                    address: address.clone(),
                };
                let existing = document
                    .linked_chains
                    .iter()
                    .position(|c| c.chain_id == *chain_id);
                match existing {
                    Some(index) => document.linked_chains[index] = entry,
                    None if document.has_chain_capacity() => document.linked_chains.push(entry),
                    None => return Err(PalletError::TooManyLinkedChains),
                }
                document.updated_at = block_number;

                Ok(EventPayload::ChainLinked(ChainLinked {
                    did: origin.clone(),
                    chain_id: *chain_id,
                    address: address.clone(),
                }))
            }
            Operation::UnlinkChain { chain_id } => {
                let document = self
                    .documents
                    .get_mut(origin)
                    .ok_or(PalletError::DidDocumentNotFound)?;

                let before = document.linked_chains.len();
                document.linked_chains.retain(|c| c.chain_id != *chain_id);
                if document.linked_chains.len() == before {
                    return Err(PalletError::ChainNotLinked);
                }
                document.updated_at = block_number;

                Ok(EventPayload::ChainUnlinked(ChainUnlinked {
                    did: origin.clone(),
                    chain_id: *chain_id,
                }))
            }
        }
    }
}
