//! # Operations
//!
//! The state-changing calls this client issues, and the event each one is
//! expected to emit when it takes effect.
//!
//! | Operation | Call | Expected event |
//! |-----------|------|----------------|
//! | `CreateIdentity` | `Xenon.create_did` | `Xenon.DidDocumentCreated` |
//! | `LinkChain` | `Xenon.link_chain` | `Xenon.ChainLinked` |
//! | `UnlinkChain` | `Xenon.unlink_chain` | `Xenon.ChainUnlinked` |

use serde::{Deserialize, Serialize};
use shared_types::ChainId;
use std::fmt;

/// Pallet name used in call names and event tags.
pub const PALLET_NAME: &str = "Xenon";

/// Runtime index of the Xenon pallet.
pub const PALLET_INDEX: u8 = 8;

/// Maximum encoded chain name length (bytes).
pub const MAX_CHAIN_NAME_LEN: usize = 32;

/// Maximum encoded chain address length (bytes).
pub const MAX_CHAIN_ADDRESS_LEN: usize = 64;

/// A state-changing identity operation with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a DID document for the signing account.
    CreateIdentity,
    /// Bind an external chain address to the signer's document.
    LinkChain {
        chain_name: String,
        chain_id: ChainId,
        address: String,
    },
    /// Remove a previously linked chain.
    UnlinkChain { chain_id: ChainId },
}

impl Operation {
    /// Convenience constructor for `LinkChain`.
    pub fn link_chain(
        chain_name: impl Into<String>,
        chain_id: ChainId,
        address: impl Into<String>,
    ) -> Self {
        Operation::LinkChain {
            chain_name: chain_name.into(),
            chain_id,
            address: address.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::CreateIdentity => OperationKind::CreateIdentity,
            Operation::LinkChain { .. } => OperationKind::LinkChain,
            Operation::UnlinkChain { .. } => OperationKind::UnlinkChain,
        }
    }
}

/// Discriminator of an `Operation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    CreateIdentity,
    LinkChain,
    UnlinkChain,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::CreateIdentity,
        OperationKind::LinkChain,
        OperationKind::UnlinkChain,
    ];

    /// Index of the call within the pallet.
    #[must_use]
    pub fn call_index(&self) -> u8 {
        match self {
            OperationKind::CreateIdentity => 0,
            OperationKind::LinkChain => 1,
            OperationKind::UnlinkChain => 2,
        }
    }

    #[must_use]
    pub fn from_call_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.call_index() == index)
    }

    /// Fully qualified call name, `"<Pallet>.<call>"`.
    #[must_use]
    pub fn call_name(&self) -> &'static str {
        match self {
            OperationKind::CreateIdentity => "Xenon.create_did",
            OperationKind::LinkChain => "Xenon.link_chain",
            OperationKind::UnlinkChain => "Xenon.unlink_chain",
        }
    }

    /// The event a successful dispatch of this call emits.
    #[must_use]
    pub fn expected_event(&self) -> EventKind {
        match self {
            OperationKind::CreateIdentity => EventKind::DocumentCreated,
            OperationKind::LinkChain => EventKind::ChainLinked,
            OperationKind::UnlinkChain => EventKind::ChainUnlinked,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::CreateIdentity => "createIdentity",
            OperationKind::LinkChain => "linkChain",
            OperationKind::UnlinkChain => "unlinkChain",
        };
        f.write_str(name)
    }
}

/// Semantic events the engine correlates submissions with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    DocumentCreated,
    ChainLinked,
    ChainUnlinked,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::DocumentCreated,
        EventKind::ChainLinked,
        EventKind::ChainUnlinked,
    ];

    /// Event tag as emitted by the ledger.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::DocumentCreated => "Xenon.DidDocumentCreated",
            EventKind::ChainLinked => "Xenon.ChainLinked",
            EventKind::ChainUnlinked => "Xenon.ChainUnlinked",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Encoded call, ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallBytes(pub Vec<u8>);

impl CallBytes {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CallBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
