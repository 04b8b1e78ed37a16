//! # Ledger Status Types
//!
//! Notifications pushed by a ledger node for a watched submission, and the
//! interface metadata a node advertises on connect.
//!
//! A submission moves through the node's pool and into blocks:
//!
//! ```text
//! Future/Ready ──→ Broadcast ──→ InBlock ──→ Finalized
//!                                   │
//!                                   └──→ Retracted ──→ InBlock (re-included)
//!
//! any pre-finality phase ──→ Usurped | Dropped | Invalid
//! ```

use crate::entities::BlockHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle tying a status subscription to one submission.
///
/// Allocated by the connection manager; notifications are routed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionHandle(pub u64);

impl fmt::Display for SubmissionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Inclusion phase reported by the node for a watched submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InclusionPhase {
    /// In the pool, waiting on an earlier nonce.
    Future,
    /// In the pool, ready for inclusion.
    Ready,
    /// Gossiped to peers.
    Broadcast,
    /// Included in a block; the block's events are attached.
    InBlock,
    /// The including block was retracted by a reorg.
    Retracted,
    /// Finality was not reached within the node's window.
    FinalityTimeout,
    /// The including block is finalized; the block's events are attached.
    Finalized,
    /// Replaced by another submission with the same nonce.
    Usurped,
    /// Dropped from the pool.
    Dropped,
    /// Declared invalid by the pool.
    Invalid,
}

impl InclusionPhase {
    /// Phases that carry the including block's events.
    #[must_use]
    pub fn is_included(&self) -> bool {
        matches!(self, InclusionPhase::InBlock | InclusionPhase::Finalized)
    }

    /// Phases after which the node sends nothing more for this submission
    /// and the operation did not land.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            InclusionPhase::Usurped | InclusionPhase::Dropped | InclusionPhase::Invalid
        )
    }
}

impl fmt::Display for InclusionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InclusionPhase::Future => "future",
            InclusionPhase::Ready => "ready",
            InclusionPhase::Broadcast => "broadcast",
            InclusionPhase::InBlock => "inBlock",
            InclusionPhase::Retracted => "retracted",
            InclusionPhase::FinalityTimeout => "finalityTimeout",
            InclusionPhase::Finalized => "finalized",
            InclusionPhase::Usurped => "usurped",
            InclusionPhase::Dropped => "dropped",
            InclusionPhase::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// An event emitted by a block, still in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Discriminator, `"<Pallet>.<Variant>"`.
    pub tag: String,
    /// Encoded event fields.
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl RawEvent {
    pub fn new(tag: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            tag: tag.into(),
            data,
        }
    }
}

/// A ledger-pushed notification for one watched submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    /// Current inclusion phase.
    pub phase: InclusionPhase,
    /// Hash of the including block, when included.
    #[serde(default)]
    pub block_hash: Option<BlockHash>,
    /// Events emitted for the submitted operation, in emission order.
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

impl StatusEvent {
    /// A pool-phase notification without block data.
    #[must_use]
    pub fn phase(phase: InclusionPhase) -> Self {
        Self {
            phase,
            block_hash: None,
            events: Vec::new(),
        }
    }

    /// An inclusion notification carrying the block's events.
    #[must_use]
    pub fn in_block(block_hash: BlockHash, events: Vec<RawEvent>) -> Self {
        Self {
            phase: InclusionPhase::InBlock,
            block_hash: Some(block_hash),
            events,
        }
    }

    /// A finality notification carrying the block's events.
    #[must_use]
    pub fn finalized(block_hash: BlockHash, events: Vec<RawEvent>) -> Self {
        Self {
            phase: InclusionPhase::Finalized,
            block_hash: Some(block_hash),
            events,
        }
    }
}

/// Interface metadata advertised by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerMetadata {
    /// Runtime name, informational.
    pub runtime: String,
    /// Version of the call/event encoding the node speaks.
    pub codec_version: u32,
    /// Call names the node dispatches, `"<Pallet>.<call>"`.
    pub calls: Vec<String>,
    /// Event tags the node can emit.
    pub events: Vec<String>,
}

impl LedgerMetadata {
    #[must_use]
    pub fn supports_call(&self, call: &str) -> bool {
        self.calls.iter().any(|c| c == call)
    }

    #[must_use]
    pub fn supports_event(&self, tag: &str) -> bool {
        self.events.iter().any(|e| e == tag)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let trimmed = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(trimmed).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_classification() {
        assert!(InclusionPhase::InBlock.is_included());
        assert!(InclusionPhase::Finalized.is_included());
        assert!(!InclusionPhase::Broadcast.is_included());
        assert!(InclusionPhase::Invalid.is_rejection());
        assert!(InclusionPhase::Dropped.is_rejection());
        assert!(InclusionPhase::Usurped.is_rejection());
        assert!(!InclusionPhase::Retracted.is_rejection());
    }

    #[test]
    fn test_phase_wire_names() {
        let json = serde_json::to_string(&InclusionPhase::InBlock).unwrap();
        assert_eq!(json, "\"inBlock\"");
        let parsed: InclusionPhase = serde_json::from_str("\"finalized\"").unwrap();
        assert_eq!(parsed, InclusionPhase::Finalized);
    }

    #[test]
    fn test_status_event_from_node_json() {
        let json = r#"{"phase":"inBlock","blockHash":null,"events":[{"tag":"Xenon.ChainUnlinked","data":"0x0102"}]}"#;
        let event: StatusEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.phase, InclusionPhase::InBlock);
        assert_eq!(event.events[0].data, vec![1, 2]);
    }

    #[test]
    fn test_pool_phase_defaults() {
        let event: StatusEvent = serde_json::from_str(r#"{"phase":"ready"}"#).unwrap();
        assert!(event.events.is_empty());
        assert!(event.block_hash.is_none());
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(SubmissionHandle(255).to_string(), "0xff");
    }

    #[test]
    fn test_metadata_lookup() {
        let meta = LedgerMetadata {
            runtime: "xenon-devnet".into(),
            codec_version: 1,
            calls: vec!["Xenon.create_did".into()],
            events: vec!["Xenon.DidDocumentCreated".into()],
        };
        assert!(meta.supports_call("Xenon.create_did"));
        assert!(!meta.supports_call("Xenon.link_chain"));
        assert!(meta.supports_event("Xenon.DidDocumentCreated"));
    }
}
