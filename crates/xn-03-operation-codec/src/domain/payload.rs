//! # Event Payloads
//!
//! Typed forms of the events a submission can resolve with, plus the
//! system-level dispatch failure used to explain unexpected outcomes.

use crate::domain::operation::EventKind;
use serde::{Deserialize, Serialize};
use shared_types::{AccountAddress, ChainId};
use std::fmt;

/// Tag emitted after every successful dispatch.
pub const SYSTEM_SUCCESS_TAG: &str = "System.ExtrinsicSuccess";

/// Tag emitted when a dispatch fails after inclusion.
pub const SYSTEM_FAILED_TAG: &str = "System.ExtrinsicFailed";

/// `Xenon.DidDocumentCreated`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCreated {
    pub did: AccountAddress,
    pub controller: AccountAddress,
}

/// `Xenon.ChainLinked`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLinked {
    pub did: AccountAddress,
    pub chain_id: ChainId,
    pub address: String,
}

/// `Xenon.ChainUnlinked`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainUnlinked {
    pub did: AccountAddress,
    pub chain_id: ChainId,
}

/// A decoded event a submission resolved with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum EventPayload {
    DocumentCreated(DocumentCreated),
    ChainLinked(ChainLinked),
    ChainUnlinked(ChainUnlinked),
}

impl EventPayload {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::DocumentCreated(_) => EventKind::DocumentCreated,
            EventPayload::ChainLinked(_) => EventKind::ChainLinked,
            EventPayload::ChainUnlinked(_) => EventKind::ChainUnlinked,
        }
    }

    /// The identity the event concerns.
    #[must_use]
    pub fn did(&self) -> &AccountAddress {
        match self {
            EventPayload::DocumentCreated(e) => &e.did,
            EventPayload::ChainLinked(e) => &e.did,
            EventPayload::ChainUnlinked(e) => &e.did,
        }
    }
}

/// Module error carried by `System.ExtrinsicFailed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchError {
    /// Pallet that raised the error.
    pub module: String,
    /// Error variant name (e.g. `DidDocumentNotFound`).
    pub error: String,
}

impl DispatchError {
    pub fn xenon(error: impl Into<String>) -> Self {
        Self {
            module: crate::domain::operation::PALLET_NAME.to_string(),
            error: error.into(),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.error)
    }
}
