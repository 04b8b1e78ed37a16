//! # Codec
//!
//! Pure, stateless conversions between typed values and ledger wire bytes.

use crate::domain::errors::{DecodingError, EncodingError};
use crate::domain::operation::{
    CallBytes, EventKind, Operation, OperationKind, MAX_CHAIN_ADDRESS_LEN, MAX_CHAIN_NAME_LEN,
    PALLET_INDEX,
};
use crate::domain::payload::{
    ChainLinked, ChainUnlinked, DispatchError, DocumentCreated, EventPayload, SYSTEM_FAILED_TAG,
    SYSTEM_SUCCESS_TAG,
};
use serde::{Deserialize, Serialize};
use shared_types::{AccountAddress, ChainId, DidDocument, LedgerMetadata, RawEvent, SignedExtrinsic};

/// Version of the call/event encoding produced by this crate.
pub const CODEC_VERSION: u32 = 1;

/// Domain separator prefixed to every signing payload.
const SIGNING_CONTEXT: &[u8] = b"xenon/v1";

// =============================================================================
// WIRE LAYOUTS
// =============================================================================

#[derive(Serialize, Deserialize)]
struct LinkChainArgs {
    chain_name: Vec<u8>,
    chain_id: ChainId,
    address: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct UnlinkChainArgs {
    chain_id: ChainId,
}

#[derive(Serialize, Deserialize)]
struct ChainLinkedWire {
    did: AccountAddress,
    chain_id: ChainId,
    address: Vec<u8>,
}

// =============================================================================
// CALLS
// =============================================================================

/// Encode an operation into call bytes.
///
/// # Errors
/// * `EncodingError::EmptyField` - chain name or address is empty
/// * `EncodingError::FieldTooLong` - a field exceeds its ledger byte-width
pub fn encode(operation: &Operation) -> Result<CallBytes, EncodingError> {
    let kind = operation.kind();
    let mut bytes = vec![PALLET_INDEX, kind.call_index()];

    match operation {
        Operation::CreateIdentity => {}
        Operation::LinkChain {
            chain_name,
            chain_id,
            address,
        } => {
            check_width("chain_name", chain_name, MAX_CHAIN_NAME_LEN)?;
            check_width("address", address, MAX_CHAIN_ADDRESS_LEN)?;
            let args = LinkChainArgs {
                chain_name: chain_name.as_bytes().to_vec(),
                chain_id: *chain_id,
                address: address.as_bytes().to_vec(),
            };
            bytes.extend(serialize(&args)?);
        }
        Operation::UnlinkChain { chain_id } => {
            bytes.extend(serialize(&UnlinkChainArgs {
                chain_id: *chain_id,
            })?);
        }
    }

    Ok(CallBytes(bytes))
}

/// Decode call bytes back into an operation (node side of `encode`).
pub fn decode_call(bytes: &[u8]) -> Result<Operation, DecodingError> {
    let [pallet_index, call_index, args @ ..] = bytes else {
        return Err(DecodingError::TooShort { len: bytes.len() });
    };

    let unknown = DecodingError::UnknownCall {
        pallet_index: *pallet_index,
        call_index: *call_index,
    };
    if *pallet_index != PALLET_INDEX {
        return Err(unknown);
    }

    match OperationKind::from_call_index(*call_index).ok_or(unknown)? {
        OperationKind::CreateIdentity => Ok(Operation::CreateIdentity),
        OperationKind::LinkChain => {
            let args: LinkChainArgs =
                bincode::deserialize(args).map_err(|e| DecodingError::malformed("call", e))?;
            Ok(Operation::LinkChain {
                chain_name: utf8("chain_name", args.chain_name)?,
                chain_id: args.chain_id,
                address: utf8("address", args.address)?,
            })
        }
        OperationKind::UnlinkChain => {
            let args: UnlinkChainArgs =
                bincode::deserialize(args).map_err(|e| DecodingError::malformed("call", e))?;
            Ok(Operation::UnlinkChain {
                chain_id: args.chain_id,
            })
        }
    }
}

/// Bytes the signer signs for a call.
#[must_use]
pub fn signing_payload(signer: &AccountAddress, nonce: u64, call: &CallBytes) -> Vec<u8> {
    let signer_bytes = signer.as_str().as_bytes();
    let mut payload =
        Vec::with_capacity(SIGNING_CONTEXT.len() + 8 + signer_bytes.len() + 8 + call.0.len());
    payload.extend_from_slice(SIGNING_CONTEXT);
    payload.extend_from_slice(&(signer_bytes.len() as u64).to_le_bytes());
    payload.extend_from_slice(signer_bytes);
    payload.extend_from_slice(&nonce.to_le_bytes());
    payload.extend_from_slice(call.as_bytes());
    payload
}

pub fn encode_extrinsic(extrinsic: &SignedExtrinsic) -> Result<Vec<u8>, EncodingError> {
    serialize(extrinsic)
}

pub fn decode_extrinsic(bytes: &[u8]) -> Result<SignedExtrinsic, DecodingError> {
    bincode::deserialize(bytes).map_err(|e| DecodingError::malformed("extrinsic", e))
}

// =============================================================================
// EVENTS
// =============================================================================

/// Decode an event's data as the given kind.
pub fn decode(kind: EventKind, data: &[u8]) -> Result<EventPayload, DecodingError> {
    let payload = match kind {
        EventKind::DocumentCreated => {
            let event: DocumentCreated = bincode::deserialize(data)
                .map_err(|e| DecodingError::malformed("DidDocumentCreated", e))?;
            EventPayload::DocumentCreated(event)
        }
        EventKind::ChainLinked => {
            let wire: ChainLinkedWire = bincode::deserialize(data)
                .map_err(|e| DecodingError::malformed("ChainLinked", e))?;
            EventPayload::ChainLinked(ChainLinked {
                did: wire.did,
                chain_id: wire.chain_id,
                address: utf8("address", wire.address)?,
            })
        }
        EventKind::ChainUnlinked => {
            let event: ChainUnlinked = bincode::deserialize(data)
                .map_err(|e| DecodingError::malformed("ChainUnlinked", e))?;
            EventPayload::ChainUnlinked(event)
        }
    };
    Ok(payload)
}

/// Encode a typed event (node side of `decode`).
pub fn encode_event(payload: &EventPayload) -> Result<RawEvent, EncodingError> {
    let data = match payload {
        EventPayload::DocumentCreated(event) => serialize(event)?,
        EventPayload::ChainLinked(event) => serialize(&ChainLinkedWire {
            did: event.did.clone(),
            chain_id: event.chain_id,
            address: event.address.as_bytes().to_vec(),
        })?,
        EventPayload::ChainUnlinked(event) => serialize(event)?,
    };
    Ok(RawEvent::new(payload.kind().tag(), data))
}

pub fn encode_dispatch_error(error: &DispatchError) -> Result<RawEvent, EncodingError> {
    Ok(RawEvent::new(SYSTEM_FAILED_TAG, serialize(error)?))
}

pub fn decode_dispatch_error(data: &[u8]) -> Result<DispatchError, DecodingError> {
    bincode::deserialize(data).map_err(|e| DecodingError::malformed("ExtrinsicFailed", e))
}

// =============================================================================
// DOCUMENTS
// =============================================================================

pub fn encode_document(document: &DidDocument) -> Result<Vec<u8>, EncodingError> {
    serialize(document)
}

pub fn decode_document(bytes: &[u8]) -> Result<DidDocument, DecodingError> {
    bincode::deserialize(bytes).map_err(|e| DecodingError::malformed("DidDocument", e))
}

// =============================================================================
// METADATA
// =============================================================================

/// Call names a node must dispatch for this client to work.
#[must_use]
pub fn required_calls() -> Vec<String> {
    OperationKind::ALL
        .iter()
        .map(|k| k.call_name().to_string())
        .collect()
}

/// Event tags a node must be able to emit for this client to work.
#[must_use]
pub fn required_events() -> Vec<String> {
    let mut tags: Vec<String> = EventKind::ALL.iter().map(|k| k.tag().to_string()).collect();
    tags.push(SYSTEM_SUCCESS_TAG.to_string());
    tags.push(SYSTEM_FAILED_TAG.to_string());
    tags
}

/// Check a node's metadata against what this codec encodes and decodes.
///
/// Returns a human-readable reason on mismatch.
pub fn check_compatibility(metadata: &LedgerMetadata) -> Result<(), String> {
    if metadata.codec_version != CODEC_VERSION {
        return Err(format!(
            "node codec version {} does not match client version {}",
            metadata.codec_version, CODEC_VERSION
        ));
    }

    let missing_calls: Vec<String> = required_calls()
        .into_iter()
        .filter(|c| !metadata.supports_call(c))
        .collect();
    if !missing_calls.is_empty() {
        return Err(format!("node lacks calls: {}", missing_calls.join(", ")));
    }

    let missing_events: Vec<String> = required_events()
        .into_iter()
        .filter(|e| !metadata.supports_event(e))
        .collect();
    if !missing_events.is_empty() {
        return Err(format!("node lacks events: {}", missing_events.join(", ")));
    }

    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn check_width(field: &'static str, value: &str, max: usize) -> Result<(), EncodingError> {
    let actual = value.len();
    if actual == 0 {
        return Err(EncodingError::EmptyField { field });
    }
    if actual > max {
        return Err(EncodingError::FieldTooLong { field, max, actual });
    }
    Ok(())
}

fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodingError> {
    bincode::serialize(value).map_err(|e| EncodingError::Serialization(e.to_string()))
}

fn utf8(field: &'static str, bytes: Vec<u8>) -> Result<String, DecodingError> {
    String::from_utf8(bytes).map_err(|_| DecodingError::InvalidUtf8 { field })
}
