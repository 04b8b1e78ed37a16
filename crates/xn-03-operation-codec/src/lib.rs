//! # Operation Codec (XN-03)
//!
//! Encodes typed identity operations into the call bytes the ledger expects
//! and decodes ledger-emitted events and stored documents back into typed
//! values.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Operations, event kinds, payloads, errors
//! - **Codec** (`codec.rs`): Pure, stateless encode/decode functions
//!
//! ## Wire Format
//!
//! ```text
//! call      = [pallet_index, call_index] ++ bincode(args)
//! event     = RawEvent { tag: "<Pallet>.<Variant>", data: bincode(fields) }
//! document  = bincode(DidDocument)
//! signing   = "xenon/v1" ++ bincode(signer) ++ nonce_le ++ call
//! ```
//!
//! Parameter shapes are validated on encode, so an oversize identifier is
//! rejected before anything is signed.

pub mod codec;
pub mod domain;

pub use codec::{
    check_compatibility, decode, decode_call, decode_dispatch_error, decode_document,
    decode_extrinsic, encode, encode_dispatch_error, encode_document, encode_event,
    encode_extrinsic, required_calls, required_events, signing_payload, CODEC_VERSION,
};
pub use domain::errors::{DecodingError, EncodingError};
pub use domain::operation::{
    CallBytes, EventKind, Operation, OperationKind, MAX_CHAIN_ADDRESS_LEN, MAX_CHAIN_NAME_LEN,
    PALLET_INDEX, PALLET_NAME,
};
pub use domain::payload::{
    ChainLinked, ChainUnlinked, DispatchError, DocumentCreated, EventPayload, SYSTEM_FAILED_TAG,
    SYSTEM_SUCCESS_TAG,
};
