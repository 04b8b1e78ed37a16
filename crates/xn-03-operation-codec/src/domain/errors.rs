//! # Codec Errors
//!
//! Shape mismatches found while encoding parameters or decoding ledger data.

use thiserror::Error;

/// Errors encoding operation parameters.
///
/// Raised before signing, never after.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// A required field was empty.
    #[error("Field `{field}` must not be empty")]
    EmptyField { field: &'static str },

    /// A field exceeds the ledger's fixed byte-width.
    #[error("Field `{field}` is {actual} bytes, ledger limit is {max}")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Errors decoding ledger data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodingError {
    /// Bytes do not match the expected layout.
    #[error("Malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    /// A byte field that must be UTF-8 is not.
    #[error("Field `{field}` is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    /// Call bytes address a call this client does not know.
    #[error("Unknown call {pallet_index}/{call_index}")]
    UnknownCall { pallet_index: u8, call_index: u8 },

    /// Input ended before the header was complete.
    #[error("Input too short: {len} bytes")]
    TooShort { len: usize },
}

impl DecodingError {
    pub(crate) fn malformed(what: &'static str, err: impl std::fmt::Display) -> Self {
        DecodingError::Malformed {
            what,
            reason: err.to_string(),
        }
    }
}
