//! # `SignedExtrinsic` Envelope
//!
//! The wrapper every state-changing call travels in once signed.
//!
//! ## Properties
//!
//! - **Signer Authority**: `signer` must be the address derived from
//!   `public_key`; nodes reject mismatches.
//! - **Replay Prevention**: `nonce` is the signer's next account index.
//! - **Opaque Call**: `call` is already encoded by the operation codec; the
//!   envelope never inspects it.

use crate::entities::{AccountAddress, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedExtrinsic {
    // =========================================================================
    // HEADER SECTION
    // =========================================================================
    /// Envelope format version.
    pub version: u16,

    /// Account on whose behalf the call is dispatched.
    pub signer: AccountAddress,

    /// Public key the signature verifies against.
    pub public_key: PublicKey,

    /// Signer's account index at signing time.
    pub nonce: u64,

    // =========================================================================
    // PAYLOAD SECTION
    // =========================================================================
    /// Encoded call.
    pub call: Vec<u8>,

    /// Ed25519 signature over the signing payload.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl SignedExtrinsic {
    /// Current envelope version.
    pub const CURRENT_VERSION: u16 = 1;
}
