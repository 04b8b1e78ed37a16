//! # Account Registry (XN-02)
//!
//! Tracks which accounts may sign, as reported by an external account
//! provider, and resolves a signer for an address on demand.
//!
//! ## Snapshot semantics
//!
//! - Every provider update replaces the whole `AccountSet`; nothing is
//!   patched in place.
//! - `resolve_signer` consults the snapshot current at call time. An address
//!   removed by a newer snapshot fails with `AccountNotFound` even if an older
//!   snapshot someone still holds lists it.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{LocalKeystore, KEYSTORE_NAME};
pub use domain::{Account, AccountSet};
pub use ports::{AccountProvider, Extension, Signer};
pub use service::{AccountRegistry, SigningHandle};
