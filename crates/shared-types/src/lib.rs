//! # Shared Types Crate
//!
//! Domain entities, ledger status types and the `SignedExtrinsic` envelope
//! shared by every Xenon client component.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-component types are defined here.
//! - **Immutable Snapshots**: Ledger read-models (`DidDocument`) are plain
//!   values; the client never mutates ledger state in place.
//! - **Typed Failures**: The connection and account error taxonomy lives here
//!   so every layer reports the same variants.

pub mod correlation;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ledger;

pub use correlation::CorrelationId;
pub use entities::*;
pub use envelope::SignedExtrinsic;
pub use errors::*;
pub use ledger::*;
