//! # Domain Layer
//!
//! Operation and event vocabulary of the Xenon pallet. No I/O.

pub mod errors;
pub mod operation;
pub mod payload;
