//! # Submission & Correlation Engine (XN-04)
//!
//! Turns a typed identity operation into a signed extrinsic, submits it over
//! the shared connection and follows that submission's own status stream to
//! exactly one terminal outcome.
//!
//! ## State machine
//!
//! ```text
//! Building ──encode, resolve signer──► Signing ──nonce, sign, submit──► Submitted
//!                                                                          │
//!   Resolved ◄──decode── Resolving ◄──inBlock/finalized── AwaitingInclusion ◄┘
//!
//!   any state ──► Failed
//! ```
//!
//! Pool phases (`ready`, `broadcast`, ...) never resolve a submission; only
//! the configured confirmation does. A dropped connection fails every
//! pending submission with `ConnectionLost`.
//!
//! ## Known limitation
//!
//! The expected event is located by type tag in the including block. Two
//! same-kind submissions landing in one block would both match the first
//! event of that kind. `EngineConfig::serialize_same_kind` (on by default)
//! runs same-kind submissions one after another so this cannot happen.

pub mod domain;
pub mod service;

pub use domain::{
    correlate, parse_deadline, step, ConfigError, Confirmation, EngineConfig, OnChainEffect, PendingSubmission,
    Resolution, StatsSnapshot, Step, SubmissionError, SubmissionFailure, SubmissionOutcome,
    SubmissionState,
};
pub use service::{SubmissionEngine, SubmissionTicket};
