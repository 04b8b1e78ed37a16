//! # Connection Manager (XN-01)
//!
//! Owns the one live connection to a Xenon ledger node and exposes
//! request/response and per-submission subscription primitives over it.
//!
//! ## Architecture
//!
//! ```text
//!  SubmissionEngine / QueryFacade
//!              │  ConnectionHandle (borrowed, cheap clone)
//!              ▼
//!  ┌─────────────────────────────────────────┐
//!  │ ConnectionManager                        │
//!  │   connect → open → metadata → check      │
//!  │   watchdog: transport.closed() → Lost    │
//!  │   NotificationRouter (per-handle routes) │
//!  └──────────────────┬──────────────────────┘
//!                     │ LedgerTransport
//!        ┌────────────┴────────────┐
//!        ▼                         ▼
//!   RpcTransport              MemoryTransport
//!  (jsonrpsee ws)            (InMemoryLedger)
//! ```
//!
//! ## Failure semantics
//!
//! When the transport closes, every open status route is closed with
//! `CloseReason::ConnectionLost` and `ConnectionHandle::lost()` resolves, so
//! no pending submission is left waiting. Reconnection is the caller's
//! decision.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryLedger, PalletError, RpcConnector, FEE_EVENT_TAG};
pub use domain::{ConfigError, ConnectionConfig, ConnectionState, LedgerError, DEFAULT_NODE_URL};
pub use ports::{LedgerConnector, LedgerTransport, TransportError};
pub use service::{ConnectionHandle, ConnectionManager};
