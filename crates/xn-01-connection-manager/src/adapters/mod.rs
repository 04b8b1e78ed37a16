//! Transport adapters.
//!
//! - `rpc`: JSON-RPC over WebSocket to a real node
//! - `memory`: an in-process ledger node for tests and `--dev` runs

pub mod memory;
pub mod rpc;

pub use memory::{InMemoryLedger, MemoryTransport, PalletError, FEE_EVENT_TAG};
pub use rpc::{RpcConnector, RpcTransport};
