pub mod outbound;

pub use outbound::{LedgerConnector, LedgerTransport, TransportError};
