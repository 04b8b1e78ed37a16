//! # Xenon Test Suite
//!
//! Cross-component scenarios run against the in-memory ledger node and the
//! local keystore.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs          # Connected client + ledger + keystore
//!     ├── submission_flows.rs  # Operations resolved end to end
//!     ├── connection_loss.rs   # Pending submissions vs. a dying connection
//!     ├── registry.rs          # Snapshot replacement and signer resolution
//!     └── queries.rs           # Document reads
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p xn-tests
//! cargo test -p xn-tests integration::connection_loss
//! ```

pub mod integration;
