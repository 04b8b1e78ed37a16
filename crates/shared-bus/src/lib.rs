//! # Shared Bus - Status Notification Router
//!
//! Demultiplexes ledger status notifications by submission handle so that
//! each in-flight submission observes only its own stream.
//!
//! ## Routing
//!
//! ```text
//!                          ┌──────────────────────┐
//!  transport ──publish()──→│  NotificationRouter  │
//!  (one per connection)    │  handle → channel    │
//!                          └──┬────────┬────────┬─┘
//!                             ▼        ▼        ▼
//!                         sub 0x1   sub 0x2   sub 0x3   (StatusSubscription)
//! ```
//!
//! ## Lifecycle
//!
//! - **Scoped Routes:** dropping a `StatusSubscription` removes its route.
//! - **Connection Teardown:** `close_all()` ends every open subscription with
//!   the close reason, so no subscriber waits forever on a dead connection.
//! - **Late Notifications:** publishing to a released route is counted and
//!   discarded.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{CloseReason, Notification};
pub use publisher::{NotificationRouter, RouterStats};
pub use subscriber::{StatusSubscription, SubscriptionError};
