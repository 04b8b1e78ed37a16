//! # Notification Router
//!
//! The publishing side: transports push notifications tagged with a
//! submission handle, the router forwards each one to that handle's
//! subscription only.

use crate::events::{CloseReason, Notification};
use crate::subscriber::{StatusSubscription, SubscriptionError};
use dashmap::DashMap;
use parking_lot::RwLock;
use shared_types::{StatusEvent, SubmissionHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Shared router state; subscriptions hold a reference for route cleanup.
pub(crate) struct RouterInner {
    /// Open routes by submission handle.
    pub(crate) routes: DashMap<SubmissionHandle, mpsc::UnboundedSender<StatusEvent>>,
    /// Set once the whole router is torn down.
    pub(crate) closed: RwLock<Option<CloseReason>>,
    /// Next handle to allocate.
    next_handle: AtomicU64,
    /// Statistics.
    stats: RouterStats,
}

/// Router statistics.
#[derive(Debug, Default)]
pub struct RouterStats {
    /// Routes opened.
    pub routes_opened: AtomicU64,
    /// Notifications delivered to a live route.
    pub delivered: AtomicU64,
    /// Notifications for handles with no live route.
    pub undeliverable: AtomicU64,
}

/// Per-connection router from submission handle to subscriber.
///
/// Cheap to clone; all clones share the same route table.
#[derive(Clone)]
pub struct NotificationRouter {
    inner: Arc<RouterInner>,
}

impl NotificationRouter {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RouterInner {
                routes: DashMap::new(),
                closed: RwLock::new(None),
                next_handle: AtomicU64::new(1),
                stats: RouterStats::default(),
            }),
        }
    }

    /// Allocate a handle and open a route for it.
    ///
    /// Fails once the router has been closed.
    pub fn open_route(&self) -> Result<StatusSubscription, SubscriptionError> {
        // Hold the read lock so close_all cannot interleave with the insert.
        let closed = self.inner.closed.read();
        if let Some(reason) = *closed {
            return Err(SubscriptionError::Closed(reason));
        }

        let handle = SubmissionHandle(self.inner.next_handle.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.routes.insert(handle, tx);
        drop(closed);

        self.inner
            .stats
            .routes_opened
            .fetch_add(1, Ordering::Relaxed);
        debug!(handle = %handle, "Opened status route");

        Ok(StatusSubscription::new(handle, rx, Arc::clone(&self.inner)))
    }

    /// Deliver a notification to its submission's subscription.
    ///
    /// Returns `false` when no live route exists for the handle.
    pub fn publish(&self, handle: SubmissionHandle, event: StatusEvent) -> bool {
        let delivered = match self.inner.routes.get(&handle) {
            Some(route) => route.send(event).is_ok(),
            None => false,
        };

        if delivered {
            self.inner.stats.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner
                .stats
                .undeliverable
                .fetch_add(1, Ordering::Relaxed);
            debug!(handle = %handle, "Notification for released route discarded");
        }
        delivered
    }

    /// Deliver a tagged notification.
    pub fn route(&self, notification: Notification) -> bool {
        self.publish(notification.handle, notification.event)
    }

    /// Release one route; its subscription sees `CloseReason::Released`.
    pub fn close_route(&self, handle: SubmissionHandle) -> bool {
        self.inner.routes.remove(&handle).is_some()
    }

    /// Tear down every route.
    ///
    /// Returns the number of subscriptions that were still open.
    pub fn close_all(&self, reason: CloseReason) -> usize {
        let mut closed = self.inner.closed.write();
        if closed.is_none() {
            *closed = Some(reason);
        }
        let open = self.inner.routes.len();
        self.inner.routes.clear();
        drop(closed);

        if open > 0 {
            warn!(open_routes = open, reason = %reason, "Closed all status routes");
        }
        open
    }

    /// Whether a route is open for the handle.
    #[must_use]
    pub fn is_routed(&self, handle: SubmissionHandle) -> bool {
        self.inner.routes.contains_key(&handle)
    }

    /// Number of open routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.inner.routes.len()
    }

    /// The reason the router was closed, if it was.
    #[must_use]
    pub fn close_reason(&self) -> Option<CloseReason> {
        *self.inner.closed.read()
    }

    /// Get statistics.
    #[must_use]
    pub fn stats(&self) -> &RouterStats {
        &self.inner.stats
    }
}

impl Default for NotificationRouter {
    fn default() -> Self {
        Self::new()
    }
}
