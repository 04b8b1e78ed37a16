//! # Status Subscription
//!
//! The receiving side of one submission's route.

use crate::events::CloseReason;
use crate::publisher::RouterInner;
use shared_types::{StatusEvent, SubmissionHandle};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The route (or the whole router) was closed.
    #[error("Status route closed: {0}")]
    Closed(CloseReason),
}

/// Notifications for exactly one submission handle.
///
/// When dropped, the route is released and late notifications for the
/// handle are discarded by the router.
pub struct StatusSubscription {
    /// Handle this subscription observes.
    handle: SubmissionHandle,

    /// Per-route receiver.
    receiver: mpsc::UnboundedReceiver<StatusEvent>,

    /// Router state (for cleanup and close reasons).
    router: Arc<RouterInner>,
}

impl StatusSubscription {
    pub(crate) fn new(
        handle: SubmissionHandle,
        receiver: mpsc::UnboundedReceiver<StatusEvent>,
        router: Arc<RouterInner>,
    ) -> Self {
        Self {
            handle,
            receiver,
            router,
        }
    }

    /// The handle this subscription observes.
    #[must_use]
    pub fn handle(&self) -> SubmissionHandle {
        self.handle
    }

    /// Receive the next notification for this submission.
    ///
    /// # Returns
    ///
    /// - `Ok(event)` - The next notification
    /// - `Err(SubscriptionError::Closed(reason))` - The route ended
    pub async fn recv(&mut self) -> Result<StatusEvent, SubscriptionError> {
        match self.receiver.recv().await {
            Some(event) => Ok(event),
            None => Err(SubscriptionError::Closed(self.close_reason())),
        }
    }

    /// Try to receive the next notification without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - A notification was queued
    /// - `Ok(None)` - Nothing queued yet
    /// - `Err(SubscriptionError::Closed(reason))` - The route ended
    pub fn try_recv(&mut self) -> Result<Option<StatusEvent>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(SubscriptionError::Closed(self.close_reason()))
            }
        }
    }

    fn close_reason(&self) -> CloseReason {
        (*self.router.closed.read()).unwrap_or(CloseReason::Released)
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        if self.router.routes.remove(&self.handle).is_some() {
            debug!(handle = %self.handle, "Status route released");
        }
    }
}

impl Stream for StatusSubscription {
    type Item = StatusEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
