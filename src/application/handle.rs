use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::error::{EngineError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep, timeout};

/// Observable progress of a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderProgress {
    pub status: OrderStatus,
    pub processed: bool,
}

struct Shared {
    order: Order,
    progress: watch::Sender<OrderProgress>,
}

/// Shared handle to a submitted order.
///
/// The submitter and the engine hold clones of the same handle. The order
/// itself is frozen; only its progress changes, and every change goes through
/// the watch channel so waiters are woken without polling.
#[derive(Clone)]
pub struct OrderHandle {
    shared: Arc<Shared>,
}

impl OrderHandle {
    /// Freezes `order` in the `Queued` state.
    pub(crate) fn queued(order: Order) -> Self {
        let (progress, _) = watch::channel(OrderProgress {
            status: OrderStatus::Queued,
            processed: false,
        });
        Self {
            shared: Arc::new(Shared { order, progress }),
        }
    }

    pub fn order(&self) -> &Order {
        &self.shared.order
    }

    pub fn id(&self) -> &OrderId {
        self.shared.order.id()
    }

    pub fn progress(&self) -> OrderProgress {
        *self.shared.progress.borrow()
    }

    pub fn status(&self) -> OrderStatus {
        self.progress().status
    }

    pub fn is_processed(&self) -> bool {
        self.progress().processed
    }

    /// Moves the order forward; rejects any transition the state machine forbids.
    pub(crate) fn transition(&self, next: OrderStatus) -> Result<()> {
        let mut rejected = None;
        self.shared.progress.send_if_modified(|progress| {
            if progress.processed || !progress.status.can_transition_to(next) {
                rejected = Some(progress.status);
                return false;
            }
            progress.status = next;
            true
        });
        match rejected {
            Some(from) => Err(EngineError::InvalidTransition { from, to: next }),
            None => Ok(()),
        }
    }

    /// Flags a terminal order as processed. Returns false if it already was,
    /// or if the order has not reached a terminal status.
    pub(crate) fn mark_processed(&self) -> bool {
        self.shared.progress.send_if_modified(|progress| {
            if progress.processed || !progress.status.is_terminal() {
                return false;
            }
            progress.processed = true;
            true
        })
    }

    /// Waits until the order is processed and returns its final status.
    pub async fn wait(&self) -> OrderStatus {
        let mut rx = self.shared.progress.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        match rx.wait_for(|p| p.processed).await {
            Ok(progress) => progress.status,
            Err(_) => self.status(),
        }
    }

    /// Like [`wait`](Self::wait), giving up after `limit`.
    pub async fn wait_timeout(&self, limit: Duration) -> Option<OrderStatus> {
        timeout(limit, self.wait()).await.ok()
    }

    /// Sleep-polls the processed flag until it is set or `limit` elapses.
    pub async fn poll_until_processed(
        &self,
        limit: Duration,
        interval: Duration,
    ) -> Option<OrderStatus> {
        let deadline = Instant::now() + limit;
        loop {
            let progress = self.progress();
            if progress.processed {
                return Some(progress.status);
            }
            if Instant::now() >= deadline {
                return None;
            }
            sleep(interval).await;
        }
    }
}

impl std::fmt::Debug for OrderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderHandle")
            .field("id", self.id())
            .field("progress", &self.progress())
            .finish()
    }
}
