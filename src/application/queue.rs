use super::handle::OrderHandle;
use crate::domain::account::AccountId;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// FIFO of submitted orders shared by producers and the worker.
///
/// All mutations happen under one mutex that is never held across an await.
/// `Notify` stores a permit when nobody is waiting, so an enqueue racing with
/// a consumer that is about to sleep is not lost.
#[derive(Default)]
pub struct OrderQueue {
    orders: Mutex<VecDeque<OrderHandle>>,
    available: Notify,
}

impl OrderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn orders(&self) -> MutexGuard<'_, VecDeque<OrderHandle>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends to the tail and wakes one waiting consumer.
    pub fn enqueue(&self, handle: OrderHandle) -> OrderHandle {
        self.orders().push_back(handle.clone());
        self.available.notify_one();
        handle
    }

    pub fn try_dequeue(&self) -> Option<OrderHandle> {
        self.orders().pop_front()
    }

    /// Removes the head, waiting while the queue is empty.
    ///
    /// Returns `None` once `shutdown` is cancelled, even if orders remain.
    pub async fn dequeue_blocking(&self, shutdown: &CancellationToken) -> Option<OrderHandle> {
        loop {
            if shutdown.is_cancelled() {
                return None;
            }
            let notified = self.available.notified();
            if let Some(handle) = self.try_dequeue() {
                return Some(handle);
            }
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return None,
                _ = notified => {}
            }
        }
    }

    pub fn len(&self) -> usize {
        self.orders().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders().is_empty()
    }

    /// Queued orders belonging to `customer_id`, head first.
    pub fn pending_for(&self, customer_id: &AccountId) -> Vec<OrderHandle> {
        self.orders()
            .iter()
            .filter(|h| h.order().customer_id() == customer_id)
            .cloned()
            .collect()
    }
}
