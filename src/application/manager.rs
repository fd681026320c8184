use super::handle::OrderHandle;
use super::processor::OrderProcessor;
use super::queue::OrderQueue;
use super::worker::OrderWorker;
use crate::config::EngineConfig;
use crate::domain::account::AccountId;
use crate::domain::order::{Order, OrderRecord, OrderStatus};
use crate::domain::ports::{CatalogRef, LedgerRef, OrderSinkRef};
use crate::error::{EngineError, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

enum Lifecycle {
    Stopped,
    Running {
        shutdown: CancellationToken,
        worker: JoinHandle<()>,
    },
}

/// Orders of one customer: still queued, and already recorded.
#[derive(Debug)]
pub struct CustomerOrders {
    pub pending: Vec<OrderHandle>,
    pub completed: Vec<OrderRecord>,
}

/// Entry point for the session layer.
///
/// Accepts orders from any number of tasks and hands them to a single
/// background worker, or processes them on the caller's task when no worker
/// is running.
pub struct OrderManager {
    queue: Arc<OrderQueue>,
    sink: OrderSinkRef,
    config: EngineConfig,
    lifecycle: tokio::sync::Mutex<Lifecycle>,
}

impl OrderManager {
    pub fn new(sink: OrderSinkRef) -> Self {
        Self::with_config(sink, EngineConfig::default())
    }

    pub fn with_config(sink: OrderSinkRef, config: EngineConfig) -> Self {
        Self {
            queue: Arc::new(OrderQueue::new()),
            sink,
            config,
            lifecycle: tokio::sync::Mutex::new(Lifecycle::Stopped),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Launches the background worker, restarting it if one is running.
    pub async fn start(&self, catalog: CatalogRef, ledger: LedgerRef) {
        let mut lifecycle = self.lifecycle.lock().await;
        Self::shutdown_worker(&mut lifecycle).await;

        let shutdown = CancellationToken::new();
        let processor = OrderProcessor::new(catalog, ledger, self.sink.clone());
        let worker = OrderWorker::new(self.queue.clone(), processor, shutdown.clone());
        *lifecycle = Lifecycle::Running {
            shutdown,
            worker: tokio::spawn(worker.run()),
        };
        info!(pending = self.queue.len(), "Order manager started");
    }

    /// Stops the worker after its current order and waits for it to exit.
    ///
    /// Orders still queued stay queued. Calling this when stopped is a no-op.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if Self::shutdown_worker(&mut lifecycle).await {
            info!(pending = self.queue.len(), "Order manager stopped");
        }
    }

    async fn shutdown_worker(lifecycle: &mut Lifecycle) -> bool {
        match std::mem::replace(lifecycle, Lifecycle::Stopped) {
            Lifecycle::Stopped => false,
            Lifecycle::Running { shutdown, worker } => {
                shutdown.cancel();
                if let Err(e) = worker.await {
                    error!(error = %e, "Order worker task failed");
                }
                true
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock().await, Lifecycle::Running { .. })
    }

    /// Queues `order` and returns a handle to observe its progress.
    ///
    /// Never blocks on processing. The order moves into the handle, so the
    /// manager keeps no per-order state once the order leaves the queue.
    pub fn submit(&self, order: Order) -> Result<OrderHandle> {
        if order.is_empty() {
            return Err(EngineError::EmptyOrder);
        }

        info!(
            order_id = %order.id(),
            customer = %order.customer_id(),
            items = order.items().len(),
            total = %order.total_amount(),
            "Order submitted"
        );
        Ok(self.queue.enqueue(OrderHandle::queued(order)))
    }

    /// Dequeues one order and processes it on the caller's task.
    pub async fn process_next(&self, catalog: CatalogRef, ledger: LedgerRef) -> Option<OrderHandle> {
        let handle = self.queue.try_dequeue()?;
        OrderProcessor::new(catalog, ledger, self.sink.clone())
            .process(&handle)
            .await;
        Some(handle)
    }

    /// Processes queued orders on the caller's task until the queue is empty.
    pub async fn process_all_pending(&self, catalog: CatalogRef, ledger: LedgerRef) -> usize {
        let processor = OrderProcessor::new(catalog, ledger, self.sink.clone());
        let mut processed = 0;
        while let Some(handle) = self.queue.try_dequeue() {
            processor.process(&handle).await;
            processed += 1;
        }
        processed
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub async fn list_orders_for_customer(&self, customer_id: &AccountId) -> Result<CustomerOrders> {
        let pending = self.queue.pending_for(customer_id);
        let completed = self.sink.records_for_customer(customer_id).await?;
        Ok(CustomerOrders { pending, completed })
    }

    /// Waits for `handle` up to the configured completion timeout.
    pub async fn wait_for_completion(&self, handle: &OrderHandle) -> Option<OrderStatus> {
        handle.wait_timeout(self.config.completion_timeout).await
    }

    /// Polling variant of [`wait_for_completion`](Self::wait_for_completion).
    pub async fn poll_for_completion(&self, handle: &OrderHandle) -> Option<OrderStatus> {
        handle
            .poll_until_processed(self.config.completion_timeout, self.config.poll_interval)
            .await
    }
}

impl Drop for OrderManager {
    fn drop(&mut self) {
        if let Lifecycle::Running { shutdown, .. } = self.lifecycle.get_mut() {
            shutdown.cancel();
        }
    }
}
