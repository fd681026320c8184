use super::processor::OrderProcessor;
use super::queue::OrderQueue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};

/// The background consumer draining the order queue.
pub struct OrderWorker {
    queue: Arc<OrderQueue>,
    processor: OrderProcessor,
    shutdown: CancellationToken,
}

impl OrderWorker {
    pub fn new(queue: Arc<OrderQueue>, processor: OrderProcessor, shutdown: CancellationToken) -> Self {
        Self {
            queue,
            processor,
            shutdown,
        }
    }

    /// Processes orders one at a time until shutdown is requested.
    ///
    /// Shutdown is only observed between orders; an order already dequeued is
    /// always carried to a terminal status.
    pub async fn run(self) {
        async move {
            info!("Order worker started");
            let mut processed = 0usize;
            while let Some(handle) = self.queue.dequeue_blocking(&self.shutdown).await {
                self.processor.process(&handle).await;
                processed += 1;
            }
            info!(processed, remaining = self.queue.len(), "Order worker stopped");
        }
        .instrument(info_span!("order_worker"))
        .await
    }
}
